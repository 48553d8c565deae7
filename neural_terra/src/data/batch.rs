//! Collation of host samples into backend tensors.

use burn::prelude::*;
use terra_core::CameraGeometry;

use crate::error::{NeuralTerraError, Result};
use crate::util::float_tensor;

use super::sample::{HeightLabel, TerrainSample};

/// Camera images of a batch.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Images `[batch, cameras, 3, height, width]`.
    pub images: Tensor<B, 5>,
    /// Per-sample, per-camera geometry; consumed on the host.
    pub cameras: Vec<Vec<CameraGeometry>>,
}

/// Height labels of a batch.
#[derive(Debug, Clone)]
pub struct HeightMapBatch<B: Backend> {
    /// Heights `[batch, 1, nx, ny]`.
    pub heights: Tensor<B, 4>,
    /// Validity weights `[batch, 1, nx, ny]`.
    pub mask: Tensor<B, 4>,
}

/// Ground-truth trajectories of a batch.
#[derive(Debug, Clone)]
pub struct TrajectoryBatch<B: Backend> {
    /// Timestamps `[batch, steps]`.
    pub timestamps: Tensor<B, 2>,
    /// Positions `[batch, steps, 3]`.
    pub positions: Tensor<B, 3>,
    /// Linear velocities `[batch, steps, 3]`.
    pub linear_velocities: Tensor<B, 3>,
    /// Rotations `[batch, steps, 3, 3]`.
    pub orientations: Tensor<B, 4>,
    /// Angular velocities `[batch, steps, 3]`.
    pub angular_velocities: Tensor<B, 3>,
}

/// A collated batch.
#[derive(Debug, Clone)]
pub struct TerrainBatch<B: Backend> {
    /// Camera inputs, when the samples carry images.
    pub images: Option<ImageBatch<B>>,
    /// Point clouds `[batch, 3, max_points]`, padded with NaN columns.
    pub points: Option<Tensor<B, 3>>,
    /// Raw geometry labels.
    pub geometry: HeightMapBatch<B>,
    /// Terrain labels.
    pub terrain: HeightMapBatch<B>,
    /// Control timestamps `[batch, steps]`.
    pub control_timestamps: Tensor<B, 2>,
    /// Commands `[batch, steps, 2]`.
    pub controls: Tensor<B, 3>,
    /// Initial poses `[batch, 4, 4]`.
    pub initial_pose: Tensor<B, 3>,
    /// Ground truth.
    pub trajectory: TrajectoryBatch<B>,
}

fn invalid(message: impl Into<String>) -> NeuralTerraError {
    NeuralTerraError::InvalidData(message.into())
}

fn same<T: PartialEq + Copy + std::fmt::Debug>(
    samples: &[TerrainSample],
    what: &str,
    f: impl Fn(&TerrainSample) -> T,
) -> Result<T> {
    let first = f(&samples[0]);
    for s in &samples[1..] {
        let v = f(s);
        if v != first {
            return Err(invalid(format!("{} differs within batch: {:?} vs {:?}", what, first, v)));
        }
    }
    Ok(first)
}

fn collate_heights<B: Backend>(
    labels: Vec<&HeightLabel>,
    device: &B::Device,
) -> Result<HeightMapBatch<B>> {
    let (nx, ny) = labels[0].shape;
    let mut heights = Vec::with_capacity(labels.len() * nx * ny);
    let mut mask = Vec::with_capacity(labels.len() * nx * ny);
    for label in &labels {
        if !label.is_consistent() || label.shape != (nx, ny) {
            return Err(invalid("height label does not match its shape"));
        }
        heights.extend_from_slice(&label.heights);
        mask.extend_from_slice(&label.mask);
    }
    let shape = [labels.len(), 1, nx, ny];
    Ok(HeightMapBatch {
        heights: float_tensor(heights, shape, device),
        mask: float_tensor(mask, shape, device),
    })
}

impl<B: Backend> TerrainBatch<B> {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.initial_pose.dims()[0]
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stack samples. All samples must agree on camera count, image size,
    /// label shape, control length and trajectory length.
    pub fn collate(samples: &[TerrainSample], device: &B::Device) -> Result<Self> {
        if samples.is_empty() {
            return Err(invalid("cannot collate an empty batch"));
        }
        let bsz = samples.len();

        let ncams = same(samples, "camera count", |s| s.cameras.len())?;
        let images = if ncams > 0 {
            let [h, w] = same(samples, "image size", |s| s.cameras[0].size)?;
            let mut pixels = Vec::with_capacity(bsz * ncams * 3 * h * w);
            let mut cameras = Vec::with_capacity(bsz);
            for s in samples {
                for cam in &s.cameras {
                    if cam.size != [h, w] || cam.image.len() != 3 * h * w {
                        return Err(invalid("camera image does not match its size"));
                    }
                    pixels.extend_from_slice(&cam.image);
                }
                cameras.push(s.cameras.iter().map(|c| c.geometry).collect());
            }
            Some(ImageBatch {
                images: float_tensor(pixels, [bsz, ncams, 3, h, w], device),
                cameras,
            })
        } else {
            None
        };

        let max_points = samples.iter().map(|s| s.points.len()).max().unwrap_or(0);
        let points = if max_points > 0 {
            let mut coords = vec![f32::NAN; bsz * 3 * max_points];
            for (b, s) in samples.iter().enumerate() {
                for (i, p) in s.points.iter().enumerate() {
                    for (axis, v) in p.as_array().into_iter().enumerate() {
                        coords[(b * 3 + axis) * max_points + i] = v;
                    }
                }
            }
            Some(float_tensor(coords, [bsz, 3, max_points], device))
        } else {
            None
        };

        let geometry = collate_heights(samples.iter().map(|s| &s.geometry).collect(), device)?;
        let terrain = collate_heights(samples.iter().map(|s| &s.terrain).collect(), device)?;
        if geometry.heights.dims() != terrain.heights.dims() {
            return Err(invalid("geometry and terrain labels differ in shape"));
        }

        let steps = same(samples, "control length", |s| s.controls.len())?;
        if steps == 0 {
            return Err(invalid("control sequence is empty"));
        }
        let mut control_ts = Vec::with_capacity(bsz * steps);
        let mut commands = Vec::with_capacity(bsz * steps * 2);
        for s in samples {
            if s.controls.timestamps.len() != steps {
                return Err(invalid("control timestamps do not match commands"));
            }
            control_ts.extend_from_slice(&s.controls.timestamps);
            commands.extend(s.controls.commands.iter().flatten());
        }

        let pose: Vec<f32> = samples
            .iter()
            .flat_map(|s| s.initial_pose.to_matrix())
            .collect();

        let gt_steps = same(samples, "trajectory length", |s| s.trajectory.len())?;
        if gt_steps == 0 {
            return Err(invalid("ground-truth trajectory is empty"));
        }
        let mut ts = Vec::with_capacity(bsz * gt_steps);
        let mut xs = Vec::with_capacity(bsz * gt_steps * 3);
        let mut xds = Vec::with_capacity(bsz * gt_steps * 3);
        let mut rs = Vec::with_capacity(bsz * gt_steps * 9);
        let mut omegas = Vec::with_capacity(bsz * gt_steps * 3);
        for s in samples {
            let t = &s.trajectory;
            if !t.is_consistent() {
                return Err(invalid("trajectory fields differ in length"));
            }
            ts.extend_from_slice(&t.timestamps);
            xs.extend(t.positions.iter().flatten());
            xds.extend(t.linear_velocities.iter().flatten());
            rs.extend(t.orientations.iter().flatten());
            omegas.extend(t.angular_velocities.iter().flatten());
        }

        Ok(Self {
            images,
            points,
            geometry,
            terrain,
            control_timestamps: float_tensor(control_ts, [bsz, steps], device),
            controls: float_tensor(commands, [bsz, steps, 2], device),
            initial_pose: float_tensor(pose, [bsz, 4, 4], device),
            trajectory: TrajectoryBatch {
                timestamps: float_tensor(ts, [bsz, gt_steps], device),
                positions: float_tensor(xs, [bsz, gt_steps, 3], device),
                linear_velocities: float_tensor(xds, [bsz, gt_steps, 3], device),
                orientations: float_tensor(rs, [bsz, gt_steps, 3, 3], device),
                angular_velocities: float_tensor(omegas, [bsz, gt_steps, 3], device),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{ControlSequence, Trajectory};
    use burn::backend::NdArray;
    use terra_core::{Point3, Pose};

    type TestBackend = NdArray;

    fn sample(points: usize) -> TerrainSample {
        let pose = Pose::from_translation(Point3::new(0.0, 0.0, 1.0));
        TerrainSample {
            cameras: Vec::new(),
            points: (0..points).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect(),
            geometry: HeightLabel::constant(0.5, (4, 4)),
            terrain: HeightLabel::constant(0.25, (4, 4)),
            controls: ControlSequence::constant([1.0, 0.0], 5, 0.1),
            initial_pose: pose,
            trajectory: Trajectory::stationary(&pose, vec![0.0, 0.2, 0.4]),
        }
    }

    #[test]
    fn test_collate_shapes() {
        let device = Default::default();
        let batch = TerrainBatch::<TestBackend>::collate(&[sample(3), sample(5)], &device).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.images.is_none());
        assert_eq!(batch.points.as_ref().unwrap().dims(), [2, 3, 5]);
        assert_eq!(batch.geometry.heights.dims(), [2, 1, 4, 4]);
        assert_eq!(batch.controls.dims(), [2, 5, 2]);
        assert_eq!(batch.initial_pose.dims(), [2, 4, 4]);
        assert_eq!(batch.trajectory.orientations.dims(), [2, 3, 3, 3]);
    }

    #[test]
    fn test_points_padded_with_nan() {
        let device = Default::default();
        let batch = TerrainBatch::<TestBackend>::collate(&[sample(1), sample(2)], &device).unwrap();
        let values = crate::util::to_vec(batch.points.unwrap()).unwrap();
        // sample 0, x axis: [0.0, NaN]
        assert_eq!(values[0], 0.0);
        assert!(values[1].is_nan());
        // sample 1, x axis: [0.0, 1.0]
        assert_eq!(values[6], 0.0);
        assert_eq!(values[7], 1.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let device = Default::default();
        let mut b = sample(1);
        b.controls = ControlSequence::constant([0.0, 0.0], 3, 0.1);
        assert!(TerrainBatch::<TestBackend>::collate(&[sample(1), b], &device).is_err());
        assert!(TerrainBatch::<TestBackend>::collate(&[], &device).is_err());
    }
}
