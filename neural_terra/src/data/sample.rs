//! Host-side training samples.

use terra_core::{CameraGeometry, Point3, Pose};

/// One preprocessed camera image with its calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Normalized image, channel-major `[3, height, width]`.
    pub image: Vec<f32>,
    /// Image size as `[height, width]`.
    pub size: [usize; 2],
    /// Calibration and augmentation transforms.
    pub geometry: CameraGeometry,
}

/// Height-map label with a per-cell validity weight.
///
/// Cells with weight zero are ignored by the loss, whatever their height.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightLabel {
    /// Heights, row-major over `(nx, ny)`.
    pub heights: Vec<f32>,
    /// Validity weights, same layout.
    pub mask: Vec<f32>,
    /// Grid shape `(nx, ny)`.
    pub shape: (usize, usize),
}

impl HeightLabel {
    /// Label with every cell valid.
    pub fn dense(heights: Vec<f32>, shape: (usize, usize)) -> Self {
        let mask = vec![1.0; heights.len()];
        Self {
            heights,
            mask,
            shape,
        }
    }

    /// Constant label with every cell valid.
    pub fn constant(value: f32, shape: (usize, usize)) -> Self {
        Self::dense(vec![value; shape.0 * shape.1], shape)
    }

    /// Check buffer sizes against the shape.
    pub fn is_consistent(&self) -> bool {
        let n = self.shape.0 * self.shape.1;
        self.heights.len() == n && self.mask.len() == n
    }
}

/// Timestamped `(linear, angular)` velocity commands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlSequence {
    /// Command timestamps, ascending, seconds.
    pub timestamps: Vec<f32>,
    /// `[v, omega]` per timestamp.
    pub commands: Vec<[f32; 2]>,
}

impl ControlSequence {
    /// Commands held constant at `command` for `steps` samples spaced by `dt`.
    pub fn constant(command: [f32; 2], steps: usize, dt: f32) -> Self {
        Self {
            timestamps: (0..steps).map(|i| i as f32 * dt).collect(),
            commands: vec![command; steps],
        }
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Recorded robot trajectory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    /// Timestamps, ascending, seconds.
    pub timestamps: Vec<f32>,
    /// Positions.
    pub positions: Vec<[f32; 3]>,
    /// Linear velocities.
    pub linear_velocities: Vec<[f32; 3]>,
    /// Row-major rotation matrices.
    pub orientations: Vec<[f32; 9]>,
    /// Angular velocities.
    pub angular_velocities: Vec<[f32; 3]>,
}

impl Trajectory {
    /// Robot at rest at `pose` for every timestamp.
    pub fn stationary(pose: &Pose, timestamps: Vec<f32>) -> Self {
        let n = timestamps.len();
        Self {
            timestamps,
            positions: vec![pose.translation.as_array(); n],
            linear_velocities: vec![[0.0; 3]; n],
            orientations: vec![pose.rotation.to_row_major(); n],
            angular_velocities: vec![[0.0; 3]; n],
        }
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Check that every field has one entry per timestamp.
    pub fn is_consistent(&self) -> bool {
        let n = self.timestamps.len();
        self.positions.len() == n
            && self.linear_velocities.len() == n
            && self.orientations.len() == n
            && self.angular_velocities.len() == n
    }
}

/// Everything one training example carries.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSample {
    /// Camera images; empty for point-only data.
    pub cameras: Vec<CameraFrame>,
    /// Point cloud in the robot frame; empty for image-only data.
    pub points: Vec<Point3>,
    /// Raw observed heights.
    pub geometry: HeightLabel,
    /// Traversability-filtered heights.
    pub terrain: HeightLabel,
    /// Commands driving the rollout.
    pub controls: ControlSequence,
    /// Robot pose at the first control timestamp.
    pub initial_pose: Pose,
    /// Ground-truth trajectory.
    pub trajectory: Trajectory,
}
