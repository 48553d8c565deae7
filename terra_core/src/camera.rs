//! Camera frustum geometry for lift-splat encoders.
//!
//! A frustum is a set of `(u, v, depth)` samples laid out as
//! `[row][col][depth_bin]` over the backbone's downsampled feature map.
//! [`CameraGeometry::ego_points`] undoes image augmentation, back-projects
//! through the intrinsics and moves the samples into the robot frame.

use crate::alloc_prelude::Vec;
use crate::error::TerraCoreError;
use crate::types::{Mat3, Point3};

/// Number of depth bins described by `[min, max, step]`.
pub fn depth_bin_count(dbound: [f32; 3]) -> usize {
    let [min, max, step] = dbound;
    if !(step > 0.0) || !(max > min) {
        return 0;
    }
    libm::ceilf((max - min) / step - 1e-4) as usize
}

/// Per-camera calibration plus the augmentation applied to its image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraGeometry {
    /// Camera-to-robot rotation.
    pub rotation: Mat3,
    /// Camera-to-robot translation.
    pub translation: Point3,
    /// Pinhole intrinsics.
    pub intrinsics: Mat3,
    /// Image-plane rotation applied by augmentation.
    pub post_rotation: Mat3,
    /// Image-plane translation applied by augmentation.
    pub post_translation: Point3,
}

impl CameraGeometry {
    /// Camera with no augmentation applied.
    pub fn new(rotation: Mat3, translation: Point3, intrinsics: Mat3) -> Self {
        Self {
            rotation,
            translation,
            intrinsics,
            post_rotation: Mat3::IDENTITY,
            post_translation: Point3::default(),
        }
    }

    /// Set the augmentation transforms.
    pub fn with_post_transform(mut self, rotation: Mat3, translation: Point3) -> Self {
        self.post_rotation = rotation;
        self.post_translation = translation;
        self
    }

    /// Map frustum samples into the robot frame.
    pub fn ego_points(&self, frustum: &Frustum) -> Result<Vec<Point3>, TerraCoreError> {
        let post_inv = self
            .post_rotation
            .inverse()
            .ok_or(TerraCoreError::SingularMatrix)?;
        let k_inv = self
            .intrinsics
            .inverse()
            .ok_or(TerraCoreError::SingularMatrix)?;
        let combine = self.rotation.mul_mat(&k_inv);

        Ok(frustum
            .points
            .iter()
            .map(|&p| {
                let q = post_inv.mul_vec(p - self.post_translation);
                let q = Point3::new(q.x * q.z, q.y * q.z, q.z);
                combine.mul_vec(q) + self.translation
            })
            .collect())
    }
}

/// Frustum samples over a downsampled feature map.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Samples as `(u, v, depth)`, ordered `[row][col][depth_bin]`.
    pub points: Vec<Point3>,
    /// Feature map height.
    pub height: usize,
    /// Feature map width.
    pub width: usize,
    /// Number of depth bins.
    pub depth_bins: usize,
}

impl Frustum {
    /// Build the frustum for an image of `final_dim = [height, width]`
    /// processed by a backbone with stride `downsample`.
    pub fn new(
        final_dim: [usize; 2],
        downsample: usize,
        dbound: [f32; 3],
    ) -> Result<Self, TerraCoreError> {
        let [img_h, img_w] = final_dim;
        for size in [img_h, img_w] {
            if downsample == 0 || size % downsample != 0 || size < downsample {
                return Err(TerraCoreError::IndivisibleImage { size, downsample });
            }
        }
        let height = img_h / downsample;
        let width = img_w / downsample;
        let depth_bins = depth_bin_count(dbound);
        if depth_bins == 0 {
            return Err(TerraCoreError::EmptySequence);
        }

        let linspace = |n: usize, end: f32, i: usize| {
            if n > 1 {
                end * i as f32 / (n - 1) as f32
            } else {
                0.0
            }
        };

        let mut points = Vec::with_capacity(height * width * depth_bins);
        for i in 0..height {
            let v = linspace(height, (img_h - 1) as f32, i);
            for j in 0..width {
                let u = linspace(width, (img_w - 1) as f32, j);
                for k in 0..depth_bins {
                    points.push(Point3::new(u, v, dbound[0] + k as f32 * dbound[2]));
                }
            }
        }

        Ok(Self {
            points,
            height,
            width,
            depth_bins,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the frustum has no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_camera() -> CameraGeometry {
        // Optical axis (z) along robot x, image x along robot -y, image y along robot -z.
        let rotation = Mat3::from_rows([[0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]]);
        let intrinsics = Mat3::from_rows([[100.0, 0.0, 32.0], [0.0, 100.0, 16.0], [0.0, 0.0, 1.0]]);
        CameraGeometry::new(rotation, Point3::new(0.0, 0.0, 1.0), intrinsics)
    }

    #[test]
    fn test_depth_bins() {
        assert_eq!(depth_bin_count([1.0, 35.0, 0.5]), 68);
        assert_eq!(depth_bin_count([1.0, 2.0, 0.3]), 4);
        assert_eq!(depth_bin_count([1.0, 1.0, 0.5]), 0);
    }

    #[test]
    fn test_frustum_layout() {
        let f = Frustum::new([32, 64], 16, [1.0, 3.0, 1.0]).unwrap();
        assert_eq!((f.height, f.width, f.depth_bins), (2, 4, 2));
        assert_eq!(f.len(), 16);
        assert_eq!(f.points[0], Point3::new(0.0, 0.0, 1.0));
        assert_eq!(f.points[1], Point3::new(0.0, 0.0, 2.0));
        assert_eq!(f.points[f.len() - 1], Point3::new(63.0, 31.0, 2.0));
    }

    #[test]
    fn test_frustum_indivisible() {
        assert!(matches!(
            Frustum::new([30, 64], 16, [1.0, 3.0, 1.0]),
            Err(TerraCoreError::IndivisibleImage { size: 30, .. })
        ));
    }

    fn single(p: Point3) -> Frustum {
        Frustum {
            points: Vec::from([p]),
            height: 1,
            width: 1,
            depth_bins: 1,
        }
    }

    #[test]
    fn test_principal_point_projects_forward() {
        let cam = forward_camera();
        let p = cam.ego_points(&single(Point3::new(32.0, 16.0, 5.0))).unwrap()[0];
        assert!((p.x - 5.0).abs() < 1e-4);
        assert!(p.y.abs() < 1e-4);
        assert!((p.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_post_transform_is_undone() {
        let cam = forward_camera();
        let raw = Point3::new(10.0, 4.0, 3.0);
        let scale = 0.5;
        let shift = Point3::new(-2.0, -1.0, 0.0);
        let augmented = Point3::new(raw.x * scale + shift.x, raw.y * scale + shift.y, raw.z);

        let plain = cam.ego_points(&single(raw)).unwrap()[0];
        let undone = cam
            .with_post_transform(Mat3::diagonal(scale, scale, 1.0), shift)
            .ego_points(&single(augmented))
            .unwrap()[0];
        assert!((plain - undone).length() < 1e-4);
    }
}
