use std::path::Path;

use terra_core::{Mat3, Pose};
use terra_io::StaticCalibration;

use crate::error::{NeuralTerraError, Result};

/// Camera metadata that travels with each image.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    /// Camera name in the calibration file.
    pub name: String,
    /// Frame the image is expressed in.
    pub frame_id: String,
    /// Row-major intrinsic matrix.
    pub k: [f32; 9],
}

/// Intrinsics and camera-to-robot extrinsics of one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraCalibration {
    /// Camera-to-robot transform.
    pub extrinsics: Pose,
    /// Pinhole intrinsics.
    pub intrinsics: Mat3,
}

/// Resolves camera calibration for an incoming frame.
pub trait CalibrationSource {
    /// Calibration of the camera described by `info`.
    fn resolve(&self, info: &CameraInfo) -> Result<CameraCalibration>;
}

/// Rigid transform lookup between named frames.
pub trait TransformLookup {
    /// Transform mapping points in `from` into `to`.
    fn lookup(&self, from: &str, to: &str) -> Result<Pose>;
}

/// Calibration from a static file.
#[derive(Debug, Clone)]
pub struct StaticFileCalibration {
    calibration: StaticCalibration,
    robot_frame: String,
}

impl StaticFileCalibration {
    /// Load `path` for cameras mounted on `robot_frame`.
    pub fn load(path: impl AsRef<Path>, robot_frame: impl Into<String>) -> Result<Self> {
        let calibration = StaticCalibration::load(path)?;
        Ok(Self::new(calibration, robot_frame))
    }

    /// Wrap an already parsed calibration.
    pub fn new(calibration: StaticCalibration, robot_frame: impl Into<String>) -> Self {
        Self {
            calibration,
            robot_frame: robot_frame.into(),
        }
    }
}

impl CalibrationSource for StaticFileCalibration {
    fn resolve(&self, info: &CameraInfo) -> Result<CameraCalibration> {
        let lookup = || -> terra_io::Result<CameraCalibration> {
            Ok(CameraCalibration {
                extrinsics: self.calibration.extrinsics(&self.robot_frame, &info.name)?,
                intrinsics: self.calibration.intrinsics(&info.name)?.matrix(),
            })
        };
        lookup().map_err(|e| NeuralTerraError::Calibration {
            message: e.to_string(),
        })
    }
}

/// Calibration from the camera info plus a live transform lookup.
#[derive(Debug, Clone)]
pub struct LiveCalibration<T> {
    transforms: T,
    robot_frame: String,
}

impl<T: TransformLookup> LiveCalibration<T> {
    /// Resolve extrinsics into `robot_frame` through `transforms`.
    pub fn new(transforms: T, robot_frame: impl Into<String>) -> Self {
        Self {
            transforms,
            robot_frame: robot_frame.into(),
        }
    }
}

impl<T: TransformLookup> CalibrationSource for LiveCalibration<T> {
    fn resolve(&self, info: &CameraInfo) -> Result<CameraCalibration> {
        let extrinsics = self
            .transforms
            .lookup(&info.frame_id, &self.robot_frame)
            .map_err(|e| NeuralTerraError::Calibration {
                message: format!(
                    "could not transform from {} to {}: {}",
                    info.frame_id, self.robot_frame, e
                ),
            })?;
        Ok(CameraCalibration {
            extrinsics,
            intrinsics: Mat3::from_row_major(&info.k),
        })
    }
}

/// Rotate sensor extrinsics into a gravity-aligned frame.
///
/// Keeps the roll and pitch of `robot_orientation` and discards its yaw. The
/// translation is untouched.
pub fn level_extrinsics(extrinsics: &Pose, robot_orientation: &Mat3) -> Pose {
    Pose::new(
        robot_orientation.leveled().mul_mat(&extrinsics.rotation),
        extrinsics.translation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_core::Point3;

    const CALIB: &str = r#"{
        "cameras": {
            "camera_front": { "width": 640, "height": 480, "camera_matrix": [500, 0, 320, 0, 500, 240, 0, 0, 1] }
        },
        "transformations": {
            "T_base_link__camera_front": [1, 0, 0, 0.5, 0, 1, 0, 0, 0, 0, 1, 1.0, 0, 0, 0, 1]
        }
    }"#;

    fn info(name: &str) -> CameraInfo {
        CameraInfo {
            name: name.to_string(),
            frame_id: format!("{}_optical", name),
            k: [400.0, 0.0, 200.0, 0.0, 400.0, 100.0, 0.0, 0.0, 1.0],
        }
    }

    struct FixedLookup(Option<Pose>);

    impl TransformLookup for FixedLookup {
        fn lookup(&self, from: &str, to: &str) -> Result<Pose> {
            self.0.ok_or_else(|| NeuralTerraError::Calibration {
                message: format!("no transform {} -> {}", from, to),
            })
        }
    }

    #[test]
    fn test_static_calibration() {
        let source =
            StaticFileCalibration::new(StaticCalibration::from_json(CALIB).unwrap(), "base_link");
        let calib = source.resolve(&info("camera_front")).unwrap();
        assert_eq!(calib.extrinsics.translation, Point3::new(0.5, 0.0, 1.0));
        assert_eq!(calib.intrinsics.rows[0][0], 500.0);

        let err = source.resolve(&info("camera_rear")).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_live_calibration() {
        let pose = Pose::from_translation(Point3::new(1.0, 2.0, 3.0));
        let source = LiveCalibration::new(FixedLookup(Some(pose)), "base_link");
        let calib = source.resolve(&info("camera_front")).unwrap();
        assert_eq!(calib.extrinsics, pose);
        assert_eq!(calib.intrinsics.rows[1][2], 100.0);

        let failing = LiveCalibration::new(FixedLookup(None), "base_link");
        assert!(matches!(
            failing.resolve(&info("camera_front")),
            Err(NeuralTerraError::Calibration { .. })
        ));
    }

    #[test]
    fn test_leveling_discards_yaw() {
        let extrinsics = Pose::from_translation(Point3::new(0.1, 0.2, 0.3));
        let robot = Mat3::from_rpy(0.1, -0.2, 1.3);
        let leveled = level_extrinsics(&extrinsics, &robot);
        let (roll, pitch, yaw) = leveled.rotation.to_rpy();
        assert!((roll - 0.1).abs() < 1e-5);
        assert!((pitch + 0.2).abs() < 1e-5);
        assert!(yaw.abs() < 1e-5);
        assert_eq!(leveled.translation, extrinsics.translation);
    }
}
