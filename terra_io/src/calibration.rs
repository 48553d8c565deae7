//! Static calibration files.
//!
//! ```json
//! {
//!   "cameras": {
//!     "camera_front": { "width": 1920, "height": 1200, "camera_matrix": [fx, 0, cx, 0, fy, cy, 0, 0, 1] }
//!   },
//!   "transformations": {
//!     "T_base_link__camera_front": [16 row-major values]
//!   }
//! }
//! ```
//!
//! A transformation `T_<robot_frame>__<camera>` maps camera-frame points
//! into the robot frame.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use terra_core::{Mat3, Pose};

use crate::error::{Result, TerraIoError};

/// Pinhole intrinsics of one camera.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraIntrinsics {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Row-major 3x3 camera matrix.
    pub camera_matrix: [f32; 9],
}

impl CameraIntrinsics {
    /// Camera matrix as a [`Mat3`].
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_row_major(&self.camera_matrix)
    }
}

/// Calibration loaded from disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticCalibration {
    #[serde(default)]
    cameras: BTreeMap<String, CameraIntrinsics>,
    #[serde(default)]
    transformations: BTreeMap<String, [f32; 16]>,
}

impl StaticCalibration {
    /// Load a calibration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TerraIoError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| TerraIoError::InvalidFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TerraIoError::InvalidFormat {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }

    /// Intrinsics of `camera`.
    pub fn intrinsics(&self, camera: &str) -> Result<&CameraIntrinsics> {
        self.cameras
            .get(camera)
            .ok_or_else(|| TerraIoError::MissingCalibration(camera.to_string()))
    }

    /// Camera-to-robot transform `T_<robot_frame>__<camera>`.
    pub fn extrinsics(&self, robot_frame: &str, camera: &str) -> Result<Pose> {
        let key = format!("T_{}__{}", robot_frame, camera);
        self.transformations
            .get(&key)
            .map(Pose::from_matrix)
            .ok_or(TerraIoError::MissingCalibration(key))
    }

    /// Names of the calibrated cameras.
    pub fn cameras(&self) -> impl Iterator<Item = &str> {
        self.cameras.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALIB: &str = r#"{
        "cameras": {
            "camera_front": {
                "width": 640, "height": 480,
                "camera_matrix": [500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0]
            }
        },
        "transformations": {
            "T_base_link__camera_front": [1.0, 0.0, 0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.2, 0.0, 0.0, 0.0, 1.0]
        }
    }"#;

    #[test]
    fn test_parse() {
        let calib = StaticCalibration::from_json(CALIB).unwrap();
        let k = calib.intrinsics("camera_front").unwrap();
        assert_eq!(k.width, 640);
        assert_eq!(k.matrix().rows[1][2], 240.0);

        let pose = calib.extrinsics("base_link", "camera_front").unwrap();
        assert_eq!(pose.translation.x, 0.5);
        assert_eq!(pose.translation.z, 1.2);
        assert_eq!(calib.cameras().collect::<Vec<_>>(), vec!["camera_front"]);
    }

    #[test]
    fn test_missing_entries() {
        let calib = StaticCalibration::from_json(CALIB).unwrap();
        assert!(matches!(
            calib.extrinsics("odom", "camera_front"),
            Err(TerraIoError::MissingCalibration(key)) if key == "T_odom__camera_front"
        ));
        assert!(calib.intrinsics("camera_left").is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StaticCalibration::load(dir.path().join("nope.json")),
            Err(TerraIoError::NotFound(_))
        ));
    }
}
