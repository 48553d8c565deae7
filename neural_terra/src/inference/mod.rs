//! Online terrain inference from live sensor frames.
//!
//! Mirrors the training-time preprocessing: images are resized, cropped and
//! normalized, camera extrinsics are leveled with the robot's roll and pitch,
//! and the frozen encoder's terrain channel is returned as a [`GeoGrid`].

mod calibration;
mod encoder;
mod gate;
mod preprocess;

pub use calibration::{
    level_extrinsics, CalibrationSource, CameraCalibration, CameraInfo, LiveCalibration,
    StaticFileCalibration, TransformLookup,
};
pub use encoder::{CameraImage, GeoGrid, SensorFrame, TerrainInference};
pub use gate::FrameGate;
pub use preprocess::{
    apply_augmentation, preprocess_image, PreparedImage, IMAGENET_MEAN, IMAGENET_STD,
};
