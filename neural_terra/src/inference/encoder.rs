use std::path::Path;

use burn::prelude::*;
use terra_core::{CameraGeometry, Mat3, Point3};

use crate::adapter::ModelAdapter;
use crate::config::TrainingConfig;
use crate::data::ImageBatch;
use crate::error::{NeuralTerraError, Result};
use crate::nn::TerrainModel;
use crate::training::load_weights;
use crate::util::{float_tensor, to_vec};

use super::calibration::{level_extrinsics, CalibrationSource, CameraInfo};
use super::gate::FrameGate;
use super::preprocess::preprocess_image;

/// One camera image with its metadata.
#[derive(Debug, Clone)]
pub struct CameraImage {
    /// Camera name, frame and intrinsics.
    pub info: CameraInfo,
    /// Row-major `height x width x 3` RGB bytes.
    pub rgb: Vec<u8>,
    /// Source height.
    pub height: usize,
    /// Source width.
    pub width: usize,
}

/// Time-synchronized sensor data.
#[derive(Debug, Clone, Default)]
pub struct SensorFrame {
    /// Acquisition time in seconds.
    pub stamp: f64,
    /// Camera images.
    pub cameras: Vec<CameraImage>,
    /// Point cloud in the robot frame.
    pub points: Option<Vec<Point3>>,
    /// Robot orientation in the fixed frame, used for leveling.
    pub robot_orientation: Option<Mat3>,
}

/// Terrain height grid anchored at the robot frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoGrid {
    /// Terrain heights, row-major over `shape`.
    pub heights: Vec<f32>,
    /// Friction on the same cells.
    pub friction: Vec<f32>,
    /// `(nx, ny)`.
    pub shape: (usize, usize),
    /// Cell size in meters.
    pub resolution: f32,
    /// Frame the grid is centered on.
    pub frame_id: String,
    /// Stamp of the source frame.
    pub stamp: f64,
}

/// Frozen encoder turning sensor frames into terrain grids.
pub struct TerrainInference<B: Backend> {
    adapter: ModelAdapter,
    model: TerrainModel<B>,
    calibration: Box<dyn CalibrationSource>,
    gate: FrameGate,
    resolution: f32,
    bot_pct_lim: [f32; 2],
    robot_frame: String,
    device: B::Device,
}

impl<B: Backend> TerrainInference<B> {
    /// Wrap a trained model.
    pub fn new(
        config: &TrainingConfig,
        model: TerrainModel<B>,
        calibration: Box<dyn CalibrationSource>,
        robot_frame: impl Into<String>,
        device: B::Device,
    ) -> Result<Self> {
        let adapter = ModelAdapter::new(config)?;
        if model.variant() != adapter.variant() {
            return Err(NeuralTerraError::config(format!(
                "weights are a {} model, configuration asks for {}",
                model.variant(),
                adapter.variant()
            )));
        }
        Ok(Self {
            adapter,
            model,
            calibration,
            gate: FrameGate::default(),
            resolution: config.grid.resolution(),
            bot_pct_lim: config.augmentation.bot_pct_lim,
            robot_frame: robot_frame.into(),
            device,
        })
    }

    /// Build the configured model and load `weights` into it.
    ///
    /// Missing weights are logged and the model keeps its initialization.
    pub fn from_weights(
        config: &TrainingConfig,
        weights: impl AsRef<Path>,
        calibration: Box<dyn CalibrationSource>,
        robot_frame: impl Into<String>,
        device: B::Device,
    ) -> Result<Self> {
        let adapter = ModelAdapter::new(config)?;
        let weights = weights.as_ref();
        let mut model = adapter.init_model::<B>(config, &device);
        match load_weights(model.clone(), weights, &device) {
            Ok(loaded) => {
                log::info!("Loaded terrain encoder from {:?}", weights);
                model = loaded;
            }
            Err(e) => log::error!("{}; using random weights", e),
        }
        Self::new(config, model, calibration, robot_frame, device)
    }

    /// Replace the staleness gate.
    pub fn with_gate(mut self, gate: FrameGate) -> Self {
        self.gate = gate;
        self
    }

    /// Encode `frame` received at `now`.
    ///
    /// Returns `Ok(None)` when the frame is stale or a camera cannot be
    /// calibrated; both are logged and the caller moves on to the next frame.
    pub fn process(&self, frame: &SensorFrame, now: f64) -> Result<Option<GeoGrid>> {
        if !self.gate.accept(frame.stamp, now) {
            return Ok(None);
        }

        let images = if self.adapter.variant().uses_images() {
            match self.camera_inputs(frame) {
                Ok(images) => Some(images),
                Err(e) if !e.is_fatal() => {
                    log::error!("Dropping frame at {:.3}: {}", frame.stamp, e);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        let points = if self.adapter.variant().uses_points() {
            frame.points.as_deref().map(|pts| self.point_input(pts))
        } else {
            None
        };

        let output = self
            .adapter
            .encode(&self.model, images.as_ref(), points.as_ref())?;
        let [_, _, nx, ny] = output.dims();
        Ok(Some(GeoGrid {
            heights: to_vec(output.terrain)?,
            friction: to_vec(output.friction)?,
            shape: (nx, ny),
            resolution: self.resolution,
            frame_id: self.robot_frame.clone(),
            stamp: frame.stamp,
        }))
    }

    fn camera_inputs(&self, frame: &SensorFrame) -> Result<ImageBatch<B>> {
        if frame.cameras.is_empty() {
            return Err(NeuralTerraError::MissingInput {
                field: "camera images",
                variant: self.adapter.variant().name(),
            });
        }
        let final_dim = self.adapter.final_dim();
        let mut data = Vec::with_capacity(frame.cameras.len() * 3 * final_dim[0] * final_dim[1]);
        let mut cameras = Vec::with_capacity(frame.cameras.len());

        for camera in &frame.cameras {
            let calib = self.calibration.resolve(&camera.info)?;
            let extrinsics = match &frame.robot_orientation {
                Some(orientation) => level_extrinsics(&calib.extrinsics, orientation),
                None => calib.extrinsics,
            };
            let image = preprocess_image(
                &camera.rgb,
                camera.height,
                camera.width,
                final_dim,
                self.bot_pct_lim,
            )?;
            data.extend_from_slice(&image.data);
            cameras.push(
                CameraGeometry::new(extrinsics.rotation, extrinsics.translation, calib.intrinsics)
                    .with_post_transform(image.post_rotation, image.post_translation),
            );
        }

        let n = cameras.len();
        Ok(ImageBatch {
            images: float_tensor(data, [1, n, 3, final_dim[0], final_dim[1]], &self.device),
            cameras: vec![cameras],
        })
    }

    fn point_input(&self, points: &[Point3]) -> Tensor<B, 3> {
        let n = points.len();
        let mut coords = vec![0.0; 3 * n];
        for (i, p) in points.iter().enumerate() {
            coords[i] = p.x;
            coords[n + i] = p.y;
            coords[2 * n + i] = p.z;
        }
        float_tensor(coords, [1, 3, n], &self.device)
    }
}
