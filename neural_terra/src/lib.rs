//! # neural_terra
//!
//! Physics-coupled terrain encoder training with Burn.
//!
//! A multi-modal encoder (camera images, lidar points or both) predicts a
//! bird's-eye-view grid of geometry heights, traversable terrain heights and
//! friction. The terrain and friction grids are pooled to the physics
//! resolution and drive a differentiable rigid-body rollout, so the error
//! between simulated and recorded robot trajectories trains the encoder
//! alongside the height-map supervision.
//!
//! ## Features
//!
//! - **Model adapter**: `lss` (images), `voxelnet` (points) and `bevfusion`
//!   (both) behind one forward contract
//! - **Resolution bridge**: integer-ratio mean pooling plus a Laplacian
//!   curvature regularizer
//! - **Differentiable physics**: diff-drive rollout over height and friction
//!   grids, end to end on the autodiff tape
//! - **Loss aggregation**: weighted geometry, terrain and trajectory terms;
//!   a zero weight skips its term entirely
//! - **Training loop**: best-loss checkpoints, emergency checkpoint on a
//!   non-finite loss, per-step and per-epoch scalar logs
//! - **Online inference**: frame gating, camera calibration and leveling for
//!   a frozen encoder
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use burn::backend::{Autodiff, NdArray};
//! use neural_terra::{
//!     config::TrainingConfig,
//!     data::{InMemoryDataset, SyntheticTerrain},
//!     training::TerrainTrainer,
//! };
//!
//! type MyBackend = Autodiff<NdArray>;
//!
//! let config = TrainingConfig::load("training_cfg.json")?;
//! let grid = config.grid.bev_grid()?;
//! let samples = SyntheticTerrain::new(grid, 20, 0.1).generate(64, 0);
//!
//! let device = Default::default();
//! let mut trainer =
//!     TerrainTrainer::<MyBackend>::new(config, Arc::new(InMemoryDataset::new(samples)), device)?;
//! let state = trainer.fit()?;
//! println!("best val loss {}", state.best_val_loss);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! terra_core (pure math)
//!     │
//!     ├──────────────────┐
//!     ▼                  ▼
//! terra_io          neural_terra
//! (run dirs,        (encoders, physics,
//!  locks, CSV)       losses, training)
//!     │                  ▲
//!     └──────────────────┘
//!     checkpoints / scalar logs
//! ```
//!
//! ## Feature Flags
//!
//! - `ndarray` (default): CPU backend using ndarray
//! - `wgpu`: GPU acceleration via WebGPU

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod loss;
pub mod nn;
pub mod physics;
pub mod terrain;
pub mod training;
pub mod util;

// Re-export key types for convenience
pub use adapter::{ModelAdapter, ModelVariant};
pub use bridge::GridResolutionBridge;
pub use config::{LossConfig, PhysicsConfig, TerrainGridConfig, TrainingConfig};
pub use error::{NeuralTerraError, Result};
pub use loss::{LossAggregator, LossBundle, LossScalars};
pub use physics::{DiffDriveSimulator, PhysicsSimulator};
pub use terrain::TerrainOutput;
pub use training::{TerrainTrainer, TrainerPhase, TrainerState};

// Re-export from terra_core and terra_io for convenience
pub use terra_core::{BevGrid, Mat3, Point3, Pose};
pub use terra_io::PathLock;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adapter::{ModelAdapter, ModelVariant};
    pub use crate::bridge::GridResolutionBridge;
    pub use crate::config::{
        EncoderConfig, ImageAugConfig, ImageEncoderConfig, LossConfig, PhysicsConfig,
        PointEncoderConfig, TerrainGridConfig, TrainingConfig,
    };
    pub use crate::data::{
        BatchLoader, CameraFrame, ControlSequence, HeightLabel, InMemoryDataset, SlopedPlane,
        SyntheticTerrain, TerrainBatch, TerrainDataset, TerrainSample, Trajectory,
    };
    pub use crate::error::{NeuralTerraError, Result};
    pub use crate::inference::{
        CalibrationSource, CameraImage, FrameGate, GeoGrid, LiveCalibration, SensorFrame,
        StaticFileCalibration, TerrainInference, TransformLookup,
    };
    pub use crate::loss::{
        height_map_loss, masked_mse, trajectory_loss, LossAggregator, LossBundle, LossScalars,
    };
    pub use crate::nn::{ModalityInputs, TerrainModel};
    pub use crate::physics::{
        Controls, DiffDriveSimulator, PhysicsGrids, PhysicsSimulator, RigidState,
        StateTrajectory,
    };
    pub use crate::terrain::TerrainOutput;
    pub use crate::training::{
        checkpoint_exists, load_weights, save_checkpoint, CheckpointKind, CheckpointMetadata,
        MetricsLogger, NoopVisualizer, SnapshotWriter, Split, TerrainTrainer, TrainerPhase,
        TrainerState, VisualizationHook,
    };

    pub use terra_core::{BevGrid, Mat3, Point3, Pose};
    pub use terra_io::{PathLock, RunDirectory};
}
