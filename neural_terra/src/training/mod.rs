//! Training loop, checkpoints and metrics.
//!
//! This module provides:
//! - `TerrainTrainer`: the epoch loop with NaN abort and best-loss checkpoints
//! - `TrainerState`: explicit counters and best-loss trackers
//! - Checkpoint save/load through burn's recorder with JSON metadata
//! - Scalar metric logging and visualization hooks

mod checkpoint;
mod clip;
mod metrics;
mod state;
mod trainer;
mod visualize;

pub use checkpoint::{
    checkpoint_exists, load_metadata, load_weights, metadata_path, save_checkpoint, weights_path,
    CheckpointKind, CheckpointMetadata,
};
pub use clip::{clip_global_norm, global_grad_norm};
pub use metrics::{EpochAccumulator, MetricsLogger};
pub use state::{Split, TrainerPhase, TrainerState};
pub use trainer::TerrainTrainer;
pub use visualize::{
    NoopVisualizer, SampleSnapshot, SnapshotWriter, VisualSnapshot, VisualizationHook,
};
