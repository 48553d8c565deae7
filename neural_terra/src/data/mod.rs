//! Samples, datasets and batching.
//!
//! Decoding samples from disk belongs to the caller: anything implementing
//! [`TerrainDataset`] can feed the trainer. This module splits a dataset,
//! orders it per epoch and collates host samples into backend tensors.

mod batch;
mod dataset;
mod loader;
mod sample;
mod synthetic;

pub use batch::{HeightMapBatch, ImageBatch, TerrainBatch, TrajectoryBatch};
pub use dataset::{
    debug_indices, split_indices, InMemoryDataset, SubsetDataset, TerrainDataset,
    DEBUG_SUBSET_SIZE,
};
pub use loader::BatchLoader;
pub use sample::{CameraFrame, ControlSequence, HeightLabel, TerrainSample, Trajectory};
pub use synthetic::{SlopedPlane, SyntheticTerrain};
