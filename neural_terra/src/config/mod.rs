//! Configuration types for neural_terra.
//!
//! Burn-style configuration structs for the encoder grid, the encoder
//! networks, the physics rollout, the losses and the training loop. Every
//! struct serializes to JSON through [`burn::config::Config`]; a run writes
//! copies next to its checkpoints.

mod grid;
mod network;
mod physics;
mod training;

pub use grid::{ImageAugConfig, TerrainGridConfig};
pub use network::{EncoderConfig, ImageEncoderConfig, PointEncoderConfig};
pub use physics::PhysicsConfig;
pub use training::{LossConfig, TrainingConfig};
