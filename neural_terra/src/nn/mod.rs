//! Encoder networks.
//!
//! Three variants share one module type. [`TerrainModel`] holds an optional
//! image branch, an optional point branch, an optional fusion convolution
//! and the shared [`TerrainHead`]; which branches exist is fixed when the
//! model is built.

mod head;
mod image;
mod mlp;
mod model;
mod point;
mod splat;

pub use head::TerrainHead;
pub use image::ImageBranch;
pub use mlp::{Mlp, MlpConfig};
pub use model::{ImageInputs, ModalityInputs, PointInputs, TerrainModel};
pub use point::{PointBranch, POINT_FEATURES};
pub use splat::SplatIndex;
