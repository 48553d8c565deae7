//! # terra_core
//!
//! Pure math for bird's-eye-view terrain grids.
//!
//! This crate holds the geometry shared by the training and inference sides
//! of the terrain stack: rigid poses, camera frustums, grid bounds and the
//! resolution bridge arithmetic. It performs no I/O and owns no tensors.
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables standard library support
//! - `alloc`: Enables heap allocation (Vec, etc.) without full std
//!
//! ## Modules
//!
//! - [`types`]: `Point3`, `Mat3`, `Pose`, roll/pitch/yaw and leveling
//! - [`grid`]: `GridBounds`, `BevGrid`, [`grid::pooling_ratio`]
//! - [`camera`]: frustum generation and camera-to-ego projection
//! - [`augmentation`]: eval-time resize/crop parameters and post transforms
//! - [`timing`]: nearest-timestamp matching and horizon truncation
//! - [`error`]: Error types
//!
//! ## Usage
//!
//! ```ignore
//! use terra_core::prelude::*;
//!
//! let grid = BevGrid::new(
//!     GridBounds::new(-6.4, 6.4, 0.1),
//!     GridBounds::new(-6.4, 6.4, 0.1),
//!     GridBounds::new(-2.0, 2.0, 4.0),
//! )?;
//! let kernel = pooling_ratio(0.4, grid.resolution())?;
//! assert_eq!(kernel, 4);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

#[cfg(feature = "std")]
mod alloc_prelude {
    pub use std::vec::Vec;
}

#[cfg(all(feature = "alloc", not(feature = "std")))]
mod alloc_prelude {
    pub use alloc::vec::Vec;
}

pub mod error;
pub mod grid;
pub mod timing;
pub mod types;

#[cfg(any(feature = "std", feature = "alloc"))]
pub mod augmentation;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod camera;

pub use error::TerraCoreError;
pub use grid::{pooling_ratio, BevGrid, GridBounds};
pub use timing::truncate_horizon;
pub use types::{Mat3, Point3, Pose};

#[cfg(any(feature = "std", feature = "alloc"))]
pub use augmentation::{eval_augmentation, AugmentationParams};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use camera::{depth_bin_count, CameraGeometry, Frustum};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use timing::nearest_indices;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::TerraCoreError;
    pub use crate::grid::{pooling_ratio, BevGrid, GridBounds};
    pub use crate::timing::truncate_horizon;
    pub use crate::types::{Mat3, Point3, Pose};

    #[cfg(any(feature = "std", feature = "alloc"))]
    pub use crate::augmentation::{eval_augmentation, AugmentationParams};
    #[cfg(any(feature = "std", feature = "alloc"))]
    pub use crate::camera::{depth_bin_count, CameraGeometry, Frustum};
    #[cfg(any(feature = "std", feature = "alloc"))]
    pub use crate::timing::nearest_indices;
}
