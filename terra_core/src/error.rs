//! Error types for terra_core operations.
//!
//! Provides a simple error enum with no external dependencies for no_std compatibility.

use core::fmt;

/// Error types that can occur during terra_core operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerraCoreError {
    /// A grid extent is not an integer multiple of its resolution.
    NonIntegerExtent {
        /// Extent of the axis (max - min).
        extent: f32,
        /// Cell resolution of the axis.
        resolution: f32,
    },
    /// A grid axis has a non-positive resolution or an empty range.
    DegenerateAxis {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
        /// Resolution.
        resolution: f32,
    },
    /// The coarse/fine resolution ratio is not a positive integer.
    NonIntegerRatio {
        /// Coarse (physics) resolution.
        coarse: f32,
        /// Fine (encoder) resolution.
        fine: f32,
    },
    /// A matrix that must be inverted is singular.
    SingularMatrix,
    /// A sequence that must not be empty was empty.
    EmptySequence,
    /// Image dimensions do not divide by the backbone downsample factor.
    IndivisibleImage {
        /// Image side length.
        size: usize,
        /// Downsample factor.
        downsample: usize,
    },
}

impl fmt::Display for TerraCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerraCoreError::NonIntegerExtent { extent, resolution } => write!(
                f,
                "grid extent {} is not a multiple of resolution {}",
                extent, resolution
            ),
            TerraCoreError::DegenerateAxis {
                min,
                max,
                resolution,
            } => write!(
                f,
                "degenerate grid axis [{}, {}] with resolution {}",
                min, max, resolution
            ),
            TerraCoreError::NonIntegerRatio { coarse, fine } => write!(
                f,
                "physics resolution {} is not a positive integer multiple of encoder resolution {}",
                coarse, fine
            ),
            TerraCoreError::SingularMatrix => write!(f, "matrix is singular"),
            TerraCoreError::EmptySequence => write!(f, "sequence is empty"),
            TerraCoreError::IndivisibleImage { size, downsample } => write!(
                f,
                "image size {} is not divisible by downsample factor {}",
                size, downsample
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TerraCoreError {}
