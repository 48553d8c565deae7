//! Error types for terra_io operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during terra_io operations.
#[derive(Error, Debug)]
pub enum TerraIoError {
    /// Underlying file-system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The lock could not be acquired within the retry budget.
    #[error("could not acquire lock {path} after {attempts} attempts")]
    LockAcquisition {
        /// Path of the lock marker file.
        path: PathBuf,
        /// Number of acquisition attempts made.
        attempts: usize,
    },

    /// A file that must exist does not.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Malformed file contents.
    #[error("invalid format in {path}: {message}")]
    InvalidFormat {
        /// File being parsed.
        path: PathBuf,
        /// Description of the format error.
        message: String,
    },

    /// A requested calibration entry is missing.
    #[error("missing calibration entry: {0}")]
    MissingCalibration(String),
}

/// Result type for terra_io operations.
pub type Result<T> = std::result::Result<T, TerraIoError>;
