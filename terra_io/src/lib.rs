//! terra_io - file-system plumbing for terrain training runs.
//!
//! This crate provides the I/O layer shared by training and inference:
//!
//! - [`PathLock`]: cross-process mutual exclusion through an atomically
//!   created `<path>.lock` marker file, with randomized bounded retry
//! - [`write_to_csv`] / [`append_to_csv`] and [`ScalarLog`]: lock-guarded
//!   metric files
//! - [`RunDirectory`]: the timestamp-named per-run output directory
//! - [`StaticCalibration`]: camera intrinsics and extrinsics from a JSON
//!   calibration file
//!
//! # Example
//!
//! ```ignore
//! use terra_io::{RunDirectory, ScalarLog};
//!
//! let run = RunDirectory::create("runs", "rough_terrain", "lss")?;
//! let mut scalars = ScalarLog::new(run.path().join("scalars.csv"));
//! scalars.add_scalar("train/iter_loss", 0, 0.25)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calibration;
pub mod csv;
pub mod error;
pub mod lock;
pub mod run_dir;

pub use calibration::{CameraIntrinsics, StaticCalibration};
pub use csv::{append_to_csv, write_to_csv, ScalarLog};
pub use error::{Result, TerraIoError};
pub use lock::{PathLock, PathLockGuard};
pub use run_dir::RunDirectory;
