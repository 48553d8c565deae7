//! Lock-guarded CSV output.
//!
//! Every write takes the file's [`PathLock`] so concurrent runs sharing a
//! metrics file never interleave partial rows.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::lock::PathLock;

/// Write `text` to `path`, truncating unless `append` is set.
pub fn write_to_csv(path: impl AsRef<Path>, text: &str, append: bool, create_dirs: bool) -> Result<()> {
    let path = path.as_ref();
    if create_dirs {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }
    let guard = PathLock::new(path).acquire()?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    file.write_all(text.as_bytes())?;
    guard.release()
}

/// Append `text` to `path`, creating parent directories.
pub fn append_to_csv(path: impl AsRef<Path>, text: &str) -> Result<()> {
    write_to_csv(path, text, true, true)
}

/// Append-only `tag,step,value` log.
#[derive(Debug, Clone)]
pub struct ScalarLog {
    path: PathBuf,
}

impl ScalarLog {
    /// Header row written when the file is first created.
    pub const HEADER: &'static str = "tag,step,value\n";

    /// Log into `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one scalar.
    pub fn add_scalar(&mut self, tag: &str, step: usize, value: f32) -> Result<()> {
        if !self.path.exists() {
            write_to_csv(&self.path, Self::HEADER, false, true)?;
        }
        append_to_csv(&self.path, &format!("{},{},{}\n", tag, step, value))
    }
}
