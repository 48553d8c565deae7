//! Per-run output directory.
//!
//! Layout: `<output_dir>/<dataset>/<model>_<YYYY_mm_dd_HH_MM_SS>/`, holding
//! weight checkpoints, configuration copies, `scalars.csv` and `visuals/`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;

/// Timestamp format used in run directory names.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// A created run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Create a fresh timestamp-named directory.
    ///
    /// Appends a numeric suffix when a run started within the same second
    /// already owns the name.
    pub fn create(output_dir: impl AsRef<Path>, dataset: &str, model: &str) -> Result<Self> {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let parent = output_dir.as_ref().join(dataset);
        fs::create_dir_all(&parent)?;

        let base = format!("{}_{}", model, stamp);
        let mut root = parent.join(&base);
        let mut suffix = 1;
        loop {
            match fs::create_dir(&root) {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    root = parent.join(format!("{}_{}", base, suffix));
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        log::info!("run directory: {}", root.display());
        Ok(Self { root })
    }

    /// Wrap an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Checkpoint path without extension; the recorder adds its own.
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of a configuration copy.
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    /// Scalar metrics file.
    pub fn scalars_path(&self) -> PathBuf {
        self.root.join("scalars.csv")
    }

    /// Directory for visualization snapshots.
    pub fn visuals_dir(&self) -> PathBuf {
        self.root.join("visuals")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_layout() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunDirectory::create(dir.path(), "rough", "lss").unwrap();

        assert!(run.path().is_dir());
        assert_eq!(run.path().parent().unwrap(), dir.path().join("rough"));
        let name = run.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("lss_"));
        // lss_YYYY_mm_dd_HH_MM_SS
        assert_eq!(name.len(), "lss_".len() + 19);
    }

    #[test]
    fn test_same_second_collision() {
        let dir = tempfile::tempdir().unwrap();
        let a = RunDirectory::create(dir.path(), "d", "voxelnet").unwrap();
        let b = RunDirectory::create(dir.path(), "d", "voxelnet").unwrap();
        assert_ne!(a, b);
        assert!(a.path().is_dir() && b.path().is_dir());
    }

    #[test]
    fn test_paths() {
        let run = RunDirectory::open("/runs/x");
        assert_eq!(run.checkpoint_path("val"), PathBuf::from("/runs/x/val"));
        assert_eq!(run.config_path("grid_cfg"), PathBuf::from("/runs/x/grid_cfg.json"));
        assert_eq!(run.scalars_path(), PathBuf::from("/runs/x/scalars.csv"));
    }
}
