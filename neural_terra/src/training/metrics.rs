//! Running epoch means and scalar logging.

use std::path::PathBuf;

use terra_io::ScalarLog;

use crate::error::Result;
use crate::loss::LossScalars;

use super::state::Split;

/// Running mean of each loss term over an epoch.
#[derive(Debug, Clone, Default)]
pub struct EpochAccumulator {
    sum: LossScalars,
    count: usize,
}

impl EpochAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch.
    pub fn add(&mut self, scalars: &LossScalars) {
        self.sum.geometry += scalars.geometry;
        self.sum.terrain += scalars.terrain;
        self.sum.physics += scalars.physics;
        self.sum.total += scalars.total;
        self.count += 1;
    }

    /// Batches seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of every term. All zero before the first batch.
    pub fn mean(&self) -> LossScalars {
        if self.count == 0 {
            return LossScalars::default();
        }
        let n = self.count as f32;
        LossScalars {
            geometry: self.sum.geometry / n,
            terrain: self.sum.terrain / n,
            physics: self.sum.physics / n,
            total: self.sum.total / n,
        }
    }
}

fn tag(split: Split, scope: &str, key: &str) -> String {
    if key == "total" {
        format!("{}/{}", split, scope)
    } else {
        format!("{}/{}_{}", split, scope, key)
    }
}

/// Writes per-step and per-epoch loss scalars to `scalars.csv`.
///
/// Tags look like `train/iter_loss_geom` and `val/epoch_loss`; the total has
/// no suffix.
#[derive(Debug)]
pub struct MetricsLogger {
    log: ScalarLog,
}

impl MetricsLogger {
    /// Logger appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: ScalarLog::new(path),
        }
    }

    /// Record the losses of one batch.
    pub fn log_step(&mut self, split: Split, step: usize, scalars: &LossScalars) -> Result<()> {
        for (key, value) in scalars.entries() {
            self.log.add_scalar(&tag(split, "iter_loss", key), step, value)?;
        }
        Ok(())
    }

    /// Record the epoch means.
    pub fn log_epoch(&mut self, split: Split, epoch: usize, scalars: &LossScalars) -> Result<()> {
        for (key, value) in scalars.entries() {
            self.log.add_scalar(&tag(split, "epoch_loss", key), epoch, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut acc = EpochAccumulator::new();
        assert_eq!(acc.mean(), LossScalars::default());
        acc.add(&LossScalars {
            geometry: 1.0,
            terrain: 0.0,
            physics: 2.0,
            total: 3.0,
        });
        acc.add(&LossScalars {
            geometry: 3.0,
            terrain: 0.0,
            physics: 4.0,
            total: 7.0,
        });
        let mean = acc.mean();
        assert_eq!(acc.count(), 2);
        assert_eq!(mean.geometry, 2.0);
        assert_eq!(mean.terrain, 0.0);
        assert_eq!(mean.total, 5.0);
    }

    #[test]
    fn test_tags() {
        assert_eq!(tag(Split::Train, "iter_loss", "geom"), "train/iter_loss_geom");
        assert_eq!(tag(Split::Val, "epoch_loss", "total"), "val/epoch_loss");
    }

    #[test]
    fn test_logger_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalars.csv");
        let mut logger = MetricsLogger::new(&path);
        logger.log_step(Split::Train, 0, &LossScalars::default()).unwrap();
        logger.log_epoch(Split::Val, 3, &LossScalars::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("tag,step,value\n"));
        assert!(text.contains("train/iter_loss_terrain,0,0\n"));
        assert!(text.contains("val/epoch_loss,3,0\n"));
        assert_eq!(text.lines().count(), 9);
    }
}
