//! Weight checkpoints with JSON metadata sidecars.
//!
//! Weights go through burn's named MessagePack recorder, so a checkpoint named
//! `train` in a run directory is `train.mpk` next to `train.json`.

use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use crate::error::NeuralTerraError;

/// Extension added by the recorder.
pub const WEIGHTS_EXTENSION: &str = "mpk";

/// Which checkpoint a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// Lowest epoch training loss.
    TrainBest,
    /// Lowest epoch validation loss.
    ValBest,
    /// Weights at the moment a loss became non-finite.
    Emergency,
}

impl CheckpointKind {
    /// File stem inside the run directory.
    pub fn file_stem(&self) -> &'static str {
        match self {
            CheckpointKind::TrainBest => "train",
            CheckpointKind::ValBest => "val",
            CheckpointKind::Emergency => "emergency",
        }
    }
}

/// Progress recorded alongside a checkpoint.
#[derive(Config, Debug, PartialEq)]
pub struct CheckpointMetadata {
    /// Model variant name.
    pub model: String,
    /// Epoch the weights come from.
    pub epoch: usize,
    /// Training steps taken.
    pub train_step: usize,
    /// Validation steps taken.
    pub val_step: usize,
    /// Loss that triggered the write.
    pub loss: f32,
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Weights path of a checkpoint, with extension.
pub fn weights_path(dir: &Path, kind: CheckpointKind) -> PathBuf {
    dir.join(kind.file_stem()).with_extension(WEIGHTS_EXTENSION)
}

/// Metadata path of a checkpoint.
pub fn metadata_path(dir: &Path, kind: CheckpointKind) -> PathBuf {
    dir.join(kind.file_stem()).with_extension("json")
}

/// Write weights and metadata into `dir`, replacing an earlier checkpoint of
/// the same kind.
pub fn save_checkpoint<B: Backend, M: Module<B>>(
    model: &M,
    dir: &Path,
    kind: CheckpointKind,
    metadata: &CheckpointMetadata,
) -> crate::error::Result<PathBuf> {
    let stem = dir.join(kind.file_stem());
    model
        .clone()
        .save_file(stem.clone(), &recorder())
        .map_err(|e| NeuralTerraError::Checkpoint {
            message: format!("{}: {:?}", stem.display(), e),
        })?;
    metadata
        .save(metadata_path(dir, kind))
        .map_err(|e| NeuralTerraError::Checkpoint {
            message: e.to_string(),
        })?;
    log::info!(
        "Saved {} checkpoint to {:?} (epoch {}, loss {:.6})",
        kind.file_stem(),
        stem,
        metadata.epoch,
        metadata.loss
    );
    Ok(weights_path(dir, kind))
}

/// Load weights from `path` into `model`.
///
/// The path may omit the `.mpk` extension.
pub fn load_weights<B: Backend, M: Module<B>>(
    model: M,
    path: impl AsRef<Path>,
    device: &B::Device,
) -> crate::error::Result<M> {
    let path = path.as_ref();
    let stem = if path.extension().and_then(|e| e.to_str()) == Some(WEIGHTS_EXTENSION) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    if !stem.with_extension(WEIGHTS_EXTENSION).exists() {
        return Err(NeuralTerraError::Checkpoint {
            message: format!("no weights at {}", path.display()),
        });
    }
    model
        .load_file(stem.clone(), &recorder(), device)
        .map_err(|e| NeuralTerraError::Checkpoint {
            message: format!("{}: {:?}", stem.display(), e),
        })
}

/// Metadata of a checkpoint in `dir`.
pub fn load_metadata(dir: &Path, kind: CheckpointKind) -> crate::error::Result<CheckpointMetadata> {
    CheckpointMetadata::load(metadata_path(dir, kind)).map_err(|e| NeuralTerraError::Checkpoint {
        message: e.to_string(),
    })
}

/// Whether weights and metadata of `kind` exist in `dir`.
pub fn checkpoint_exists(dir: &Path, kind: CheckpointKind) -> bool {
    weights_path(dir, kind).exists() && metadata_path(dir, kind).exists()
}
