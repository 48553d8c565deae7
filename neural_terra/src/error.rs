//! Error types for neural_terra.

use thiserror::Error;

/// Errors that can occur while building, training or running a terrain encoder.
#[derive(Error, Debug)]
pub enum NeuralTerraError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// The model-variant name is not one of the supported encoders.
    #[error("unknown model variant '{name}', expected one of: lss, voxelnet, bevfusion")]
    UnknownModel {
        /// The rejected name.
        name: String,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// A batch lacks an input the model variant needs.
    #[error("batch is missing {field} required by the {variant} encoder")]
    MissingInput {
        /// Missing batch field.
        field: &'static str,
        /// Variant that needed it.
        variant: &'static str,
    },

    /// The total loss became NaN or infinite. The run is aborted.
    #[error("non-finite {split} loss at epoch {epoch}, step {step}")]
    NonFiniteLoss {
        /// `train` or `val`.
        split: &'static str,
        /// Epoch index.
        epoch: usize,
        /// Step counter of the split.
        step: usize,
    },

    /// Saving or loading weights failed.
    #[error("checkpoint error: {message}")]
    Checkpoint {
        /// Description of the error.
        message: String,
    },

    /// Calibration or transform lookup failed for a frame.
    #[error("calibration error: {message}")]
    Calibration {
        /// Description of the error.
        message: String,
    },

    /// Geometry error from terra_core.
    #[error("geometry error: {0}")]
    Core(#[from] terra_core::TerraCoreError),

    /// I/O error from terra_io.
    #[error("I/O error: {0}")]
    Io(#[from] terra_io::TerraIoError),

    /// Invalid or corrupted data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl NeuralTerraError {
    /// Shorthand for [`NeuralTerraError::InvalidConfig`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the run must stop rather than skip the current item.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Calibration { .. })
    }
}

/// Result type for neural_terra operations.
pub type Result<T> = std::result::Result<T, NeuralTerraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = NeuralTerraError::UnknownModel {
            name: "transformer".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown model variant 'transformer', expected one of: lss, voxelnet, bevfusion"
        );

        let err = NeuralTerraError::NonFiniteLoss {
            split: "train",
            epoch: 3,
            step: 17,
        };
        assert_eq!(err.to_string(), "non-finite train loss at epoch 3, step 17");
    }

    #[test]
    fn test_fatality() {
        assert!(NeuralTerraError::config("x").is_fatal());
        assert!(!NeuralTerraError::Calibration {
            message: "no tf".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_from_core() {
        let err: NeuralTerraError = terra_core::TerraCoreError::SingularMatrix.into();
        assert!(matches!(err, NeuralTerraError::Core(_)));
    }
}
