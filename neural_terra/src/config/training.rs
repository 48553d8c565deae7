//! Training and loss configuration types.

use std::path::Path;

use burn::config::Config;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::AdamConfig;

use crate::error::NeuralTerraError;

use super::{EncoderConfig, ImageAugConfig, PhysicsConfig, TerrainGridConfig};

/// Weights of the three loss terms and of the terms inside each.
#[derive(Config, Debug)]
pub struct LossConfig {
    /// Weight of the geometry height-map term. Zero skips the term.
    #[config(default = 1.0)]
    pub geometry_weight: f32,

    /// Weight of the terrain height-map term. Zero skips the term.
    #[config(default = 2.0)]
    pub terrain_weight: f32,

    /// Weight of the trajectory term. Zero skips the rollout entirely.
    #[config(default = 1.0)]
    pub physics_weight: f32,

    /// Scale of the Laplacian curvature penalty added to both height terms.
    #[config(default = 0.02)]
    pub curvature_weight: f32,

    /// Position error weight inside the trajectory term.
    #[config(default = 1.0)]
    pub position_weight: f32,

    /// Orientation error weight inside the trajectory term.
    #[config(default = 1.0)]
    pub rotation_weight: f32,

    /// Linear and angular velocity error weight inside the trajectory term.
    #[config(default = 1.0)]
    pub velocity_weight: f32,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LossConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let top = [self.geometry_weight, self.terrain_weight, self.physics_weight];
        if top.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("loss weights must be finite and non-negative".to_string());
        }
        if !(self.curvature_weight >= 0.0) {
            return Err("curvature_weight must be non-negative".to_string());
        }
        let inner = [self.position_weight, self.rotation_weight, self.velocity_weight];
        if inner.iter().any(|w| !(*w > 0.0)) {
            return Err("trajectory error weights must be positive".to_string());
        }
        Ok(())
    }
}

/// Configuration of a training run.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Model variant: `lss`, `voxelnet` or `bevfusion`.
    pub model: String,

    /// Encoder grid.
    #[config(default = "TerrainGridConfig::new()")]
    pub grid: TerrainGridConfig,

    /// Image preprocessing.
    #[config(default = "ImageAugConfig::new()")]
    pub augmentation: ImageAugConfig,

    /// Encoder networks.
    #[config(default = "EncoderConfig::new()")]
    pub encoder: EncoderConfig,

    /// Physics rollout.
    #[config(default = "PhysicsConfig::new()")]
    pub physics: PhysicsConfig,

    /// Loss weights.
    #[config(default = "LossConfig::new()")]
    pub loss: LossConfig,

    /// Dataset name, used as the run directory parent.
    #[config(default = "String::from(\"rough\")")]
    pub dataset: String,

    /// Batch size for training.
    #[config(default = 1)]
    pub batch_size: usize,

    /// Number of epochs.
    #[config(default = 1000)]
    pub num_epochs: usize,

    /// Learning rate.
    #[config(default = 1e-4)]
    pub learning_rate: f64,

    /// Adam first moment decay.
    #[config(default = 0.8)]
    pub beta_1: f32,

    /// Adam second moment decay.
    #[config(default = 0.999)]
    pub beta_2: f32,

    /// Weight decay penalty.
    #[config(default = 1e-7)]
    pub weight_decay: f32,

    /// Ceiling on the joint L2 norm of all gradients of one step.
    #[config(default = 1.0)]
    pub max_grad_norm: f32,

    /// Weights to start from.
    #[config(default = "None")]
    pub pretrained_model_path: Option<String>,

    /// Checkpoint and visualize every epoch regardless of improvement, and
    /// train on a small fixed subset.
    #[config(default = false)]
    pub debug: bool,

    /// Seed for the train/val split and batch shuffling.
    #[config(default = 42)]
    pub seed: u64,

    /// Fraction of samples held out for validation.
    #[config(default = 0.1)]
    pub val_fraction: f32,

    /// Root of all run directories.
    #[config(default = "String::from(\"runs\")")]
    pub output_dir: String,

    /// Batch elements passed to the visualization hook per snapshot.
    #[config(default = 1)]
    pub vis_samples: usize,
}

impl TrainingConfig {
    /// Load from a JSON file. A missing file is a configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NeuralTerraError::config(format!(
                "configuration file {} does not exist",
                path.display()
            )));
        }
        Self::load(path).map_err(|e| NeuralTerraError::config(e.to_string()))
    }

    /// Optimizer settings.
    pub fn optimizer(&self) -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(self.beta_1)
            .with_beta_2(self.beta_2)
            .with_weight_decay(Some(WeightDecayConfig::new(self.weight_decay)))
    }

    /// Encoder-to-physics pooling kernel.
    pub fn pooling_ratio(&self) -> crate::error::Result<usize> {
        Ok(terra_core::pooling_ratio(
            self.physics.grid_res,
            self.grid.resolution(),
        )?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.grid.validate()?;
        self.augmentation.validate()?;
        self.encoder.validate()?;
        self.physics.validate()?;
        self.loss.validate()?;

        if !(self.learning_rate > 0.0) {
            return Err("learning_rate must be positive".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            return Err("val_fraction must be in [0, 1)".to_string());
        }
        if !(self.max_grad_norm > 0.0) {
            return Err("max_grad_norm must be positive".to_string());
        }

        let kernel = terra_core::pooling_ratio(self.physics.grid_res, self.grid.resolution())
            .map_err(|e| e.to_string())?;
        let (nx, ny) = self.grid.bev_grid()?.dims();
        let cells = self.physics.grid_cells();
        if nx % kernel != 0 || ny % kernel != 0 || nx / kernel != cells || ny / kernel != cells {
            return Err(format!(
                "encoder grid {}x{} pooled by {} does not match the {}x{} physics grid",
                nx, ny, kernel, cells, cells
            ));
        }
        Ok(())
    }
}
