//! Encoder network configuration types.

use burn::config::Config;

/// Lift-splat image branch.
#[derive(Config, Debug)]
pub struct ImageEncoderConfig {
    /// Channels of the stride-2 backbone stages; the feature map is
    /// downsampled by `2^len`.
    #[config(default = "vec![16, 32, 64, 64]")]
    pub backbone_channels: Vec<usize>,
}

impl ImageEncoderConfig {
    /// Backbone stride.
    pub fn downsample(&self) -> usize {
        1 << self.backbone_channels.len()
    }
}

/// Point-cloud branch: per-point MLP followed by mean pooling into BEV cells.
#[derive(Config, Debug)]
pub struct PointEncoderConfig {
    /// Hidden layer dimensions of the per-point MLP.
    #[config(default = "vec![32, 64]")]
    pub hidden_dims: Vec<usize>,

    /// 3x3 convolutions applied to the pooled BEV map.
    #[config(default = 2)]
    pub bev_layers: usize,
}

/// Encoder configuration shared by all model variants.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Channels of the BEV feature map produced by each branch.
    #[config(default = 64)]
    pub bev_channels: usize,

    /// Hidden channels of the terrain head.
    #[config(default = 64)]
    pub head_channels: usize,

    /// Image branch.
    #[config(default = "ImageEncoderConfig::new()")]
    pub image: ImageEncoderConfig,

    /// Point branch.
    #[config(default = "PointEncoderConfig::new()")]
    pub points: PointEncoderConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderConfig {
    /// Small network for tests and demos.
    pub fn tiny() -> Self {
        Self::new()
            .with_bev_channels(8)
            .with_head_channels(8)
            .with_image(ImageEncoderConfig::new().with_backbone_channels(vec![8, 8]))
            .with_points(
                PointEncoderConfig::new()
                    .with_hidden_dims(vec![8])
                    .with_bev_layers(1),
            )
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bev_channels == 0 || self.head_channels == 0 {
            return Err("channel counts must be positive".to_string());
        }
        if self.image.backbone_channels.iter().any(|&c| c == 0) {
            return Err("backbone channels must be positive".to_string());
        }
        if self.points.hidden_dims.iter().any(|&c| c == 0) {
            return Err("point MLP dimensions must be positive".to_string());
        }
        Ok(())
    }
}
