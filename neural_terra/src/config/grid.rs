//! Encoder grid and image augmentation configuration.

use burn::config::Config;
use terra_core::{BevGrid, GridBounds};

/// Bird's-eye-view grid produced by every encoder variant.
///
/// Axes are `[min, max, resolution]`; `dbound` is `[min, max, step]` of the
/// camera depth bins.
#[derive(Config, Debug)]
pub struct TerrainGridConfig {
    /// X axis of the grid (rows).
    #[config(default = "[-6.4, 6.4, 0.1]")]
    pub xbound: [f32; 3],

    /// Y axis of the grid (columns).
    #[config(default = "[-6.4, 6.4, 0.1]")]
    pub ybound: [f32; 3],

    /// Vertical slab of splatted samples.
    #[config(default = "[-2.0, 2.0, 4.0]")]
    pub zbound: [f32; 3],

    /// Camera depth bins.
    #[config(default = "[1.0, 35.0, 0.5]")]
    pub dbound: [f32; 3],
}

impl Default for TerrainGridConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainGridConfig {
    /// Validated grid geometry.
    pub fn bev_grid(&self) -> Result<BevGrid, String> {
        BevGrid::new(
            GridBounds::from_array(self.xbound),
            GridBounds::from_array(self.ybound),
            GridBounds::from_array(self.zbound),
        )
        .map_err(|e| e.to_string())
    }

    /// Planar resolution.
    pub fn resolution(&self) -> f32 {
        self.xbound[2]
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.bev_grid()?;
        if (self.xbound[2] - self.ybound[2]).abs() > 1e-6 {
            return Err("x and y resolutions must match".to_string());
        }
        if terra_core::depth_bin_count(self.dbound) == 0 {
            return Err("dbound must describe at least one depth bin".to_string());
        }
        Ok(())
    }
}

/// Image preprocessing shared by training data and the inference consumer.
#[derive(Config, Debug)]
pub struct ImageAugConfig {
    /// Source image height.
    #[config(default = 1200)]
    pub height: usize,

    /// Source image width.
    #[config(default = 1920)]
    pub width: usize,

    /// Network input size as `[height, width]`.
    #[config(default = "[256, 384]")]
    pub final_dim: [usize; 2],

    /// Resize range used by training-time augmentation.
    #[config(default = "[0.2, 0.3]")]
    pub resize_lim: [f32; 2],

    /// Fraction of the image bottom cropped away.
    #[config(default = "[0.0, 0.0]")]
    pub bot_pct_lim: [f32; 2],

    /// Number of cameras per sample.
    #[config(default = 1)]
    pub ncams: usize,
}

impl Default for ImageAugConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageAugConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.height == 0 || self.width == 0 {
            return Err("source image size must be positive".to_string());
        }
        if self.final_dim[0] == 0 || self.final_dim[1] == 0 {
            return Err("final_dim must be positive".to_string());
        }
        if self.ncams == 0 {
            return Err("ncams must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid() {
        let config = TerrainGridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bev_grid().unwrap().dims(), (128, 128));
    }

    #[test]
    fn test_rejects_uneven_extent() {
        let config = TerrainGridConfig::new().with_xbound([-1.0, 1.0, 0.3]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_anisotropic_resolution() {
        let config = TerrainGridConfig::new().with_ybound([-6.4, 6.4, 0.2]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aug_defaults() {
        assert!(ImageAugConfig::default().validate().is_ok());
        assert!(ImageAugConfig::new().with_ncams(0).validate().is_err());
    }
}
