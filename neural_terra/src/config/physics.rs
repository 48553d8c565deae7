//! Physics rollout configuration.

use burn::config::Config;

/// Parameters of the differentiable rollout and its grid.
///
/// The physics grid spans `[-d_max, d_max]` on both axes at `grid_res`.
#[derive(Config, Debug)]
pub struct PhysicsConfig {
    /// Robot identifier.
    #[config(default = "String::from(\"marv\")")]
    pub robot: String,

    /// Physics grid resolution in meters.
    #[config(default = 0.4)]
    pub grid_res: f32,

    /// Half extent of the physics grid in meters.
    #[config(default = 6.4)]
    pub d_max: f32,

    /// Height bound; predicted heights are clamped to `[-h_max, h_max]`.
    #[config(default = 1.0)]
    pub h_max: f32,

    /// Rollout horizon in seconds.
    #[config(default = 5.0)]
    pub traj_sim_time: f32,

    /// Integration step in seconds.
    #[config(default = 0.01)]
    pub dt: f32,

    /// Height of the body origin above the terrain surface.
    #[config(default = 0.0)]
    pub clearance: f32,

    /// Rate at which linear velocity tracks its command on full friction.
    #[config(default = 4.0)]
    pub velocity_gain: f32,

    /// Rate at which yaw rate tracks its command on full friction.
    #[config(default = 4.0)]
    pub yaw_gain: f32,

    /// Rate at which the body settles onto the terrain height.
    #[config(default = 10.0)]
    pub vertical_gain: f32,

    /// Detach the physics grids from the encoder graph before the rollout.
    ///
    /// When set, the physics loss updates nothing upstream of the bridge.
    #[config(default = false)]
    pub detach_grids: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsConfig {
    /// Cells per side of the physics grid.
    pub fn grid_cells(&self) -> usize {
        (2.0 * self.d_max / self.grid_res).round() as usize
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_res <= 0.0 || self.d_max <= 0.0 {
            return Err("grid_res and d_max must be positive".to_string());
        }
        if self.grid_cells() < 2 {
            return Err("physics grid needs at least 2 cells per side".to_string());
        }
        if self.dt <= 0.0 || self.traj_sim_time <= 0.0 {
            return Err("dt and traj_sim_time must be positive".to_string());
        }
        if self.h_max <= 0.0 {
            return Err("h_max must be positive".to_string());
        }
        if self.velocity_gain < 0.0 || self.yaw_gain < 0.0 || self.vertical_gain < 0.0 {
            return Err("response gains must be non-negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_physics_config() {
        let config = PhysicsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_cells(), 32);
    }

    #[test]
    fn test_invalid_physics_config() {
        assert!(PhysicsConfig::new().with_dt(0.0).validate().is_err());
        assert!(PhysicsConfig::new().with_grid_res(-0.4).validate().is_err());
    }
}
