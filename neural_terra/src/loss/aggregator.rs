use burn::prelude::*;

use crate::bridge::GridResolutionBridge;
use crate::config::{LossConfig, TrainingConfig};
use crate::data::TerrainBatch;
use crate::error::Result;
use crate::physics::{Controls, DiffDriveSimulator, PhysicsSimulator, RigidState, StateTrajectory};
use crate::terrain::TerrainOutput;
use crate::util::scalar;

use super::height::height_map_loss;
use super::trajectory::trajectory_loss;

/// Per-term losses of one batch and their weighted total.
#[derive(Debug, Clone)]
pub struct LossBundle<B: Backend> {
    /// Geometry height-map term.
    pub geometry: Tensor<B, 1>,
    /// Terrain height-map term.
    pub terrain: Tensor<B, 1>,
    /// Trajectory term.
    pub physics: Tensor<B, 1>,
    /// Weighted sum of the active terms.
    pub total: Tensor<B, 1>,
}

impl<B: Backend> LossBundle<B> {
    /// Host copy of every term.
    pub fn scalars(&self) -> Result<LossScalars> {
        Ok(LossScalars {
            geometry: scalar(self.geometry.clone())?,
            terrain: scalar(self.terrain.clone())?,
            physics: scalar(self.physics.clone())?,
            total: scalar(self.total.clone())?,
        })
    }
}

/// Host values of a [`LossBundle`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossScalars {
    /// Geometry term.
    pub geometry: f32,
    /// Terrain term.
    pub terrain: f32,
    /// Physics term.
    pub physics: f32,
    /// Weighted total.
    pub total: f32,
}

impl LossScalars {
    /// Term names as used in scalar tags.
    pub const KEYS: [&'static str; 4] = ["geom", "terrain", "phys", "total"];

    /// `(key, value)` pairs in [`Self::KEYS`] order.
    pub fn entries(&self) -> [(&'static str, f32); 4] {
        [
            (Self::KEYS[0], self.geometry),
            (Self::KEYS[1], self.terrain),
            (Self::KEYS[2], self.physics),
            (Self::KEYS[3], self.total),
        ]
    }

    /// Whether the total is finite.
    pub fn is_finite(&self) -> bool {
        self.total.is_finite()
    }
}

/// Combines the height-map and trajectory terms.
///
/// A term whose weight is zero is reported as an exact zero and never computed,
/// so it contributes no gradient. A zero physics weight skips the rollout.
#[derive(Debug, Clone)]
pub struct LossAggregator<S = DiffDriveSimulator> {
    config: LossConfig,
    bridge: GridResolutionBridge,
    simulator: S,
}

impl LossAggregator<DiffDriveSimulator> {
    /// Aggregator for a training configuration.
    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        Ok(Self::new(
            config.loss.clone(),
            GridResolutionBridge::from_config(config)?,
            DiffDriveSimulator::new(config.physics.clone()),
        ))
    }
}

impl<S: PhysicsSimulator> LossAggregator<S> {
    /// Aggregator with an explicit simulator.
    pub fn new(config: LossConfig, bridge: GridResolutionBridge, simulator: S) -> Self {
        Self {
            config,
            bridge,
            simulator,
        }
    }

    /// Loss weights.
    pub fn config(&self) -> &LossConfig {
        &self.config
    }

    /// Resolution bridge feeding the simulator.
    pub fn bridge(&self) -> &GridResolutionBridge {
        &self.bridge
    }

    /// Pool the predicted grids and roll the batch controls out over them.
    pub fn rollout<B: Backend>(
        &self,
        output: &TerrainOutput<B>,
        batch: &TerrainBatch<B>,
    ) -> Result<StateTrajectory<B>> {
        let grids = self.bridge.physics_grids(output)?;
        let initial = RigidState::from_pose(batch.initial_pose.clone())?;
        self.simulator
            .rollout(&grids, initial, &Controls::from_batch(batch))
    }

    /// Evaluate every active term against `batch`.
    pub fn compute<B: Backend>(
        &self,
        output: &TerrainOutput<B>,
        batch: &TerrainBatch<B>,
    ) -> Result<LossBundle<B>> {
        let device = output.geometry.device();
        let cfg = &self.config;
        let zero = || Tensor::<B, 1>::zeros([1], &device);

        let geometry = if cfg.geometry_weight > 0.0 {
            height_map_loss(
                output.geometry.clone(),
                batch.geometry.heights.clone(),
                batch.geometry.mask.clone(),
                cfg.curvature_weight,
            )
        } else {
            zero()
        };

        let terrain = if cfg.terrain_weight > 0.0 {
            height_map_loss(
                output.terrain.clone(),
                batch.terrain.heights.clone(),
                batch.terrain.mask.clone(),
                cfg.curvature_weight,
            )
        } else {
            zero()
        };

        let physics = if cfg.physics_weight > 0.0 {
            trajectory_loss(&self.rollout(output, batch)?, &batch.trajectory, cfg)?
        } else {
            zero()
        };

        let weighted = [
            (cfg.geometry_weight, &geometry),
            (cfg.terrain_weight, &terrain),
            (cfg.physics_weight, &physics),
        ];
        let total = weighted
            .into_iter()
            .filter(|(weight, _)| *weight > 0.0)
            .map(|(weight, term)| term.clone().mul_scalar(weight))
            .reduce(|acc, term| acc + term)
            .unwrap_or_else(zero);

        Ok(LossBundle {
            geometry,
            terrain,
            physics,
            total,
        })
    }
}
