use burn::prelude::*;

use crate::data::TerrainBatch;
use crate::error::{NeuralTerraError, Result};

/// Height and friction at physics resolution, `[batch, H, W]`.
#[derive(Debug, Clone)]
pub struct PhysicsGrids<B: Backend> {
    /// Terrain height.
    pub height: Tensor<B, 3>,
    /// Friction coefficient.
    pub friction: Tensor<B, 3>,
}

impl<B: Backend> PhysicsGrids<B> {
    /// Pair a height and a friction grid.
    pub fn new(height: Tensor<B, 3>, friction: Tensor<B, 3>) -> Self {
        Self { height, friction }
    }

    /// `[batch, H, W]`.
    pub fn dims(&self) -> [usize; 3] {
        self.height.dims()
    }
}

/// Control commands with their timestamps.
#[derive(Debug, Clone)]
pub struct Controls<B: Backend> {
    /// `[batch, T]` seconds.
    pub timestamps: Tensor<B, 2>,
    /// `[batch, T, 2]` linear and angular velocity commands.
    pub commands: Tensor<B, 3>,
}

impl<B: Backend> Controls<B> {
    /// Controls carried by a batch.
    pub fn from_batch(batch: &TerrainBatch<B>) -> Self {
        Self {
            timestamps: batch.control_timestamps.clone(),
            commands: batch.controls.clone(),
        }
    }
}

/// Rigid-body state of every batch element.
#[derive(Debug, Clone)]
pub struct RigidState<B: Backend> {
    /// `[batch, 3]`.
    pub position: Tensor<B, 2>,
    /// `[batch, 3]`.
    pub linear_velocity: Tensor<B, 2>,
    /// `[batch, 3, 3]`, columns are the body axes in the world frame.
    pub orientation: Tensor<B, 3>,
    /// `[batch, 3]`.
    pub angular_velocity: Tensor<B, 2>,
}

impl<B: Backend> RigidState<B> {
    /// State at rest at each `[batch, 4, 4]` pose.
    pub fn from_pose(pose: Tensor<B, 3>) -> Result<Self> {
        let [batch, rows, cols] = pose.dims();
        if rows != 4 || cols != 4 {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: vec![batch, 4, 4],
                got: vec![batch, rows, cols],
            });
        }
        let device = pose.device();
        Ok(Self {
            position: pose.clone().slice([0..batch, 0..3, 3..4]).reshape([batch, 3]),
            linear_velocity: Tensor::zeros([batch, 3], &device),
            orientation: pose.slice([0..batch, 0..3, 0..3]),
            angular_velocity: Tensor::zeros([batch, 3], &device),
        })
    }

    /// Batch size.
    pub fn batch_size(&self) -> usize {
        self.position.dims()[0]
    }
}

/// States at the control timestamps. Index 0 is the initial state.
#[derive(Debug, Clone)]
pub struct StateTrajectory<B: Backend> {
    /// `[batch, T]`.
    pub timestamps: Tensor<B, 2>,
    /// `[batch, T, 3]`.
    pub positions: Tensor<B, 3>,
    /// `[batch, T, 3]`.
    pub linear_velocities: Tensor<B, 3>,
    /// `[batch, T, 3, 3]`.
    pub orientations: Tensor<B, 4>,
    /// `[batch, T, 3]`.
    pub angular_velocities: Tensor<B, 3>,
}

impl<B: Backend> StateTrajectory<B> {
    /// Stack per-step states along the time axis.
    pub fn from_states(timestamps: Tensor<B, 2>, states: Vec<RigidState<B>>) -> Result<Self> {
        if states.is_empty() {
            return Err(NeuralTerraError::InvalidData("empty rollout".to_string()));
        }
        let mut positions = Vec::with_capacity(states.len());
        let mut linear = Vec::with_capacity(states.len());
        let mut orientations = Vec::with_capacity(states.len());
        let mut angular = Vec::with_capacity(states.len());
        for state in states {
            positions.push(state.position);
            linear.push(state.linear_velocity);
            orientations.push(state.orientation);
            angular.push(state.angular_velocity);
        }
        Ok(Self {
            timestamps,
            positions: Tensor::stack(positions, 1),
            linear_velocities: Tensor::stack(linear, 1),
            orientations: Tensor::stack(orientations, 1),
            angular_velocities: Tensor::stack(angular, 1),
        })
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize {
        self.positions.dims()[1]
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
