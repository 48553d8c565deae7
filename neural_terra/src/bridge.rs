//! Encoder-to-physics resolution bridge and the curvature regularizer.
//!
//! The physics rollout runs on a coarser grid than the encoder. Terrain and
//! friction are reduced by non-overlapping `k x k` mean pooling, with
//! `k = physics_res / encoder_res` required to be a positive integer.

use burn::prelude::*;
use burn::tensor::module::{avg_pool2d, conv2d};
use burn::tensor::ops::ConvOptions;

use crate::config::TrainingConfig;
use crate::error::{NeuralTerraError, Result};
use crate::physics::PhysicsGrids;
use crate::terrain::TerrainOutput;

/// 3x3 discrete Laplacian, row-major.
pub const LAPLACIAN_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, -8.0, 1.0, 1.0, 1.0, 1.0];

/// Pools encoder grids down to the physics resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridResolutionBridge {
    kernel: usize,
    detach: bool,
}

impl GridResolutionBridge {
    /// Bridge with an explicit kernel.
    pub fn new(kernel: usize) -> Result<Self> {
        if kernel == 0 {
            return Err(NeuralTerraError::config("pooling kernel must be positive"));
        }
        Ok(Self {
            kernel,
            detach: false,
        })
    }

    /// Bridge for a training configuration.
    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        Ok(Self::new(config.pooling_ratio()?)?.with_detach(config.physics.detach_grids))
    }

    /// Cut the physics grids from the encoder graph.
    pub fn with_detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    /// Pooling kernel.
    pub fn kernel(&self) -> usize {
        self.kernel
    }

    /// Whether outputs are detached.
    pub fn detaches(&self) -> bool {
        self.detach
    }

    /// Mean-pool `[batch, channels, H, W]` to `[batch, channels, H/k, W/k]`.
    pub fn downsample<B: Backend>(&self, grid: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        let [b, c, h, w] = grid.dims();
        let k = self.kernel;
        if h % k != 0 || w % k != 0 {
            return Err(NeuralTerraError::ShapeMismatch {
                expected: vec![b, c, (h / k) * k, (w / k) * k],
                got: vec![b, c, h, w],
            });
        }
        if k == 1 {
            return Ok(grid);
        }
        Ok(avg_pool2d(grid, [k, k], [k, k], [0, 0], true))
    }

    /// Physics-resolution terrain and friction.
    pub fn physics_grids<B: Backend>(&self, output: &TerrainOutput<B>) -> Result<PhysicsGrids<B>> {
        let mut height = self.downsample(output.terrain.clone())?;
        let mut friction = self.downsample(output.friction.clone())?;
        if self.detach {
            height = height.detach();
            friction = friction.detach();
        }
        Ok(PhysicsGrids::new(height.squeeze::<3>(1), friction.squeeze::<3>(1)))
    }
}

/// Pad by one cell on every side, extrapolating linearly from the border.
///
/// A planar grid stays planar after padding. Edge replication would flatten
/// the slope in the border ring and give a tilted plane non-zero curvature.
fn pad_linear<B: Backend>(grid: Tensor<B, 4>) -> Tensor<B, 4> {
    let grid = pad_axis(grid, 2);
    pad_axis(grid, 3)
}

fn pad_axis<B: Backend>(grid: Tensor<B, 4>, axis: usize) -> Tensor<B, 4> {
    let dims = grid.dims();
    let n = dims[axis];
    let take = |i: usize| {
        let mut ranges = dims.map(|d| 0..d);
        ranges[axis] = i..i + 1;
        grid.clone().slice(ranges)
    };
    let (first, last) = if n >= 2 {
        (
            take(0).mul_scalar(2.0) - take(1),
            take(n - 1).mul_scalar(2.0) - take(n - 2),
        )
    } else {
        (take(0), take(0))
    };
    Tensor::cat(vec![first, grid.clone(), last], axis)
}

/// Laplacian response of `[batch, channels, H, W]`, same shape.
pub fn laplacian<B: Backend>(grid: Tensor<B, 4>) -> Tensor<B, 4> {
    let [b, c, h, w] = grid.dims();
    let device = grid.device();
    let weight = Tensor::<B, 1>::from_floats(LAPLACIAN_KERNEL, &device).reshape([1, 1, 3, 3]);
    let padded = pad_linear(grid.reshape([b * c, 1, h, w]));
    conv2d(padded, weight, None, ConvOptions::new([1, 1], [0, 0], [1, 1], 1)).reshape([b, c, h, w])
}

/// Mean absolute Laplacian response.
pub fn curvature_penalty<B: Backend>(grid: Tensor<B, 4>) -> Tensor<B, 1> {
    laplacian(grid).abs().mean()
}
