//! Canonical encoder output.

use burn::prelude::*;

/// Four co-registered grids `[batch, 1, nx, ny]` on the encoder grid.
#[derive(Debug, Clone)]
pub struct TerrainOutput<B: Backend> {
    /// Raw geometry height.
    pub geometry: Tensor<B, 4>,
    /// Traversable terrain height (`geometry - difference`).
    pub terrain: Tensor<B, 4>,
    /// Friction coefficient in `(0, 1)`.
    pub friction: Tensor<B, 4>,
    /// Non-negative height difference between geometry and terrain.
    pub difference: Tensor<B, 4>,
}

impl<B: Backend> TerrainOutput<B> {
    /// Whether all four grids have identical shape.
    pub fn shapes_match(&self) -> bool {
        let shape = self.geometry.dims();
        self.terrain.dims() == shape
            && self.friction.dims() == shape
            && self.difference.dims() == shape
    }

    /// Shape shared by the grids.
    pub fn dims(&self) -> [usize; 4] {
        self.geometry.dims()
    }

    /// Cut every grid from the autodiff graph.
    pub fn detach(self) -> Self {
        Self {
            geometry: self.geometry.detach(),
            terrain: self.terrain.detach(),
            friction: self.friction.detach(),
            difference: self.difference.detach(),
        }
    }
}
