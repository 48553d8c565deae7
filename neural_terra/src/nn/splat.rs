//! Scatter of per-sample features into BEV cells.

use burn::prelude::*;

/// Destination of each feature row in a flattened `[batch * nx * ny]` grid.
#[derive(Debug, Clone)]
pub struct SplatIndex<B: Backend> {
    /// Flat cell per row: `b * nx * ny + ix * ny + iy`.
    pub cells: Tensor<B, 1, Int>,
    /// Batch size.
    pub batch: usize,
    /// Grid rows.
    pub nx: usize,
    /// Grid columns.
    pub ny: usize,
}

impl<B: Backend> SplatIndex<B> {
    /// Number of rows being scattered.
    pub fn len(&self) -> usize {
        self.cells.dims()[0]
    }

    /// Whether nothing lands in the grid.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum rows into cells, returning `[batch, channels, nx, ny]`.
    pub fn sum(&self, features: Tensor<B, 2>) -> Tensor<B, 4> {
        let channels = features.dims()[1];
        let device = features.device();
        let flat = Tensor::zeros([self.batch * self.nx * self.ny, channels], &device)
            .select_assign(0, self.cells.clone(), features);
        self.to_grid(flat)
    }

    /// Average rows landing in the same cell; empty cells stay zero.
    pub fn mean(&self, features: Tensor<B, 2>) -> Tensor<B, 4> {
        let [rows, _] = features.dims();
        let device = features.device();
        let ones = Tensor::<B, 2>::ones([rows, 1], &device);
        let counts = Tensor::zeros([self.batch * self.nx * self.ny, 1], &device)
            .select_assign(0, self.cells.clone(), ones)
            .clamp_min(1.0);
        let sums = Tensor::zeros([self.batch * self.nx * self.ny, features.dims()[1]], &device)
            .select_assign(0, self.cells.clone(), features);
        self.to_grid(sums / counts)
    }

    /// Empty grid for when no sample landed inside the footprint.
    pub fn zeros(&self, channels: usize, device: &B::Device) -> Tensor<B, 4> {
        Tensor::zeros([self.batch, channels, self.nx, self.ny], device)
    }

    fn to_grid(&self, flat: Tensor<B, 2>) -> Tensor<B, 4> {
        let channels = flat.dims()[1];
        flat.reshape([self.batch, self.nx, self.ny, channels])
            .permute([0, 3, 1, 2])
    }
}
