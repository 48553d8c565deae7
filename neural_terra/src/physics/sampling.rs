use burn::prelude::*;

use crate::error::Result;
use crate::util::{float_tensor, index_tensor, to_vec};

/// Bilinear lookup into `[batch, H, W]` grids centered on the robot.
///
/// Cell `(i, j)` has its center at `(-d_max + (i + 0.5) res, -d_max + (j + 0.5) res)`.
/// Queries outside the grid clamp to the border cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSampler {
    d_max: f32,
    resolution: f32,
}

impl GridSampler {
    /// Sampler for a grid spanning `[-d_max, d_max]` at `resolution`.
    pub fn new(d_max: f32, resolution: f32) -> Self {
        Self { d_max, resolution }
    }

    /// Continuous cell coordinate of a metric coordinate, clamped to `[0, n - 1]`.
    fn cell_coordinate<B: Backend>(&self, value: Tensor<B, 2>, n: usize) -> Tensor<B, 2> {
        value
            .add_scalar(self.d_max)
            .div_scalar(self.resolution)
            .sub_scalar(0.5)
            .clamp(0.0, (n - 1) as f32)
    }

    /// Sample `grid` at `x`, `y` (`[batch, 1]` each), returning `[batch, 1]`.
    pub fn sample<B: Backend>(
        &self,
        grid: Tensor<B, 3>,
        x: Tensor<B, 2>,
        y: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>> {
        let [batch, h, w] = grid.dims();
        let device = grid.device();
        let flat = grid.reshape([batch, h * w]);

        let gx = self.cell_coordinate(x, h);
        let gy = self.cell_coordinate(y, w);

        let (ix, fx_base) = floor_cells(to_vec(gx.clone())?, h);
        let (iy, fy_base) = floor_cells(to_vec(gy.clone())?, w);

        let fx = gx - float_tensor::<B, 2>(fx_base, [batch, 1], &device);
        let fy = gy - float_tensor::<B, 2>(fy_base, [batch, 1], &device);

        let x1 = |i: usize| (ix[i] + 1).min(h - 1);
        let y1 = |i: usize| (iy[i] + 1).min(w - 1);
        let corner = |sel: &dyn Fn(usize) -> (usize, usize)| {
            let indices = (0..batch)
                .map(|i| {
                    let (cx, cy) = sel(i);
                    (cx * w + cy) as i64
                })
                .collect();
            flat.clone()
                .gather(1, index_tensor::<B, 2>(indices, [batch, 1], &device))
        };

        let v00 = corner(&|i| (ix[i], iy[i]));
        let v10 = corner(&|i| (x1(i), iy[i]));
        let v01 = corner(&|i| (ix[i], y1(i)));
        let v11 = corner(&|i| (x1(i), y1(i)));

        let gx0 = fx.clone().neg().add_scalar(1.0);
        let gy0 = fy.clone().neg().add_scalar(1.0);
        Ok(v00 * gx0.clone() * gy0.clone()
            + v10 * fx.clone() * gy0
            + v01 * gx0 * fy.clone()
            + v11 * fx * fy)
    }
}

/// Lower cell index of each coordinate and its float value.
fn floor_cells(coords: Vec<f32>, n: usize) -> (Vec<usize>, Vec<f32>) {
    let upper = n.saturating_sub(2);
    let cells: Vec<usize> = coords
        .iter()
        .map(|c| {
            if c.is_finite() {
                (c.floor().max(0.0) as usize).min(upper)
            } else {
                0
            }
        })
        .collect();
    let floats = cells.iter().map(|&c| c as f32).collect();
    (cells, floats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::scalar;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ramp(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        // height = ix, 4x4 cells of 1 m spanning [-2, 2]
        let values = (0..16).map(|i| (i / 4) as f32).collect();
        float_tensor(values, [1, 4, 4], device)
    }

    fn at(v: f32, device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2> {
        float_tensor(vec![v], [1, 1], device)
    }

    #[test]
    fn test_sample_cell_centers() {
        let device = Default::default();
        let sampler = GridSampler::new(2.0, 1.0);
        let v = sampler
            .sample(ramp(&device), at(-1.5, &device), at(0.5, &device))
            .unwrap();
        assert_eq!(scalar(v).unwrap(), 0.0);
        let v = sampler
            .sample(ramp(&device), at(1.5, &device), at(0.5, &device))
            .unwrap();
        assert_eq!(scalar(v).unwrap(), 3.0);
    }

    #[test]
    fn test_sample_interpolates() {
        let device = Default::default();
        let sampler = GridSampler::new(2.0, 1.0);
        let v = sampler
            .sample(ramp(&device), at(0.25, &device), at(-1.0, &device))
            .unwrap();
        assert!((scalar(v).unwrap() - 1.75).abs() < 1e-5);
    }

    #[test]
    fn test_sample_clamps_outside() {
        let device = Default::default();
        let sampler = GridSampler::new(2.0, 1.0);
        let v = sampler
            .sample(ramp(&device), at(10.0, &device), at(0.0, &device))
            .unwrap();
        assert_eq!(scalar(v).unwrap(), 3.0);
    }
}
