//! Bird's-eye-view grid geometry.
//!
//! A grid axis is described by `[min, max, resolution]`. Cell `i` covers
//! `[min + i * res, min + (i + 1) * res)`. Two-dimensional grids index
//! cells as `ix * ny + iy`, with x along rows.

use crate::error::TerraCoreError;
use crate::types::Point3;

const EXTENT_TOLERANCE: f32 = 1e-3;

/// One axis of a regular grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    /// Lower bound (inclusive).
    pub min: f32,
    /// Upper bound (exclusive).
    pub max: f32,
    /// Cell size.
    pub resolution: f32,
}

impl GridBounds {
    /// Create a new axis.
    pub const fn new(min: f32, max: f32, resolution: f32) -> Self {
        Self {
            min,
            max,
            resolution,
        }
    }

    /// Create from a `[min, max, resolution]` triple.
    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    /// Number of cells along the axis.
    ///
    /// Fails when the range is empty, the resolution is not positive, or the
    /// extent is not an integer multiple of the resolution.
    pub fn cells(&self) -> Result<usize, TerraCoreError> {
        let extent = self.max - self.min;
        if !(self.resolution > 0.0) || !(extent > 0.0) {
            return Err(TerraCoreError::DegenerateAxis {
                min: self.min,
                max: self.max,
                resolution: self.resolution,
            });
        }
        let ratio = extent / self.resolution;
        let n = libm::roundf(ratio);
        if libm::fabsf(ratio - n) > EXTENT_TOLERANCE * n.max(1.0) {
            return Err(TerraCoreError::NonIntegerExtent {
                extent,
                resolution: self.resolution,
            });
        }
        Ok(n as usize)
    }

    /// Cell containing `v`, if inside the axis.
    #[inline]
    pub fn cell_of(&self, v: f32, cells: usize) -> Option<usize> {
        if !v.is_finite() {
            return None;
        }
        let idx = libm::floorf((v - self.min) / self.resolution);
        if idx < 0.0 || idx >= cells as f32 {
            None
        } else {
            Some(idx as usize)
        }
    }

    /// Coordinate of the lower edge of cell `i`.
    #[inline]
    pub fn cell_start(&self, i: usize) -> f32 {
        self.min + i as f32 * self.resolution
    }
}

/// A validated BEV grid: x/y footprint plus a z slab that bounds which
/// points are splatted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevGrid {
    /// X axis (rows).
    pub x: GridBounds,
    /// Y axis (columns).
    pub y: GridBounds,
    /// Vertical slab.
    pub z: GridBounds,
    nx: usize,
    ny: usize,
}

impl BevGrid {
    /// Validate the axes and build the grid.
    pub fn new(x: GridBounds, y: GridBounds, z: GridBounds) -> Result<Self, TerraCoreError> {
        let nx = x.cells()?;
        let ny = y.cells()?;
        if !(z.max > z.min) {
            return Err(TerraCoreError::DegenerateAxis {
                min: z.min,
                max: z.max,
                resolution: z.resolution,
            });
        }
        Ok(Self { x, y, z, nx, ny })
    }

    /// Grid shape as `(nx, ny)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Number of cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Planar resolution (x axis).
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.x.resolution
    }

    /// Flat cell index for a point, or `None` outside the grid or z slab.
    #[inline]
    pub fn cell_index(&self, p: Point3) -> Option<usize> {
        if !p.z.is_finite() || p.z < self.z.min || p.z >= self.z.max {
            return None;
        }
        let ix = self.x.cell_of(p.x, self.nx)?;
        let iy = self.y.cell_of(p.y, self.ny)?;
        Some(ix * self.ny + iy)
    }

    /// Center of cell `(ix, iy)` at z = 0.
    pub fn cell_center(&self, ix: usize, iy: usize) -> Point3 {
        Point3::new(
            self.x.cell_start(ix) + 0.5 * self.x.resolution,
            self.y.cell_start(iy) + 0.5 * self.y.resolution,
            0.0,
        )
    }
}

/// Integer pooling kernel bridging a fine encoder grid to a coarse physics grid.
///
/// Returns `coarse / fine` when it is a positive integer.
pub fn pooling_ratio(coarse: f32, fine: f32) -> Result<usize, TerraCoreError> {
    let err = TerraCoreError::NonIntegerRatio { coarse, fine };
    if !(coarse > 0.0) || !(fine > 0.0) {
        return Err(err);
    }
    let ratio = coarse / fine;
    let k = libm::roundf(ratio);
    if k < 1.0 || libm::fabsf(ratio - k) > EXTENT_TOLERANCE * k {
        return Err(err);
    }
    Ok(k as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_grid() -> BevGrid {
        BevGrid::new(
            GridBounds::new(-6.4, 6.4, 0.1),
            GridBounds::new(-6.4, 6.4, 0.1),
            GridBounds::new(-2.0, 2.0, 4.0),
        )
        .unwrap()
    }

    #[test]
    fn test_grid_dims() {
        let grid = default_grid();
        assert_eq!(grid.dims(), (128, 128));
        assert_eq!(grid.num_cells(), 128 * 128);
    }

    #[test]
    fn test_non_integer_extent() {
        let axis = GridBounds::new(0.0, 1.0, 0.3);
        assert!(matches!(
            axis.cells(),
            Err(TerraCoreError::NonIntegerExtent { .. })
        ));
        assert!(GridBounds::new(1.0, 0.0, 0.1).cells().is_err());
        assert!(GridBounds::new(0.0, 1.0, 0.0).cells().is_err());
    }

    #[test]
    fn test_cell_index() {
        let grid = default_grid();
        assert_eq!(grid.cell_index(Point3::new(-6.4, -6.4, 0.0)), Some(0));
        assert_eq!(grid.cell_index(Point3::new(-6.35, -6.25, 0.0)), Some(1));
        assert_eq!(grid.cell_index(Point3::new(-6.25, -6.35, 0.0)), Some(128));
        assert_eq!(grid.cell_index(Point3::new(6.4, 0.0, 0.0)), None);
        assert_eq!(grid.cell_index(Point3::new(0.0, 0.0, 3.0)), None);
        assert_eq!(grid.cell_index(Point3::new(f32::NAN, 0.0, 0.0)), None);
    }

    #[test]
    fn test_pooling_ratio() {
        assert_eq!(pooling_ratio(0.4, 0.1), Ok(4));
        assert_eq!(pooling_ratio(0.1, 0.1), Ok(1));
        assert!(pooling_ratio(0.25, 0.1).is_err());
        assert!(pooling_ratio(0.05, 0.1).is_err());
        assert!(pooling_ratio(0.0, 0.1).is_err());
    }

    #[test]
    fn test_cell_center() {
        let grid = default_grid();
        let c = grid.cell_center(0, 127);
        assert!((c.x + 6.35).abs() < 1e-5);
        assert!((c.y - 6.35).abs() < 1e-5);
    }
}
