//! Procedural terrain samples.
//!
//! Samples live on tilted planes: labels are exact plane heights at cell
//! centers, points are scattered on the surface and the ground-truth
//! trajectory is a unicycle driven by constant commands over the plane.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terra_core::{BevGrid, CameraGeometry, Mat3, Point3, Pose};

use super::sample::{CameraFrame, ControlSequence, HeightLabel, TerrainSample, Trajectory};

/// Tilted plane `z = offset + slope_x * x + slope_y * y`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlopedPlane {
    /// Height at the origin.
    pub offset: f32,
    /// `dz/dx`.
    pub slope_x: f32,
    /// `dz/dy`.
    pub slope_y: f32,
}

impl SlopedPlane {
    /// Horizontal plane at `offset`.
    pub fn flat(offset: f32) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Height at `(x, y)`.
    #[inline]
    pub fn height(&self, x: f32, y: f32) -> f32 {
        self.offset + self.slope_x * x + self.slope_y * y
    }

    /// Heights at every cell center, row-major over `(nx, ny)`.
    pub fn label(&self, grid: &BevGrid) -> HeightLabel {
        let (nx, ny) = grid.dims();
        let mut heights = Vec::with_capacity(nx * ny);
        for ix in 0..nx {
            for iy in 0..ny {
                let c = grid.cell_center(ix, iy);
                heights.push(self.height(c.x, c.y));
            }
        }
        HeightLabel::dense(heights, (nx, ny))
    }
}

/// Generator of plane samples.
#[derive(Debug, Clone)]
pub struct SyntheticTerrain {
    grid: BevGrid,
    steps: usize,
    dt: f32,
    points_per_cell: usize,
    camera_size: Option<[usize; 2]>,
    max_slope: f32,
    max_speed: f32,
}

impl SyntheticTerrain {
    /// Point-cloud samples over `grid` with `steps` commands spaced by `dt`.
    pub fn new(grid: BevGrid, steps: usize, dt: f32) -> Self {
        Self {
            grid,
            steps,
            dt,
            points_per_cell: 1,
            camera_size: None,
            max_slope: 0.1,
            max_speed: 1.0,
        }
    }

    /// Points scattered in each cell.
    pub fn with_points_per_cell(mut self, n: usize) -> Self {
        self.points_per_cell = n;
        self
    }

    /// Attach one forward-looking camera with a blank `[height, width]` image.
    pub fn with_camera(mut self, size: [usize; 2]) -> Self {
        self.camera_size = Some(size);
        self
    }

    /// Largest absolute slope along either axis.
    pub fn with_max_slope(mut self, slope: f32) -> Self {
        self.max_slope = slope.abs();
        self
    }

    /// Largest forward command.
    pub fn with_max_speed(mut self, speed: f32) -> Self {
        self.max_speed = speed.abs();
        self
    }

    /// Draw `count` samples. The same seed yields the same samples.
    pub fn generate(&self, count: usize, seed: u64) -> Vec<TerrainSample> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let plane = SlopedPlane {
                    offset: rng.gen_range(-0.2..=0.2),
                    slope_x: rng.gen_range(-self.max_slope..=self.max_slope),
                    slope_y: rng.gen_range(-self.max_slope..=self.max_slope),
                };
                let command = [
                    rng.gen_range(0.0..=self.max_speed),
                    rng.gen_range(-0.3..=0.3),
                ];
                self.sample(&plane, command, &mut rng)
            })
            .collect()
    }

    /// One sample over `plane` driven by a constant `command`.
    pub fn sample(&self, plane: &SlopedPlane, command: [f32; 2], rng: &mut impl Rng) -> TerrainSample {
        let (nx, ny) = self.grid.dims();
        let res = self.grid.resolution();

        let mut points = Vec::with_capacity(nx * ny * self.points_per_cell);
        for ix in 0..nx {
            for iy in 0..ny {
                let c = self.grid.cell_center(ix, iy);
                for _ in 0..self.points_per_cell {
                    let x = c.x + rng.gen_range(-0.45..=0.45) * res;
                    let y = c.y + rng.gen_range(-0.45..=0.45) * res;
                    points.push(Point3::new(x, y, plane.height(x, y)));
                }
            }
        }

        let cameras = match self.camera_size {
            Some(size) => vec![forward_camera(size)],
            None => Vec::new(),
        };

        let label = plane.label(&self.grid);
        let initial_pose = Pose::from_translation(Point3::new(0.0, 0.0, plane.height(0.0, 0.0)));

        TerrainSample {
            cameras,
            points,
            geometry: label.clone(),
            terrain: label,
            controls: ControlSequence::constant(command, self.steps, self.dt),
            initial_pose,
            trajectory: unicycle(plane, command, self.steps, self.dt),
        }
    }
}

/// Constant-command unicycle over the plane, one state per command.
fn unicycle(plane: &SlopedPlane, [v, omega]: [f32; 2], steps: usize, dt: f32) -> Trajectory {
    let mut traj = Trajectory::default();
    let (mut x, mut y, mut yaw) = (0.0f32, 0.0f32, 0.0f32);
    for i in 0..steps {
        traj.timestamps.push(i as f32 * dt);
        traj.positions.push([x, y, plane.height(x, y)]);
        traj.linear_velocities.push([v * yaw.cos(), v * yaw.sin(), 0.0]);
        traj.orientations.push(Mat3::from_rpy(0.0, 0.0, yaw).to_row_major());
        traj.angular_velocities.push([0.0, 0.0, omega]);

        x += v * yaw.cos() * dt;
        y += v * yaw.sin() * dt;
        yaw += omega * dt;
    }
    traj
}

/// Camera half a meter up, looking along +x, with a mid-gray normalized image.
fn forward_camera([h, w]: [usize; 2]) -> CameraFrame {
    // Optical frame: x right, y down, z forward.
    let rotation = Mat3::from_rows([[0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]]);
    let f = 0.5 * w as f32;
    let intrinsics = Mat3::from_rows([
        [f, 0.0, 0.5 * w as f32],
        [0.0, f, 0.5 * h as f32],
        [0.0, 0.0, 1.0],
    ]);
    CameraFrame {
        image: vec![0.0; 3 * h * w],
        size: [h, w],
        geometry: CameraGeometry::new(rotation, Point3::new(0.0, 0.0, 0.5), intrinsics),
    }
}
