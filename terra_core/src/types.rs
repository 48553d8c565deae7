//! Core geometric types: points, rotations and rigid poses.
//!
//! Matrices are row-major. A [`Pose`] maps robot-frame points into the
//! fixed frame it was expressed in.

use core::ops::{Add, Div, Mul, Neg, Sub};

/// A 3D point with named fields for clarity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Point3 {
    /// Create a new Point3.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Create a Point3 with all components set to the same value.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Convert to an array.
    #[inline]
    pub const fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Create from an array.
    #[inline]
    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    /// Dot product with another point (treating both as vectors).
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product with another point (treating both as vectors).
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Length (magnitude) of the vector.
    #[inline]
    pub fn length(self) -> f32 {
        libm::sqrtf(self.dot(self))
    }

    /// Normalize the vector to unit length.
    /// Returns a zero vector if the length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::splat(0.0)
        } else {
            self / len
        }
    }

    /// Whether every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Point3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Point3 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Point3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f32; 3]> for Point3 {
    #[inline]
    fn from(a: [f32; 3]) -> Self {
        Self::from_array(a)
    }
}

/// A 3x3 row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    /// Rows of the matrix.
    pub rows: [[f32; 3]; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Create from rows.
    #[inline]
    pub const fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        Self { rows }
    }

    /// Create from a flat row-major slice of nine values.
    pub fn from_row_major(values: &[f32; 9]) -> Self {
        Self::from_rows([
            [values[0], values[1], values[2]],
            [values[3], values[4], values[5]],
            [values[6], values[7], values[8]],
        ])
    }

    /// Flatten to row-major order.
    pub fn to_row_major(&self) -> [f32; 9] {
        let r = &self.rows;
        [
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        ]
    }

    /// Diagonal matrix.
    #[inline]
    pub const fn diagonal(a: f32, b: f32, c: f32) -> Self {
        Self::from_rows([[a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]])
    }

    /// Column `j` as a vector.
    #[inline]
    pub fn column(&self, j: usize) -> Point3 {
        Point3::new(self.rows[0][j], self.rows[1][j], self.rows[2][j])
    }

    /// Matrix-vector product.
    #[inline]
    pub fn mul_vec(&self, v: Point3) -> Point3 {
        let r = &self.rows;
        Point3::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }

    /// Matrix-matrix product `self * rhs`.
    pub fn mul_mat(&self, rhs: &Mat3) -> Mat3 {
        let mut out = [[0.0f32; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Mat3::from_rows(out)
    }

    /// Transpose.
    pub fn transpose(&self) -> Mat3 {
        let r = &self.rows;
        Mat3::from_rows([
            [r[0][0], r[1][0], r[2][0]],
            [r[0][1], r[1][1], r[2][1]],
            [r[0][2], r[1][2], r[2][2]],
        ])
    }

    /// Determinant.
    pub fn determinant(&self) -> f32 {
        let r = &self.rows;
        r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0])
    }

    /// Inverse, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        if libm::fabsf(det) < 1e-12 {
            return None;
        }
        let r = &self.rows;
        let inv_det = 1.0 / det;
        let cof = |a: usize, b: usize, c: usize, d: usize| r[a][b] * r[c][d];
        Some(Mat3::from_rows([
            [
                (cof(1, 1, 2, 2) - cof(1, 2, 2, 1)) * inv_det,
                (cof(0, 2, 2, 1) - cof(0, 1, 2, 2)) * inv_det,
                (cof(0, 1, 1, 2) - cof(0, 2, 1, 1)) * inv_det,
            ],
            [
                (cof(1, 2, 2, 0) - cof(1, 0, 2, 2)) * inv_det,
                (cof(0, 0, 2, 2) - cof(0, 2, 2, 0)) * inv_det,
                (cof(0, 2, 1, 0) - cof(0, 0, 1, 2)) * inv_det,
            ],
            [
                (cof(1, 0, 2, 1) - cof(1, 1, 2, 0)) * inv_det,
                (cof(0, 1, 2, 0) - cof(0, 0, 2, 1)) * inv_det,
                (cof(0, 0, 1, 1) - cof(0, 1, 1, 0)) * inv_det,
            ],
        ]))
    }

    /// Rotation from roll (x), pitch (y) and yaw (z), applied as `Rz * Ry * Rx`.
    pub fn from_rpy(roll: f32, pitch: f32, yaw: f32) -> Mat3 {
        let (sr, cr) = (libm::sinf(roll), libm::cosf(roll));
        let (sp, cp) = (libm::sinf(pitch), libm::cosf(pitch));
        let (sy, cy) = (libm::sinf(yaw), libm::cosf(yaw));
        Mat3::from_rows([
            [cy * cp, cy * sp * sr - sy * cr, cy * sp * cr + sy * sr],
            [sy * cp, sy * sp * sr + cy * cr, sy * sp * cr - cy * sr],
            [-sp, cp * sr, cp * cr],
        ])
    }

    /// Decompose a rotation into `(roll, pitch, yaw)`; inverse of [`Mat3::from_rpy`].
    pub fn to_rpy(&self) -> (f32, f32, f32) {
        let r = &self.rows;
        let pitch = libm::asinf((-r[2][0]).clamp(-1.0, 1.0));
        let roll = libm::atan2f(r[2][1], r[2][2]);
        let yaw = libm::atan2f(r[1][0], r[0][0]);
        (roll, pitch, yaw)
    }

    /// Same roll and pitch, zero yaw.
    ///
    /// Used to express sensors in a gravity-aligned frame that still turns
    /// with the robot.
    pub fn leveled(&self) -> Mat3 {
        let (roll, pitch, _) = self.to_rpy();
        Mat3::from_rpy(roll, pitch, 0.0)
    }
}

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Rotation part.
    pub rotation: Mat3,
    /// Translation part.
    pub translation: Point3,
}

impl Pose {
    /// Identity pose.
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: Point3::new(0.0, 0.0, 0.0),
    };

    /// Create a pose from its parts.
    pub const fn new(rotation: Mat3, translation: Point3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a pure translation.
    pub const fn from_translation(translation: Point3) -> Self {
        Self::new(Mat3::IDENTITY, translation)
    }

    /// Read a homogeneous 4x4 row-major matrix.
    pub fn from_matrix(m: &[f32; 16]) -> Self {
        Self::new(
            Mat3::from_rows([[m[0], m[1], m[2]], [m[4], m[5], m[6]], [m[8], m[9], m[10]]]),
            Point3::new(m[3], m[7], m[11]),
        )
    }

    /// Write a homogeneous 4x4 row-major matrix.
    pub fn to_matrix(&self) -> [f32; 16] {
        let r = &self.rotation.rows;
        let t = self.translation;
        [
            r[0][0], r[0][1], r[0][2], t.x, r[1][0], r[1][1], r[1][2], t.y, r[2][0], r[2][1],
            r[2][2], t.z, 0.0, 0.0, 0.0, 1.0,
        ]
    }

    /// Apply to a point.
    #[inline]
    pub fn transform_point(&self, p: Point3) -> Point3 {
        self.rotation.mul_vec(p) + self.translation
    }

    /// Composition `self * rhs`.
    pub fn compose(&self, rhs: &Pose) -> Pose {
        Pose::new(
            self.rotation.mul_mat(&rhs.rotation),
            self.transform_point(rhs.translation),
        )
    }

    /// Inverse of a rigid transform.
    pub fn inverse(&self) -> Pose {
        let rt = self.rotation.transpose();
        Pose::new(rt, -rt.mul_vec(self.translation))
    }
}
