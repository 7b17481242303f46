/// 4x4 transformation matrices
///
/// Matrices follow the row-vector convention: a point is transformed as
/// `p' = p * M`, and the translation lives in the last row.
use std::fmt;
use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};
use nalgebra::{Matrix4, RowVector4};

use crate::error::{Result, SceneError};
use crate::geometry::Vector3D;

/// An immutable 4x4 matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(Matrix4<f32>);

impl Matrix {
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    pub fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        Self(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.0[(r, c)];
            }
        }
        rows
    }

    pub fn as_matrix4(&self) -> &Matrix4<f32> {
        &self.0
    }

    /// Returns the value at `row`, `col`; both must lie in `0..=3`
    pub fn value_at(&self, row: usize, col: usize) -> Result<f32> {
        if row > 3 || col > 3 {
            return Err(SceneError::IndexOutOfRange { row, col });
        }
        Ok(self.0[(row, col)])
    }

    /// Create a translation matrix
    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        let mut m = Matrix4::identity();
        m[(3, 0)] = x;
        m[(3, 1)] = y;
        m[(3, 2)] = z;
        Self(m)
    }

    /// Create a scale matrix
    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Self(Matrix4::from_diagonal(&nalgebra::Vector4::new(x, y, z, 1.0)))
    }

    /// Rotation around the X-axis, angle in radians
    pub fn rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, s, 0.0],
            [0.0, -s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation around the Y-axis, angle in radians
    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [c, 0.0, -s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation around the Z-axis, angle in radians
    pub fn rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [c, s, 0.0, 0.0],
            [-s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Combined rotation: roll around Z first, then pitch around X, then yaw around Y
    ///
    /// Equal to `rotation_z(roll) * rotation_x(pitch) * rotation_y(yaw)`.
    pub fn rotation_yaw_pitch_roll(yaw: f32, pitch: f32, roll: f32) -> Self {
        let (sy, cy) = yaw.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        let (sr, cr) = roll.sin_cos();
        Self::from_rows([
            [cr * cy + sr * sp * sy, sr * cp, sr * sp * cy - cr * sy, 0.0],
            [cr * sp * sy - sr * cy, cr * cp, sr * sy + cr * sp * cy, 0.0],
            [cp * sy, -sp, cp * cy, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Standard product `a * b`
    pub fn multiply(a: &Matrix, b: &Matrix) -> Self {
        Self(a.0 * b.0)
    }

    /// Transforms a point (w = 1) as `p * M`
    pub fn transform_point(&self, p: Vector3D) -> Vector3D {
        let row = RowVector4::new(p.x, p.y, p.z, 1.0) * self.0;
        Vector3D::new(row[0], row[1], row[2])
    }

    /// Transforms a point and returns the homogeneous `(x, y, z, w)` result
    pub fn transform_homogeneous(&self, p: Vector3D) -> [f32; 4] {
        let row = RowVector4::new(p.x, p.y, p.z, 1.0) * self.0;
        [row[0], row[1], row[2], row[3]]
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        Matrix::multiply(&self, &rhs)
    }
}

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: &Matrix) -> Matrix {
        Matrix::multiply(self, rhs)
    }
}

impl From<Matrix4<f32>> for Matrix {
    fn from(m: Matrix4<f32>) -> Self {
        Self(m)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}, {}, {}, {}]", row[0], row[1], row[2], row[3])?;
        }
        Ok(())
    }
}

impl AbsDiffEq for Matrix {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.0.abs_diff_eq(&other.0, epsilon)
    }
}

impl RelativeEq for Matrix {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.0.relative_eq(&other.0, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPSILON: f32 = 1e-5;

    fn sample() -> Matrix {
        Matrix::from_rows([
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ])
    }

    #[test]
    fn test_identity_is_neutral() {
        let m = sample();
        assert_eq!(Matrix::multiply(&m, &Matrix::identity()), m);
        assert_eq!(Matrix::multiply(&Matrix::identity(), &m), m);
    }

    #[test]
    fn test_identity_preserves_row_vector() {
        let row = Matrix::from_rows([
            [1.5, -2.0, 3.25, 1.0],
            [0.0; 4],
            [0.0; 4],
            [0.0; 4],
        ]);
        assert_eq!(Matrix::multiply(&row, &Matrix::identity()), row);
        let p = Vector3D::new(1.5, -2.0, 3.25);
        assert_eq!(Matrix::identity().transform_point(p), p);
    }

    #[test]
    fn test_multiply_is_associative() {
        let a = Matrix::rotation_x(0.3) * Matrix::translate(1.0, 2.0, 3.0);
        let b = Matrix::scale(2.0, 0.5, 1.5);
        let c = Matrix::rotation_yaw_pitch_roll(0.2, -0.4, 1.1);
        let left = Matrix::multiply(&Matrix::multiply(&a, &b), &c);
        let right = Matrix::multiply(&a, &Matrix::multiply(&b, &c));
        assert_relative_eq!(left, right, epsilon = EPSILON);
    }

    #[test]
    fn test_multiply_matches_definition() {
        let a = sample();
        let b = Matrix::translate(1.0, -1.0, 2.0);
        let product = Matrix::multiply(&a, &b);
        for i in 0..4 {
            for j in 0..4 {
                let expected: f32 = (0..4)
                    .map(|k| a.value_at(i, k).unwrap() * b.value_at(k, j).unwrap())
                    .sum();
                assert_relative_eq!(product.value_at(i, j).unwrap(), expected, epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_translate_layout() {
        let m = Matrix::translate(2.0, 3.0, 4.0);
        assert_eq!(m.rows()[3], [2.0, 3.0, 4.0, 1.0]);
        let p = m.transform_point(Vector3D::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vector3D::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_scale_layout() {
        let m = Matrix::scale(2.0, 3.0, 4.0);
        assert_eq!(m.value_at(0, 0).unwrap(), 2.0);
        assert_eq!(m.value_at(1, 1).unwrap(), 3.0);
        assert_eq!(m.value_at(2, 2).unwrap(), 4.0);
        assert_eq!(m.value_at(3, 3).unwrap(), 1.0);
        assert_eq!(m.value_at(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_axis_rotations_row_vector() {
        // +X rotated a quarter turn around Z lands on +Y
        let p = Matrix::rotation_z(FRAC_PI_2).transform_point(Vector3D::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(p.y, 1.0, epsilon = EPSILON);

        // +Y around X lands on +Z
        let p = Matrix::rotation_x(FRAC_PI_2).transform_point(Vector3D::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p.z, 1.0, epsilon = EPSILON);

        // +Z around Y lands on +X
        let p = Matrix::rotation_y(FRAC_PI_2).transform_point(Vector3D::new(0.0, 0.0, 1.0));
        assert_relative_eq!(p.x, 1.0, epsilon = EPSILON);
        assert_relative_eq!(p.z, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_yaw_pitch_roll_zero_is_identity() {
        assert_relative_eq!(
            Matrix::rotation_yaw_pitch_roll(0.0, 0.0, 0.0),
            Matrix::identity(),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_yaw_pitch_roll_composition_order() {
        let (yaw, pitch, roll) = (0.7, -0.3, 1.2);
        let composed = Matrix::rotation_z(roll) * Matrix::rotation_x(pitch) * Matrix::rotation_y(yaw);
        assert_relative_eq!(
            Matrix::rotation_yaw_pitch_roll(yaw, pitch, roll),
            composed,
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_yaw_pitch_roll_pinned_values() {
        // yaw = pitch = roll = 90 degrees
        let m = Matrix::rotation_yaw_pitch_roll(FRAC_PI_2, FRAC_PI_2, FRAC_PI_2);
        let expected = Matrix::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_relative_eq!(m, expected, epsilon = EPSILON);

        // Single axes reduce to the axis rotations
        assert_relative_eq!(
            Matrix::rotation_yaw_pitch_roll(PI / 3.0, 0.0, 0.0),
            Matrix::rotation_y(PI / 3.0),
            epsilon = EPSILON
        );
        assert_relative_eq!(
            Matrix::rotation_yaw_pitch_roll(0.0, 0.0, PI / 5.0),
            Matrix::rotation_z(PI / 5.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_value_at_bounds() {
        let m = Matrix::identity();
        assert_eq!(m.value_at(3, 3).unwrap(), 1.0);
        assert!(matches!(
            m.value_at(4, 0),
            Err(SceneError::IndexOutOfRange { row: 4, col: 0 })
        ));
        assert!(m.value_at(0, 4).is_err());
    }

    #[test]
    fn test_display() {
        let text = Matrix::identity().to_string();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("[1, 0, 0, 0]"));
    }
}
