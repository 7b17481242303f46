/// Geometry values shared by primitives, meshes and lights
use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};

/// A vector in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3D {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// The default up direction, positive Y
    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; fails for a zero-length vector
    pub fn normalize(self) -> Result<Self> {
        let len = self.length();
        if !len.is_finite() || len < 1e-12 {
            return Err(SceneError::InvalidArgument(format!(
                "cannot normalize vector ({}, {}, {})",
                self.x, self.y, self.z
            )));
        }
        Ok(self * (1.0 / len))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3D {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3D {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<Vector3<f32>> for Vector3D {
    fn from(v: Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3D> for Vector3<f32> {
    fn from(v: Vector3D) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

/// An opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as 0xAARRGGBB with full alpha
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Perceived brightness in `[0, 1]`
    pub fn luminance(self) -> f32 {
        (0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b))
            / 255.0
    }
}

/// A point where edges of a shape meet, with optional color and texture coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    position: Vector3D,
    color: Option<Color>,
    tu: f32,
    tv: f32,
    has_tex_coords: bool,
}

impl Vertex {
    /// A vertex with no color and no texture coordinates
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3D::new(x, y, z),
            color: None,
            tu: 0.0,
            tv: 0.0,
            has_tex_coords: false,
        }
    }

    pub fn colored(x: f32, y: f32, z: f32, color: Color) -> Self {
        Self {
            color: Some(color),
            ..Self::new(x, y, z)
        }
    }

    pub fn textured(x: f32, y: f32, z: f32, color: Option<Color>, tu: f32, tv: f32) -> Self {
        Self {
            position: Vector3D::new(x, y, z),
            color,
            tu,
            tv,
            has_tex_coords: true,
        }
    }

    /// Same color and texture coordinates at a new position
    pub fn with_position(&self, position: Vector3D) -> Self {
        Self { position, ..*self }
    }

    pub fn position(&self) -> Vector3D {
        self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn z(&self) -> f32 {
        self.position.z
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn u(&self) -> f32 {
        self.tu
    }

    pub fn v(&self) -> f32 {
        self.tv
    }

    pub fn is_colored(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_tex_coords(&self) -> bool {
        self.has_tex_coords
    }
}

/// A triangle face of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub positions: [Vector3D; 3],
    pub normal: Vector3D,
}

impl Triangle {
    /// Builds a triangle and derives its face normal from the winding
    pub fn new(v0: Vector3D, v1: Vector3D, v2: Vector3D) -> Self {
        let mut triangle = Self {
            positions: [v0, v1, v2],
            normal: Vector3D::zero(),
        };
        triangle.normal = triangle.calculate_normal();
        triangle
    }

    pub fn with_normal(v0: Vector3D, v1: Vector3D, v2: Vector3D, normal: Vector3D) -> Self {
        Self {
            positions: [v0, v1, v2],
            normal,
        }
    }

    /// Calculate the face normal from the triangle's vertices
    ///
    /// Degenerate triangles have a zero normal.
    pub fn calculate_normal(&self) -> Vector3D {
        let [v0, v1, v2] = self.positions;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(edge2).normalize().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vertex_flags() {
        let plain = Vertex::new(1.0, 2.0, 3.0);
        assert!(!plain.is_colored());
        assert!(!plain.has_tex_coords());

        let colored = Vertex::colored(0.0, 0.0, 0.0, Color::RED);
        assert!(colored.is_colored());
        assert!(!colored.has_tex_coords());

        let textured = Vertex::textured(0.0, 0.0, 0.0, None, 0.5, 1.0);
        assert!(!textured.is_colored());
        assert!(textured.has_tex_coords());
        assert_eq!(textured.u(), 0.5);
        assert_eq!(textured.v(), 1.0);
    }

    #[test]
    fn test_with_position_keeps_attributes() {
        let v = Vertex::textured(1.0, 1.0, 1.0, Some(Color::BLUE), 0.25, 0.75);
        let moved = v.with_position(Vector3D::new(4.0, 5.0, 6.0));
        assert_eq!(moved.position(), Vector3D::new(4.0, 5.0, 6.0));
        assert_eq!(moved.color(), Some(Color::BLUE));
        assert_eq!(moved.u(), 0.25);
        assert!(moved.has_tex_coords());
    }

    #[test]
    fn test_cross_and_normalize() {
        let x = Vector3D::new(1.0, 0.0, 0.0);
        let y = Vector3D::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vector3D::new(0.0, 0.0, 1.0));

        let n = Vector3D::new(3.0, 0.0, 4.0).normalize().unwrap();
        assert_relative_eq!(n.length(), 1.0, epsilon = 1e-6);
        assert!(Vector3D::zero().normalize().is_err());
    }

    #[test]
    fn test_triangle_normal() {
        let tri = Triangle::new(
            Vector3D::new(0.0, 0.0, 0.0),
            Vector3D::new(1.0, 0.0, 0.0),
            Vector3D::new(0.0, 1.0, 0.0),
        );
        assert_eq!(tri.normal, Vector3D::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_color_packing() {
        assert_eq!(Color::RED.to_argb(), 0xFFFF_0000);
        assert_eq!(Color::rgb(3, 187, 116).to_argb(), 0xFF03_BB74);
        assert_relative_eq!(Color::WHITE.luminance(), 1.0, epsilon = 1e-6);
        assert_eq!(Color::BLACK.luminance(), 0.0);
    }
}
