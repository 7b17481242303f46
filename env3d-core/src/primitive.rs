/// Primitives: vertex collections placed into a scene
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::geometry::{Color, Vertex};
use crate::handle::{HandleId, ResourceHandle};
use crate::lock;
use crate::rasterizer::PrimitiveSnapshot;
use crate::texture::Texture;
use crate::transform::Matrix;

/// How the vertices of a primitive are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Vertices are not linked
    PointList = 0,
    /// Pairs of vertices form lines
    LineList = 1,
    /// Each vertex is linked to the next in a chain
    LineStrip = 2,
    /// Every three vertices form a triangle
    TriangleList = 3,
    /// The first three vertices form a triangle, each later vertex forms
    /// another with the previous two
    TriangleStrip = 4,
    /// Like a strip, but every triangle shares the first vertex
    TriangleFan = 5,
}

impl RenderMode {
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn is_triangles(self) -> bool {
        matches!(
            self,
            RenderMode::TriangleList | RenderMode::TriangleStrip | RenderMode::TriangleFan
        )
    }

    /// Vertex index triples for `count` vertices in this topology
    pub fn triangles(self, count: usize) -> Vec<[usize; 3]> {
        match self {
            RenderMode::TriangleList => (0..count / 3).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]).collect(),
            RenderMode::TriangleStrip => (0..count.saturating_sub(2))
                .map(|i| if i % 2 == 0 { [i, i + 1, i + 2] } else { [i + 1, i, i + 2] })
                .collect(),
            RenderMode::TriangleFan => (1..count.saturating_sub(1)).map(|i| [0, i, i + 1]).collect(),
            _ => Vec::new(),
        }
    }

    /// Vertex index pairs for `count` vertices in a line topology
    pub fn lines(self, count: usize) -> Vec<[usize; 2]> {
        match self {
            RenderMode::LineList => (0..count / 2).map(|l| [2 * l, 2 * l + 1]).collect(),
            RenderMode::LineStrip => (0..count.saturating_sub(1)).map(|i| [i, i + 1]).collect(),
            _ => Vec::new(),
        }
    }
}

/// The types and colors of light reflected by a primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: Option<Color>,
    pub ambient: Option<Color>,
    pub specular: Option<Color>,
    pub emissive: Option<Color>,
    pub specular_intensity: f32,
}

impl Material {
    pub fn new(
        diffuse: Option<Color>,
        ambient: Option<Color>,
        specular: Option<Color>,
        emissive: Option<Color>,
        specular_intensity: f32,
    ) -> Self {
        Self {
            diffuse,
            ambient,
            specular,
            emissive,
            specular_intensity,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(
            Some(Color::WHITE),
            Some(Color::WHITE),
            Some(Color::WHITE),
            Some(Color::BLACK),
            1.0,
        )
    }
}

struct PrimitiveState {
    /// Untransformed vertices as added
    default_vertices: Vec<Vertex>,
    /// What the rasterizer sees: `default_vertices` times `transform`
    render_buffer: Vec<Vertex>,
    transform: Matrix,
    material: Material,
    texture: Option<Texture>,
    colored: bool,
}

struct PrimitiveInner {
    handle: ResourceHandle,
    render_mode: RenderMode,
    state: Mutex<PrimitiveState>,
}

/// A renderable collection of vertices plus a topology
///
/// Cloning yields another handle to the same primitive; all mutations are
/// serialized per primitive.
#[derive(Clone)]
pub struct Primitive {
    inner: Arc<PrimitiveInner>,
}

impl Primitive {
    pub fn new(render_mode: RenderMode) -> Self {
        Self {
            inner: Arc::new(PrimitiveInner {
                handle: ResourceHandle::acquire("Primitive"),
                render_mode,
                state: Mutex::new(PrimitiveState {
                    default_vertices: Vec::new(),
                    render_buffer: Vec::new(),
                    transform: Matrix::identity(),
                    material: Material::default(),
                    texture: None,
                    colored: true,
                }),
            }),
        }
    }

    pub fn id(&self) -> HandleId {
        self.inner.handle.id()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.inner.render_mode
    }

    pub(crate) fn ensure_live(&self) -> Result<HandleId> {
        self.inner.handle.ensure_live()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.handle.is_disposed()
    }

    /// Appends a vertex; order is preserved and duplicates are kept
    pub fn add_vertex(&self, vertex: Vertex) -> Result<()> {
        self.ensure_live()?;
        let mut state = lock(&self.inner.state);
        let rendered = vertex.with_position(state.transform.transform_point(vertex.position()));
        state.default_vertices.push(vertex);
        state.render_buffer.push(rendered);
        Ok(())
    }

    /// Sets the transform applied to the default vertices
    ///
    /// Not cumulative: every call recomputes from the untransformed vertices.
    pub fn set_transform(&self, transform: Matrix) -> Result<()> {
        self.ensure_live()?;
        let mut state = lock(&self.inner.state);
        let PrimitiveState {
            default_vertices,
            render_buffer,
            ..
        } = &mut *state;
        for (slot, vertex) in render_buffer.iter_mut().zip(default_vertices.iter()) {
            *slot = vertex.with_position(transform.transform_point(vertex.position()));
        }
        state.transform = transform;
        Ok(())
    }

    /// Drops the transform and restores the default vertices
    pub fn reset_transform(&self) -> Result<()> {
        self.ensure_live()?;
        let mut state = lock(&self.inner.state);
        state.render_buffer = state.default_vertices.clone();
        state.transform = Matrix::identity();
        Ok(())
    }

    /// The current transform, identity when none is set
    pub fn transform(&self) -> Matrix {
        lock(&self.inner.state).transform
    }

    /// Vertices as seen by the rasterizer
    pub fn vertices(&self) -> Vec<Vertex> {
        lock(&self.inner.state).render_buffer.clone()
    }

    pub fn default_vertices(&self) -> Vec<Vertex> {
        lock(&self.inner.state).default_vertices.clone()
    }

    pub fn vertex_count(&self) -> usize {
        lock(&self.inner.state).default_vertices.len()
    }

    pub fn material(&self) -> Material {
        lock(&self.inner.state).material
    }

    pub fn set_material(&self, material: Material) -> Result<()> {
        self.ensure_live()?;
        lock(&self.inner.state).material = material;
        Ok(())
    }

    pub fn texture(&self) -> Option<Texture> {
        lock(&self.inner.state).texture.clone()
    }

    /// Sets the texture, or removes it with `None`
    pub fn set_texture(&self, texture: Option<&Texture>) -> Result<()> {
        self.ensure_live()?;
        if let Some(texture) = texture {
            texture.ensure_live()?;
        }
        lock(&self.inner.state).texture = texture.cloned();
        Ok(())
    }

    /// Whether vertices are drawn with their own colors; black when a vertex has none
    pub fn is_colored(&self) -> bool {
        lock(&self.inner.state).colored
    }

    pub fn set_colored(&self, colored: bool) -> Result<()> {
        self.ensure_live()?;
        lock(&self.inner.state).colored = colored;
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> Result<PrimitiveSnapshot> {
        let id = self.ensure_live()?;
        let state = lock(&self.inner.state);
        Ok(PrimitiveSnapshot {
            id,
            render_mode: self.inner.render_mode,
            vertices: state.render_buffer.clone(),
            colored: state.colored,
            material: state.material,
            texture: state.texture.as_ref().map(Texture::id),
        })
    }

    /// Releases the primitive; every later mutation fails
    pub fn dispose(&self) -> Result<()> {
        self.inner.handle.release().map(|_| ())
    }

    /// A triangle with width 1, centered around the origin
    pub fn create_triangle() -> Self {
        let triangle = Self::new(RenderMode::TriangleStrip);
        let mut state = lock(&triangle.inner.state);
        for vertex in [
            Vertex::colored(0.5, -0.5, 0.0, Color::RED),
            Vertex::colored(-0.5, -0.5, 0.0, Color::GREEN),
            Vertex::colored(0.0, 0.5, 0.0, Color::BLUE),
        ] {
            state.default_vertices.push(vertex);
            state.render_buffer.push(vertex);
        }
        drop(state);
        triangle
    }

    /// A cube with side length 1, centered around the origin
    pub fn create_cube() -> Self {
        const TOP: Color = Color::rgb(3, 187, 116);
        const BOTTOM: Color = Color::rgb(169, 167, 245);
        let h = 0.5;
        let faces: [[(f32, f32, f32, Color); 6]; 6] = [
            // Front
            [
                (-h, h, -h, Color::BLUE),
                (h, -h, -h, Color::BLUE),
                (-h, -h, -h, Color::YELLOW),
                (-h, h, -h, Color::BLUE),
                (h, h, -h, Color::BLUE),
                (h, -h, -h, Color::BLUE),
            ],
            // Right
            [
                (h, h, -h, Color::RED),
                (h, -h, h, Color::RED),
                (h, -h, -h, Color::BLUE),
                (h, h, -h, Color::RED),
                (h, h, h, Color::RED),
                (h, -h, h, Color::RED),
            ],
            // Back
            [
                (h, h, h, Color::YELLOW),
                (-h, -h, h, Color::YELLOW),
                (h, -h, h, Color::RED),
                (h, h, h, Color::YELLOW),
                (-h, h, h, Color::YELLOW),
                (-h, -h, h, Color::YELLOW),
            ],
            // Left
            [
                (-h, h, h, Color::GREEN),
                (-h, -h, -h, Color::GREEN),
                (-h, -h, h, Color::GREEN),
                (-h, h, h, Color::GREEN),
                (-h, h, -h, Color::GREEN),
                (-h, -h, -h, Color::GREEN),
            ],
            // Top
            [
                (-h, h, -h, TOP),
                (-h, h, h, TOP),
                (h, h, -h, TOP),
                (-h, h, h, TOP),
                (h, h, h, TOP),
                (h, h, -h, TOP),
            ],
            // Bottom
            [
                (-h, -h, -h, BOTTOM),
                (h, -h, -h, BOTTOM),
                (-h, -h, h, BOTTOM),
                (h, -h, -h, BOTTOM),
                (h, -h, h, BOTTOM),
                (-h, -h, h, BOTTOM),
            ],
        ];

        let cube = Self::new(RenderMode::TriangleList);
        let mut state = lock(&cube.inner.state);
        for (x, y, z, color) in faces.into_iter().flatten() {
            let vertex = Vertex::colored(x, y, z, color);
            state.default_vertices.push(vertex);
            state.render_buffer.push(vertex);
        }
        drop(state);
        cube
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Primitive {}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("id", &self.id())
            .field("render_mode", &self.inner.render_mode)
            .field("vertices", &self.vertex_count())
            .finish()
    }
}
