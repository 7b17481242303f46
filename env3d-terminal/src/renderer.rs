/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor::MoveTo,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use env3d_core::projection::project_with;
use env3d_core::rasterizer::{MeshSnapshot, PrimitiveSnapshot};
use env3d_core::{Color, Frame, LightType, Matrix, RenderMode, Vector3D, Vertex};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

type ScreenPoint = (f32, f32, f32);

/// Depth-buffered ASCII renderer for scene frames
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
    background: Color,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::WHITE; size],
            background: Color::BLACK,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self, background: Color) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::WHITE);
        self.background = background;
    }

    /// Character and color at a cell, `None` outside the buffer
    pub fn cell(&self, x: usize, y: usize) -> Option<(char, Color)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.width + x;
        Some((self.char_buffer[idx], self.color_buffer[idx]))
    }

    pub fn render_frame(&mut self, frame: &Frame) {
        let mvp = frame.model_view_projection();
        for primitive in &frame.primitives {
            self.render_primitive(primitive, &mvp);
        }
        for mesh in &frame.meshes {
            self.render_mesh(mesh, frame, &mvp);
        }
    }

    fn project(&self, mvp: &Matrix, point: Vector3D) -> Option<ScreenPoint> {
        project_with(mvp, point, self.width as u32, self.height as u32)
    }

    fn render_primitive(&mut self, primitive: &PrimitiveSnapshot, mvp: &Matrix) {
        let projected: Vec<Option<ScreenPoint>> = primitive
            .vertices
            .iter()
            .map(|vertex| self.project(mvp, vertex.position()))
            .collect();
        let color_of = |index: usize| vertex_color(primitive, &primitive.vertices[index]);
        let count = projected.len();

        match primitive.render_mode {
            RenderMode::PointList => {
                for (index, point) in projected.iter().enumerate() {
                    if let Some(point) = point {
                        self.plot(*point, color_of(index));
                    }
                }
            }
            RenderMode::LineList | RenderMode::LineStrip => {
                for [a, b] in primitive.render_mode.lines(count) {
                    if let (Some(pa), Some(pb)) = (projected[a], projected[b]) {
                        let color = average(&[color_of(a), color_of(b)]);
                        self.draw_line(pa, pb, color);
                    }
                }
            }
            mode => {
                for [a, b, c] in mode.triangles(count) {
                    // Triangle is clipped
                    let (Some(pa), Some(pb), Some(pc)) = (projected[a], projected[b], projected[c]) else {
                        continue;
                    };
                    let color = average(&[color_of(a), color_of(b), color_of(c)]);
                    self.rasterize_triangle(&[pa, pb, pc], ramp_char(color.luminance()), color);
                }
            }
        }
    }

    fn render_mesh(&mut self, mesh: &MeshSnapshot, frame: &Frame, mvp: &Matrix) {
        let world = if frame.transformation_enabled {
            frame.world
        } else {
            Matrix::identity()
        };
        let color = if frame.lighting_enabled {
            frame
                .lights
                .iter()
                .find(|light| light.light_type == LightType::Directional)
                .map_or(Color::WHITE, |light| light.diffuse)
        } else {
            Color::WHITE
        };

        for triangle in mesh.triangles.iter() {
            let mut screen = [(0.0, 0.0, 0.0); 3];
            let mut clipped = false;
            for (slot, position) in screen.iter_mut().zip(triangle.positions) {
                match self.project(mvp, position) {
                    Some(point) => *slot = point,
                    None => clipped = true,
                }
            }
            if clipped {
                continue;
            }

            let normal = (world.transform_point(triangle.normal) - world.transform_point(Vector3D::zero()))
                .normalize()
                .unwrap_or_default();
            let brightness = mesh_brightness(frame, normal);
            self.rasterize_triangle(&screen, ramp_char(brightness), color);
        }
    }

    fn plot(&mut self, point: ScreenPoint, color: Color) {
        self.set_cell(point.0, point.1, point.2, ramp_char(color.luminance()), color);
    }

    fn draw_line(&mut self, a: ScreenPoint, b: ScreenPoint, color: Color) {
        let character = ramp_char(color.luminance());
        let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.set_cell(
                a.0 + (b.0 - a.0) * t,
                a.1 + (b.1 - a.1) * t,
                a.2 + (b.2 - a.2) * t,
                character,
                color,
            );
        }
    }

    fn set_cell(&mut self, x: f32, y: f32, depth: f32, character: char, color: Color) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.width + x;
        if depth < self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = color;
        }
    }

    fn rasterize_triangle(&mut self, coords: &[ScreenPoint; 3], character: char, color: Color) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) = barycentric(
                    (v0.0, v0.1),
                    (v1.0, v1.1),
                    (v2.0, v2.1),
                    (px, py),
                ) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        self.set_cell(px, py, depth, character, color);
                    }
                }
            }
        }
    }

    /// Writes the buffer to `writer`, starting at terminal row `top`
    pub fn draw<W: Write>(&self, writer: &mut W, top: u16) -> std::io::Result<()> {
        writer.queue(SetBackgroundColor(term_color(self.background)))?;
        for y in 0..self.height {
            writer.queue(MoveTo(0, top + y as u16))?;
            for x in 0..self.width {
                let idx = y * self.width + x;
                writer.queue(SetForegroundColor(term_color(self.color_buffer[idx])))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Black when a colored primitive's vertex has no color of its own
fn vertex_color(primitive: &PrimitiveSnapshot, vertex: &Vertex) -> Color {
    if primitive.colored {
        vertex.color().unwrap_or(Color::BLACK)
    } else {
        primitive.material.diffuse.unwrap_or(Color::WHITE)
    }
}

fn average(colors: &[Color]) -> Color {
    let n = colors.len().max(1) as u32;
    let sum = |f: fn(&Color) -> u8| (colors.iter().map(|c| u32::from(f(c))).sum::<u32>() / n) as u8;
    Color::rgb(sum(|c| c.r), sum(|c| c.g), sum(|c| c.b))
}

/// Directional light plus ambient when lighting is on, otherwise a headlight
/// shining along the view direction
fn mesh_brightness(frame: &Frame, normal: Vector3D) -> f32 {
    if frame.lighting_enabled {
        let ambient = frame.ambient_light.map_or(0.0, Color::luminance);
        let diffuse = frame
            .lights
            .iter()
            .find(|light| light.light_type == LightType::Directional)
            .and_then(|light| {
                let towards_light = (-light.direction).normalize().ok()?;
                Some(normal.dot(towards_light).max(0.0))
            })
            .unwrap_or(0.0);
        (ambient + diffuse).min(1.0)
    } else {
        let rows = frame.view.rows();
        let forward = Vector3D::new(rows[0][2], rows[1][2], rows[2][2]);
        (-normal.dot(forward)).max(0.0)
    }
}

/// Drawn cells never use the blank at the bottom of the ramp
fn ramp_char(brightness: f32) -> char {
    let top = LUMINOSITY_RAMP.len() - 1;
    let index = 1 + (brightness.clamp(0.0, 1.0) * (top - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(top)]
}

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::frame_with;
    use env3d_core::{Light, Mesh, Primitive};

    fn triangle_at(z: f32, color: Color) -> Primitive {
        let primitive = Primitive::new(RenderMode::TriangleList);
        for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (0.0, 1.5)] {
            primitive.add_vertex(Vertex::colored(x, y, z, color)).unwrap();
        }
        primitive
    }

    #[test]
    fn test_cube_covers_center() {
        let frame = frame_with(&[Primitive::create_cube()], &[], |_| {});
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_frame(&frame);

        let (character, _) = renderer.cell(20, 10).unwrap();
        assert_ne!(character, ' ');
        assert_eq!(renderer.cell(0, 0).unwrap().0, ' ');
    }

    #[test]
    fn test_depth_buffer_keeps_nearest() {
        // Eye sits at z = -5, so the blue triangle is nearer
        let far = triangle_at(0.0, Color::RED);
        let near = triangle_at(-1.0, Color::BLUE);
        let frame = frame_with(&[near, far], &[], |_| {});

        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_frame(&frame);
        assert_eq!(renderer.cell(20, 10).unwrap().1, Color::BLUE);

        renderer.clear(Color::BLACK);
        assert_eq!(renderer.cell(20, 10).unwrap().0, ' ');
    }

    #[test]
    fn test_lines_and_points() {
        let line = Primitive::new(RenderMode::LineStrip);
        line.add_vertex(Vertex::colored(-1.0, 0.0, 0.0, Color::WHITE)).unwrap();
        line.add_vertex(Vertex::colored(1.0, 0.0, 0.0, Color::WHITE)).unwrap();
        let frame = frame_with(&[line], &[], |_| {});

        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_frame(&frame);
        let drawn = (0..40).filter(|&x| renderer.cell(x, 10).unwrap().0 != ' ').count();
        assert!(drawn > 5, "only {drawn} cells on the line");
    }

    #[test]
    fn test_lit_mesh_brightness() {
        let mesh = Mesh::create_box(1.0, 1.0, 1.0).unwrap();
        let frame = frame_with(&[], &[mesh], |environment| {
            environment.set_lighting_enabled(true).unwrap();
            environment
                .add_light(&Light::directional(Vector3D::new(0.0, 0.0, 1.0), Color::WHITE))
                .unwrap();
        });

        // Front face looks down -Z, straight into the light
        let facing = mesh_brightness(&frame, Vector3D::new(0.0, 0.0, -1.0));
        let away = mesh_brightness(&frame, Vector3D::new(0.0, 0.0, 1.0));
        assert!((facing - 1.0).abs() < 1e-5);
        assert_eq!(away, 0.0);

        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_frame(&frame);
        assert_eq!(renderer.cell(20, 10).unwrap().0, '@');
    }

    #[test]
    fn test_uncolored_vertex_is_black() {
        let primitive = Primitive::new(RenderMode::PointList);
        primitive.add_vertex(Vertex::new(0.0, 0.0, 0.0)).unwrap();
        let frame = frame_with(&[primitive], &[], |_| {});
        let snapshot = &frame.primitives[0];
        assert_eq!(vertex_color(snapshot, &snapshot.vertices[0]), Color::BLACK);
    }

    #[test]
    fn test_ramp_never_blank() {
        assert_eq!(ramp_char(0.0), '.');
        assert_eq!(ramp_char(1.0), '@');
        assert_eq!(ramp_char(7.0), '@');
    }
}
