/// The boundary between the scene core and whatever draws it
use std::sync::{Arc, Mutex};

use crate::error::{Result, SceneError};
use crate::geometry::{Color, Triangle, Vertex};
use crate::handle::HandleId;
use crate::light::LightParams;
use crate::lock;
use crate::primitive::{Material, RenderMode};
use crate::transform::Matrix;

/// What a primitive looks like at the moment a frame is taken
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSnapshot {
    pub id: HandleId,
    pub render_mode: RenderMode,
    /// Render-buffer vertices, already multiplied by the primitive transform
    pub vertices: Vec<Vertex>,
    pub colored: bool,
    pub material: Material,
    pub texture: Option<HandleId>,
}

#[derive(Debug, Clone)]
pub struct MeshSnapshot {
    pub id: HandleId,
    pub triangles: Arc<[Triangle]>,
}

/// Everything the rasterizer needs to draw one frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub number: u64,
    pub world: Matrix,
    pub view: Matrix,
    pub projection: Matrix,
    pub primitives: Vec<PrimitiveSnapshot>,
    pub meshes: Vec<MeshSnapshot>,
    pub lights: Vec<LightParams>,
    pub ambient_light: Option<Color>,
    pub lighting_enabled: bool,
    pub transformation_enabled: bool,
    pub background_color: Color,
    pub background_texture: Option<HandleId>,
}

impl Frame {
    /// World · view · projection, or just view · projection with
    /// transformation disabled
    pub fn model_view_projection(&self) -> Matrix {
        let world = if self.transformation_enabled {
            self.world
        } else {
            Matrix::identity()
        };
        world * self.view * self.projection
    }
}

/// Push interface to a rendering backend
///
/// Structural calls receive handle ids only; vertex data travels with each
/// [`Frame`]. Push operations default to no-ops so backends that redraw
/// entirely from the frame only implement [`Rasterizer::draw_frame`].
pub trait Rasterizer: Send {
    /// Allocate backend resources; called once before anything else
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_world_matrix(&mut self, _matrix: &Matrix) {}

    fn set_view_matrix(&mut self, _matrix: &Matrix) {}

    fn set_projection_matrix(&mut self, _matrix: &Matrix) {}

    fn add_primitive(&mut self, _id: HandleId) -> Result<()> {
        Ok(())
    }

    fn remove_primitive(&mut self, _id: HandleId) -> Result<()> {
        Ok(())
    }

    fn add_light(&mut self, _id: HandleId, _params: &LightParams) -> Result<()> {
        Ok(())
    }

    fn remove_light(&mut self, _id: HandleId) -> Result<()> {
        Ok(())
    }

    fn add_mesh(&mut self, _id: HandleId) -> Result<()> {
        Ok(())
    }

    fn remove_mesh(&mut self, _id: HandleId) -> Result<()> {
        Ok(())
    }

    fn set_background_color(&mut self, _color: Color) {}

    fn set_background_texture(&mut self, _texture: Option<HandleId>) {}

    fn set_ambient_light(&mut self, _color: Option<Color>) {}

    fn set_lighting_enabled(&mut self, _enabled: bool) {}

    fn set_transformation_enabled(&mut self, _enabled: bool) {}

    fn resize(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }

    fn draw_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Release backend resources; no calls follow
    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One recorded call into a [`HeadlessRasterizer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RasterCall {
    Initialize,
    WorldMatrix(Matrix),
    ViewMatrix(Matrix),
    ProjectionMatrix(Matrix),
    AddPrimitive(HandleId),
    RemovePrimitive(HandleId),
    AddLight(HandleId),
    RemoveLight(HandleId),
    AddMesh(HandleId),
    RemoveMesh(HandleId),
    BackgroundColor(Color),
    BackgroundTexture(Option<HandleId>),
    AmbientLight(Option<Color>),
    LightingEnabled(bool),
    TransformationEnabled(bool),
    Resize(u32, u32),
    DrawFrame(u64),
    Dispose,
}

#[derive(Debug, Default)]
pub struct RasterLog {
    pub calls: Vec<RasterCall>,
    pub last_frame: Option<Frame>,
    pub fail_initialize: bool,
    pub fail_draws: bool,
}

impl RasterLog {
    pub fn frames_drawn(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RasterCall::DrawFrame(_)))
            .count()
    }

    pub fn count(&self, call: &RasterCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

/// Rasterizer without a display that records what it is told
///
/// The log is shared, so a clone of [`HeadlessRasterizer::log`] taken before
/// the rasterizer is handed to a scene stays inspectable.
#[derive(Debug, Default)]
pub struct HeadlessRasterizer {
    log: Arc<Mutex<RasterLog>>,
}

impl HeadlessRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<Mutex<RasterLog>> {
        Arc::clone(&self.log)
    }

    fn record(&self, call: RasterCall) {
        lock(&self.log).calls.push(call);
    }
}

impl Rasterizer for HeadlessRasterizer {
    fn initialize(&mut self) -> Result<()> {
        let mut log = lock(&self.log);
        if log.fail_initialize {
            return Err(SceneError::ResourceExhausted(
                "headless surface refused allocation".to_string(),
            ));
        }
        log.calls.push(RasterCall::Initialize);
        Ok(())
    }

    fn set_world_matrix(&mut self, matrix: &Matrix) {
        self.record(RasterCall::WorldMatrix(*matrix));
    }

    fn set_view_matrix(&mut self, matrix: &Matrix) {
        self.record(RasterCall::ViewMatrix(*matrix));
    }

    fn set_projection_matrix(&mut self, matrix: &Matrix) {
        self.record(RasterCall::ProjectionMatrix(*matrix));
    }

    fn add_primitive(&mut self, id: HandleId) -> Result<()> {
        self.record(RasterCall::AddPrimitive(id));
        Ok(())
    }

    fn remove_primitive(&mut self, id: HandleId) -> Result<()> {
        self.record(RasterCall::RemovePrimitive(id));
        Ok(())
    }

    fn add_light(&mut self, id: HandleId, _params: &LightParams) -> Result<()> {
        self.record(RasterCall::AddLight(id));
        Ok(())
    }

    fn remove_light(&mut self, id: HandleId) -> Result<()> {
        self.record(RasterCall::RemoveLight(id));
        Ok(())
    }

    fn add_mesh(&mut self, id: HandleId) -> Result<()> {
        self.record(RasterCall::AddMesh(id));
        Ok(())
    }

    fn remove_mesh(&mut self, id: HandleId) -> Result<()> {
        self.record(RasterCall::RemoveMesh(id));
        Ok(())
    }

    fn set_background_color(&mut self, color: Color) {
        self.record(RasterCall::BackgroundColor(color));
    }

    fn set_background_texture(&mut self, texture: Option<HandleId>) {
        self.record(RasterCall::BackgroundTexture(texture));
    }

    fn set_ambient_light(&mut self, color: Option<Color>) {
        self.record(RasterCall::AmbientLight(color));
    }

    fn set_lighting_enabled(&mut self, enabled: bool) {
        self.record(RasterCall::LightingEnabled(enabled));
    }

    fn set_transformation_enabled(&mut self, enabled: bool) {
        self.record(RasterCall::TransformationEnabled(enabled));
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.record(RasterCall::Resize(width, height));
        Ok(())
    }

    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut log = lock(&self.log);
        if log.fail_draws {
            return Err(SceneError::Rasterizer(format!(
                "headless draw of frame {} failed",
                frame.number
            )));
        }
        log.calls.push(RasterCall::DrawFrame(frame.number));
        log.last_frame = Some(frame.clone());
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.record(RasterCall::Dispose);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_frame(number: u64) -> Frame {
        Frame {
            number,
            world: Matrix::translate(1.0, 0.0, 0.0),
            view: Matrix::identity(),
            projection: Matrix::identity(),
            primitives: Vec::new(),
            meshes: Vec::new(),
            lights: Vec::new(),
            ambient_light: None,
            lighting_enabled: false,
            transformation_enabled: true,
            background_color: Color::BLACK,
            background_texture: None,
        }
    }

    #[test]
    fn test_headless_records_calls() {
        let mut rasterizer = HeadlessRasterizer::new();
        let log = rasterizer.log();

        rasterizer.initialize().unwrap();
        rasterizer.set_lighting_enabled(true);
        rasterizer.draw_frame(&empty_frame(7)).unwrap();

        let log = lock(&log);
        assert_eq!(log.calls[0], RasterCall::Initialize);
        assert_eq!(log.count(&RasterCall::LightingEnabled(true)), 1);
        assert_eq!(log.frames_drawn(), 1);
        assert_eq!(log.last_frame.as_ref().map(|f| f.number), Some(7));
    }

    #[test]
    fn test_headless_failures() {
        let mut rasterizer = HeadlessRasterizer::new();
        {
            let log = rasterizer.log();
            let mut log = lock(&log);
            log.fail_initialize = true;
            log.fail_draws = true;
        }
        assert!(matches!(
            rasterizer.initialize(),
            Err(SceneError::ResourceExhausted(_))
        ));
        assert!(matches!(
            rasterizer.draw_frame(&empty_frame(1)),
            Err(SceneError::Rasterizer(_))
        ));
        assert_eq!(lock(&rasterizer.log()).frames_drawn(), 0);
    }

    #[test]
    fn test_transformation_toggle_drops_world() {
        let mut frame = empty_frame(0);
        assert_eq!(frame.model_view_projection(), Matrix::translate(1.0, 0.0, 0.0));
        frame.transformation_enabled = false;
        assert_eq!(frame.model_view_projection(), Matrix::identity());
    }
}
