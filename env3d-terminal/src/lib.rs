/// Terminal front end for env3d: renders an `Environment3D` as ASCII art
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{self},
};
use env3d_core::{
    Color, ConfigError, Environment3D, FrameRenderingEvent, Light, Matrix, Mesh, Primitive, Registry,
    RenderListener, SceneConfig, SceneError, Vector3D,
};
use std::f32::consts::TAU;
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod rasterizer;
pub mod renderer;

pub use rasterizer::TerminalRasterizer;
pub use renderer::AsciiRenderer;

/// Errors that end the terminal app
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Terminal error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Render listener spinning the whole scene a little further every frame
pub struct ObjectRotator {
    base: Matrix,
    yaw: f32,
    pitch: f32,
    roll: f32,
    step: (f32, f32, f32),
}

impl ObjectRotator {
    /// Per-frame increments in radians
    pub fn new(yaw_step: f32, pitch_step: f32, roll_step: f32) -> Self {
        Self {
            base: Matrix::identity(),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            step: (yaw_step, pitch_step, roll_step),
        }
    }

    /// Transform applied before the rotation, e.g. to center a model
    pub fn with_base(mut self, base: Matrix) -> Self {
        self.base = base;
        self
    }
}

impl RenderListener for ObjectRotator {
    fn frame_rendering(&mut self, event: &mut FrameRenderingEvent<'_>) -> env3d_core::Result<()> {
        self.yaw = (self.yaw + self.step.0) % TAU;
        self.pitch = (self.pitch + self.step.1) % TAU;
        self.roll = (self.roll + self.step.2) % TAU;
        let rotation = Matrix::rotation_yaw_pitch_roll(self.yaw, self.pitch, self.roll);
        event.scene().set_world_transform(self.base * rotation)
    }
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    registry: Registry,
    environment: Arc<Environment3D>,
    start_rendering: bool,
    running: bool,
}

impl TerminalApp {
    /// A spinning cube
    pub fn new(config: &SceneConfig) -> Result<Self, AppError> {
        let app = Self::empty(config)?;
        let cube = Primitive::create_cube();
        app.registry.track_primitive(&cube);
        app.environment.add_primitive(&cube)?;
        app.environment.add_render_listener(ObjectRotator::new(0.02, 0.013, 0.0))?;
        Ok(app)
    }

    /// A spinning mesh, scaled to fit the view
    pub fn with_mesh(config: &SceneConfig, mesh: &Mesh) -> Result<Self, AppError> {
        let app = Self::empty(config)?;
        app.environment.add_mesh(mesh)?;
        app.environment
            .add_render_listener(ObjectRotator::new(0.02, 0.013, 0.0).with_base(fit_to_unit(mesh)))?;
        Ok(app)
    }

    fn empty(config: &SceneConfig) -> Result<Self, AppError> {
        let (columns, rows) = terminal::size()?;
        // Rendering starts in `run`, once the alternate screen is up
        let scene_config = SceneConfig {
            start_rendering: false,
            aspect_ratio: cell_aspect(columns, rows.saturating_sub(1)),
            ..config.clone()
        };

        let registry = Registry::new();
        let environment = registry.create_environment(
            &scene_config,
            TerminalRasterizer::new(stdout(), columns, rows),
        )?;
        environment.add_light(&Light::directional(Vector3D::new(0.5, -1.0, 1.0), Color::WHITE))?;

        Ok(Self {
            registry,
            environment,
            start_rendering: config.start_rendering,
            running: true,
        })
    }

    pub fn environment(&self) -> &Arc<Environment3D> {
        &self.environment
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // The render task must be gone before the terminal is restored
        let released = self.registry.shutdown();
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        log::info!("Released {released} resources on exit");

        result
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        if self.start_rendering {
            self.environment.resume_rendering()?;
        }

        while self.running {
            if !event::poll(Duration::from_millis(50))? {
                continue;
            }
            match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press,
                    ..
                }) => self.handle_key(code)?,
                Event::Resize(columns, rows) => self.handle_resize(columns, rows),
                _ => {}
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<(), AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('w') | KeyCode::Up => self.move_camera(|eye, look_at| dolly(eye, look_at, 0.8)),
            KeyCode::Char('s') | KeyCode::Down => self.move_camera(|eye, look_at| dolly(eye, look_at, 1.25)),
            KeyCode::Char('a') | KeyCode::Left => self.move_camera(|eye, look_at| orbit(eye, look_at, -0.1)),
            KeyCode::Char('d') | KeyCode::Right => self.move_camera(|eye, look_at| orbit(eye, look_at, 0.1)),
            KeyCode::Char('l') => {
                let enabled = self.environment.is_lighting_enabled();
                self.environment.set_lighting_enabled(!enabled)?;
            }
            KeyCode::Char(' ') => {
                if self.environment.is_rendering() {
                    self.environment.suspend_rendering()?;
                } else {
                    self.environment.resume_rendering()?;
                }
            }
            KeyCode::Char('c') => self.environment.clear_rendering_error(),
            _ => {}
        }
        Ok(())
    }

    /// Moves the eye under a single lock so the tick never sees half a move
    fn move_camera(&self, next_eye: impl FnOnce(Vector3D, Vector3D) -> Vector3D) {
        let mut scene = self.environment.lock();
        let eye = next_eye(scene.eye_point(), scene.look_at_point());
        if let Err(e) = scene.set_eye_point(eye) {
            log::warn!("Camera move rejected: {e}");
        }
    }

    fn handle_resize(&self, columns: u16, rows: u16) {
        let mut scene = self.environment.lock();
        let result = scene
            .resize(u32::from(columns), u32::from(rows))
            .and_then(|()| scene.set_aspect_ratio(cell_aspect(columns, rows.saturating_sub(1))));
        if let Err(e) = result {
            log::warn!("Ignoring resize to {columns} x {rows}: {e}");
        }
    }
}

/// Aspect ratio that keeps shapes square on cells twice as tall as wide
fn cell_aspect(columns: u16, rows: u16) -> f32 {
    if columns == 0 || rows == 0 {
        return 1.0;
    }
    2.0 * f32::from(rows) / f32::from(columns)
}

/// Moves `eye` towards (`factor` < 1) or away from `look_at`
fn dolly(eye: Vector3D, look_at: Vector3D, factor: f32) -> Vector3D {
    look_at + (eye - look_at) * factor
}

/// Swings `eye` around the vertical axis through `look_at`
fn orbit(eye: Vector3D, look_at: Vector3D, angle: f32) -> Vector3D {
    Matrix::rotation_y(angle).transform_point(eye - look_at) + look_at
}

/// Centers `mesh` on the origin and scales it into the unit sphere
fn fit_to_unit(mesh: &Mesh) -> Matrix {
    let points = || mesh.triangles().iter().flat_map(|t| t.positions);
    let count = points().count();
    if count == 0 {
        return Matrix::identity();
    }
    let center = points().fold(Vector3D::zero(), |sum, p| sum + p) * (1.0 / count as f32);
    let radius = points().map(|p| (p - center).length()).fold(0.0, f32::max);
    if radius <= f32::EPSILON {
        return Matrix::translate(-center.x, -center.y, -center.z);
    }
    let scale = 1.0 / radius;
    Matrix::translate(-center.x, -center.y, -center.z) * Matrix::scale(scale, scale, scale)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use env3d_core::{Frame, HeadlessRasterizer};

    /// Paints one frame of a fresh scene through a headless rasterizer
    pub(crate) fn frame_with(
        primitives: &[Primitive],
        meshes: &[Mesh],
        setup: impl FnOnce(&Environment3D),
    ) -> Frame {
        let config = SceneConfig {
            tick_interval_ms: 60_000,
            ..SceneConfig::default()
        };
        let rasterizer = HeadlessRasterizer::new();
        let log = rasterizer.log();
        let environment = Environment3D::new(&config, rasterizer).unwrap();
        for primitive in primitives {
            environment.add_primitive(primitive).unwrap();
        }
        for mesh in meshes {
            environment.add_mesh(mesh).unwrap();
        }
        setup(&environment);
        assert!(environment.paint());

        let frame = log.lock().unwrap().last_frame.clone().unwrap();
        frame
    }

    #[test]
    fn test_rotator_accumulates_yaw_pitch_roll() {
        let config = SceneConfig {
            tick_interval_ms: 60_000,
            ..SceneConfig::default()
        };
        let environment = Environment3D::new(&config, HeadlessRasterizer::new()).unwrap();
        let base = Matrix::translate(1.0, 0.0, 0.0);
        environment
            .add_render_listener(ObjectRotator::new(0.1, 0.2, 0.3).with_base(base))
            .unwrap();

        assert!(environment.paint());
        assert!(environment.paint());
        let expected = base * Matrix::rotation_yaw_pitch_roll(0.2, 0.4, 0.6);
        assert_relative_eq!(environment.world_transform(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_dolly_and_orbit_keep_look_at() {
        let look_at = Vector3D::new(0.0, 1.0, 0.0);
        let eye = Vector3D::new(0.0, 1.0, -10.0);

        let closer = dolly(eye, look_at, 0.5);
        assert_relative_eq!(closer.z, -5.0);

        let swung = orbit(eye, look_at, std::f32::consts::FRAC_PI_2);
        assert_relative_eq!((swung - look_at).length(), 10.0, epsilon = 1e-4);
        assert_relative_eq!(swung.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(swung.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_cell_aspect() {
        assert_relative_eq!(cell_aspect(80, 40), 1.0);
        assert_relative_eq!(cell_aspect(0, 40), 1.0);
    }

    #[test]
    fn test_fit_to_unit() {
        let mesh = Mesh::create_box(10.0, 10.0, 10.0).unwrap();
        let fit = fit_to_unit(&mesh);
        for triangle in mesh.triangles() {
            for position in triangle.positions {
                assert!(fit.transform_point(position).length() <= 1.0 + 1e-5);
            }
        }
    }
}
