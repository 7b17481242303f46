/// A renderable 3D environment and the task that ticks it
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::geometry::{Color, Vector3D};
use crate::light::Light;
use crate::lock;
use crate::mesh::Mesh;
use crate::primitive::Primitive;
use crate::rasterizer::Rasterizer;
use crate::scene::{ChangeListener, ListenerId, RenderListener, Scene, SceneState};
use crate::texture::Texture;
use crate::transform::Matrix;

/// Background thread painting a scene at a fixed period
struct RenderTask {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl RenderTask {
    fn spawn(scene: Weak<Mutex<Scene>>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("env3d-render".to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + interval;
                loop {
                    match stopped.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(scene) = scene.upgrade() else {
                        break;
                    };
                    lock(&scene).paint();
                    drop(scene);

                    deadline += interval;
                    let now = Instant::now();
                    if deadline < now {
                        // Fell behind; drop the missed ticks
                        deadline = now + interval;
                    }
                }
                log::debug!("Render task stopped");
            })
            .map_err(|e| SceneError::ResourceExhausted(format!("render thread: {e}")))?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        // The receiver may already be gone if the scene was dropped
        let _ = self.stop.send(());
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            log::error!("Render task panicked");
        }
    }
}

/// A scene plus the periodic task that renders it
///
/// Every method locks the scene for its duration, serializing callers
/// against each other and against the render tick. Listeners run under that
/// same lock: they must act through the event they receive and never call
/// back into their environment.
pub struct Environment3D {
    scene: Arc<Mutex<Scene>>,
    task: Mutex<Option<RenderTask>>,
    tick_interval: Duration,
}

impl Environment3D {
    /// Creates the environment, rendering immediately when
    /// `config.start_rendering` is set
    pub fn new(config: &SceneConfig, rasterizer: impl Rasterizer + 'static) -> Result<Self> {
        let scene = Scene::new(config, Box::new(rasterizer))?;
        let environment = Self {
            scene: Arc::new(Mutex::new(scene)),
            task: Mutex::new(None),
            tick_interval: config.tick_interval(),
        };
        log::info!("Environment created, ticking every {:?}", environment.tick_interval);
        if config.start_rendering {
            environment.resume_rendering()?;
        }
        Ok(environment)
    }

    pub fn with_defaults(rasterizer: impl Rasterizer + 'static) -> Result<Self> {
        Self::new(&SceneConfig::default(), rasterizer)
    }

    /// Locks the scene for a batch of changes
    ///
    /// The lock is not reentrant. While the guard is alive, work through the
    /// returned `Scene`; calling any `Environment3D` method on this
    /// environment deadlocks, and the render tick waits until the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, Scene> {
        lock(&self.scene)
    }

    pub fn state(&self) -> SceneState {
        self.lock().state()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    // Lifecycle

    /// Starts the render tick; no-op while running
    pub fn resume_rendering(&self) -> Result<()> {
        let mut task = lock(&self.task);
        {
            let mut scene = self.lock();
            match scene.state() {
                SceneState::Disposed => return Err(SceneError::AlreadyDisposed("Environment3D")),
                SceneState::Running => return Ok(()),
                SceneState::Uninitialized | SceneState::Suspended => {}
            }
            scene.set_state(SceneState::Running);
        }
        match RenderTask::spawn(Arc::downgrade(&self.scene), self.tick_interval) {
            Ok(spawned) => {
                *task = Some(spawned);
                Ok(())
            }
            Err(e) => {
                self.lock().set_state(SceneState::Suspended);
                Err(e)
            }
        }
    }

    /// Stops the render tick; no-op unless running
    pub fn suspend_rendering(&self) -> Result<()> {
        let mut task = lock(&self.task);
        {
            let mut scene = self.lock();
            match scene.state() {
                SceneState::Disposed => return Err(SceneError::AlreadyDisposed("Environment3D")),
                SceneState::Running => scene.set_state(SceneState::Suspended),
                SceneState::Uninitialized | SceneState::Suspended => return Ok(()),
            }
        }
        if let Some(running) = task.take() {
            running.stop();
        }
        Ok(())
    }

    pub fn is_rendering(&self) -> bool {
        self.state() == SceneState::Running
    }

    /// Stops rendering and releases the rasterizer; fails when called twice
    pub fn dispose(&self) -> Result<()> {
        let mut task = lock(&self.task);
        let result = self.lock().dispose();
        if let Some(running) = task.take() {
            running.stop();
        }
        result
    }

    /// Paints one frame outside the tick, unless a rendering error is latched
    pub fn paint(&self) -> bool {
        self.lock().paint()
    }

    pub fn has_rendering_error(&self) -> bool {
        self.lock().has_rendering_error()
    }

    pub fn clear_rendering_error(&self) {
        self.lock().clear_rendering_error();
    }

    // Listeners

    pub fn add_render_listener(&self, listener: impl RenderListener + 'static) -> Result<ListenerId> {
        self.lock().add_render_listener(Box::new(listener))
    }

    /// Returns whether a listener with `id` was registered
    pub fn remove_render_listener(&self, id: ListenerId) -> bool {
        self.lock().remove_render_listener(id)
    }

    pub fn add_change_listener(&self, listener: impl ChangeListener + 'static) -> Result<ListenerId> {
        self.lock().add_change_listener(Box::new(listener))
    }

    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.lock().remove_change_listener(id)
    }

    // Scene contents

    pub fn add_primitive(&self, primitive: &Primitive) -> Result<()> {
        self.lock().add_primitive(primitive)
    }

    pub fn remove_primitive(&self, primitive: &Primitive) -> Result<()> {
        self.lock().remove_primitive(primitive)
    }

    pub fn primitives(&self) -> Vec<Primitive> {
        self.lock().primitives()
    }

    pub fn add_mesh(&self, mesh: &Mesh) -> Result<()> {
        self.lock().add_mesh(mesh)
    }

    pub fn remove_mesh(&self, mesh: &Mesh) -> Result<()> {
        self.lock().remove_mesh(mesh)
    }

    pub fn meshes(&self) -> Vec<Mesh> {
        self.lock().meshes()
    }

    pub fn add_light(&self, light: &Light) -> Result<()> {
        self.lock().add_light(light)
    }

    pub fn remove_light(&self, light: &Light) -> Result<()> {
        self.lock().remove_light(light)
    }

    pub fn lights(&self) -> Vec<Light> {
        self.lock().lights()
    }

    // Camera

    pub fn set_view(&self, eye: Vector3D, look_at: Vector3D) -> Result<()> {
        self.lock().set_view(eye, look_at)
    }

    pub fn set_eye_point(&self, eye: Vector3D) -> Result<()> {
        self.lock().set_eye_point(eye)
    }

    pub fn eye_point(&self) -> Vector3D {
        self.lock().eye_point()
    }

    pub fn set_look_at_point(&self, look_at: Vector3D) -> Result<()> {
        self.lock().set_look_at_point(look_at)
    }

    pub fn look_at_point(&self) -> Vector3D {
        self.lock().look_at_point()
    }

    pub fn set_field_of_view(&self, fov: f32) -> Result<()> {
        self.lock().set_field_of_view(fov)
    }

    pub fn field_of_view(&self) -> f32 {
        self.lock().field_of_view()
    }

    pub fn set_aspect_ratio(&self, aspect: f32) -> Result<()> {
        self.lock().set_aspect_ratio(aspect)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.lock().aspect_ratio()
    }

    pub fn set_near_clip(&self, near: f32) -> Result<()> {
        self.lock().set_near_clip(near)
    }

    pub fn near_clip(&self) -> f32 {
        self.lock().near_clip()
    }

    pub fn set_far_clip(&self, far: f32) -> Result<()> {
        self.lock().set_far_clip(far)
    }

    pub fn far_clip(&self) -> f32 {
        self.lock().far_clip()
    }

    pub fn view_transform(&self) -> Matrix {
        self.lock().view_transform()
    }

    pub fn projection_transform(&self) -> Matrix {
        self.lock().projection_transform()
    }

    // World and rendering options

    pub fn set_world_transform(&self, world: Matrix) -> Result<()> {
        self.lock().set_world_transform(world)
    }

    pub fn world_transform(&self) -> Matrix {
        self.lock().world_transform()
    }

    pub fn set_lighting_enabled(&self, enabled: bool) -> Result<()> {
        self.lock().set_lighting_enabled(enabled)
    }

    pub fn is_lighting_enabled(&self) -> bool {
        self.lock().is_lighting_enabled()
    }

    pub fn set_transformation_enabled(&self, enabled: bool) -> Result<()> {
        self.lock().set_transformation_enabled(enabled)
    }

    pub fn is_transformation_enabled(&self) -> bool {
        self.lock().is_transformation_enabled()
    }

    pub fn set_ambient_light(&self, color: Option<Color>) -> Result<()> {
        self.lock().set_ambient_light(color)
    }

    pub fn ambient_light(&self) -> Option<Color> {
        self.lock().ambient_light()
    }

    pub fn set_background_color(&self, color: Option<Color>) -> Result<()> {
        self.lock().set_background_color(color)
    }

    pub fn background_color(&self) -> Color {
        self.lock().background_color()
    }

    pub fn set_background_texture(&self, texture: Option<&Texture>) -> Result<()> {
        self.lock().set_background_texture(texture)
    }

    pub fn background_texture(&self) -> Option<Texture> {
        self.lock().background_texture()
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.lock().resize(width, height)
    }
}

impl Drop for Environment3D {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = task {
            running.stop();
        }
    }
}
