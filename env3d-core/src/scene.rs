/// Scene state guarded by an environment's lock
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::geometry::{Color, Vector3D};
use crate::light::Light;
use crate::mesh::Mesh;
use crate::primitive::Primitive;
use crate::projection::Camera;
use crate::rasterizer::{Frame, Rasterizer};
use crate::texture::Texture;
use crate::transform::Matrix;

/// Lifecycle of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Created but never rendered
    Uninitialized,
    Running,
    Suspended,
    /// Terminal; every mutation fails
    Disposed,
}

/// Returned on listener registration, used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handed to render listeners once per tick
pub struct FrameRenderingEvent<'a> {
    frame_number: u64,
    scene: &'a mut Scene,
}

impl<'a> FrameRenderingEvent<'a> {
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// The scene being rendered, already locked
    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }
}

/// Called before every frame while the scene is running
pub trait RenderListener: Send {
    fn frame_rendering(&mut self, event: &mut FrameRenderingEvent<'_>) -> Result<()>;
}

impl<F> RenderListener for F
where
    F: FnMut(&mut FrameRenderingEvent<'_>) -> Result<()> + Send,
{
    fn frame_rendering(&mut self, event: &mut FrameRenderingEvent<'_>) -> Result<()> {
        self(event)
    }
}

/// A single structural change and the scene it happened in
pub struct ChangeEvent<'a, T> {
    pub source: &'a Scene,
    pub entity: &'a T,
}

/// Notified after primitives, meshes or lights are added or removed
#[allow(unused_variables)]
pub trait ChangeListener: Send {
    fn primitive_added(&mut self, event: &ChangeEvent<'_, Primitive>) {}
    fn primitive_removed(&mut self, event: &ChangeEvent<'_, Primitive>) {}
    fn mesh_added(&mut self, event: &ChangeEvent<'_, Mesh>) {}
    fn mesh_removed(&mut self, event: &ChangeEvent<'_, Mesh>) {}
    fn light_added(&mut self, event: &ChangeEvent<'_, Light>) {}
    fn light_removed(&mut self, event: &ChangeEvent<'_, Light>) {}
}

/// Everything an environment renders, plus who is listening
pub struct Scene {
    state: SceneState,
    rasterizer: Box<dyn Rasterizer>,
    camera: Camera,
    world: Matrix,
    lighting_enabled: bool,
    transformation_enabled: bool,
    ambient_light: Option<Color>,
    background_color: Option<Color>,
    background_texture: Option<Texture>,
    primitives: Vec<Primitive>,
    meshes: Vec<Mesh>,
    lights: Vec<Light>,
    render_listeners: Vec<(ListenerId, Box<dyn RenderListener>)>,
    change_listeners: Vec<(ListenerId, Box<dyn ChangeListener>)>,
    next_listener: u64,
    rendering_error: bool,
    frame_number: u64,
}

impl Scene {
    /// Initializes `rasterizer` and pushes the configured state to it
    pub fn new(config: &SceneConfig, mut rasterizer: Box<dyn Rasterizer>) -> Result<Self> {
        config.validate()?;
        let camera = Camera::new(
            config.eye_point,
            config.look_at_point,
            config.field_of_view,
            config.aspect_ratio,
            config.near_clip,
            config.far_clip,
        )?;

        rasterizer.initialize().map_err(|e| match e {
            SceneError::ResourceExhausted(_) => e,
            other => SceneError::ResourceExhausted(other.to_string()),
        })?;

        let world = Matrix::identity();
        rasterizer.set_world_matrix(&world);
        rasterizer.set_view_matrix(&camera.view_matrix());
        rasterizer.set_projection_matrix(&camera.projection_matrix());
        rasterizer.set_lighting_enabled(config.lighting_enabled);
        rasterizer.set_transformation_enabled(config.transformation_enabled);
        rasterizer.set_ambient_light(config.ambient_light);
        rasterizer.set_background_color(config.background);

        Ok(Self {
            state: SceneState::Uninitialized,
            rasterizer,
            camera,
            world,
            lighting_enabled: config.lighting_enabled,
            transformation_enabled: config.transformation_enabled,
            ambient_light: config.ambient_light,
            background_color: Some(config.background),
            background_texture: None,
            primitives: Vec::new(),
            meshes: Vec::new(),
            lights: Vec::new(),
            render_listeners: Vec::new(),
            change_listeners: Vec::new(),
            next_listener: 0,
            rendering_error: false,
            frame_number: 0,
        })
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    fn ensure_live(&self) -> Result<()> {
        match self.state {
            SceneState::Disposed => Err(SceneError::AlreadyDisposed("Environment3D")),
            _ => Ok(()),
        }
    }

    pub(crate) fn set_state(&mut self, state: SceneState) {
        log::info!("Scene {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Enters `Disposed` and releases the rasterizer
    pub(crate) fn dispose(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.set_state(SceneState::Disposed);
        self.render_listeners.clear();
        self.change_listeners.clear();
        self.rasterizer.dispose()
    }

    // Structural changes

    pub fn add_primitive(&mut self, primitive: &Primitive) -> Result<()> {
        self.ensure_live()?;
        let id = primitive.ensure_live()?;
        if self.primitives.contains(primitive) {
            return Err(SceneError::InvalidArgument(format!(
                "primitive {id} is already in the scene"
            )));
        }
        self.rasterizer.add_primitive(id)?;
        self.primitives.push(primitive.clone());
        log::debug!("Added primitive {id}");
        self.notify(|listener, source| {
            listener.primitive_added(&ChangeEvent { source, entity: primitive })
        });
        Ok(())
    }

    pub fn remove_primitive(&mut self, primitive: &Primitive) -> Result<()> {
        self.ensure_live()?;
        let Some(index) = self.primitives.iter().position(|p| p == primitive) else {
            log::debug!("Primitive {} not in scene, nothing to remove", primitive.id());
            return Ok(());
        };
        self.rasterizer.remove_primitive(primitive.id())?;
        self.primitives.remove(index);
        log::debug!("Removed primitive {}", primitive.id());
        self.notify(|listener, source| {
            listener.primitive_removed(&ChangeEvent { source, entity: primitive })
        });
        Ok(())
    }

    pub fn add_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        self.ensure_live()?;
        let id = mesh.ensure_live()?;
        if self.meshes.contains(mesh) {
            return Err(SceneError::InvalidArgument(format!(
                "mesh {id} is already in the scene"
            )));
        }
        self.rasterizer.add_mesh(id)?;
        self.meshes.push(mesh.clone());
        log::debug!("Added mesh {id}");
        self.notify(|listener, source| {
            listener.mesh_added(&ChangeEvent { source, entity: mesh })
        });
        Ok(())
    }

    pub fn remove_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        self.ensure_live()?;
        let Some(index) = self.meshes.iter().position(|m| m == mesh) else {
            log::debug!("Mesh {} not in scene, nothing to remove", mesh.id());
            return Ok(());
        };
        self.rasterizer.remove_mesh(mesh.id())?;
        self.meshes.remove(index);
        log::debug!("Removed mesh {}", mesh.id());
        self.notify(|listener, source| {
            listener.mesh_removed(&ChangeEvent { source, entity: mesh })
        });
        Ok(())
    }

    pub fn add_light(&mut self, light: &Light) -> Result<()> {
        self.ensure_live()?;
        let params = light.params()?;
        if self.lights.contains(light) {
            return Err(SceneError::InvalidArgument(format!(
                "light {} is already in the scene",
                light.id()
            )));
        }
        self.rasterizer.add_light(light.id(), &params)?;
        self.lights.push(light.clone());
        log::debug!("Added {:?} light {}", params.light_type, light.id());
        self.notify(|listener, source| {
            listener.light_added(&ChangeEvent { source, entity: light })
        });
        Ok(())
    }

    pub fn remove_light(&mut self, light: &Light) -> Result<()> {
        self.ensure_live()?;
        let Some(index) = self.lights.iter().position(|l| l == light) else {
            log::debug!("Light {} not in scene, nothing to remove", light.id());
            return Ok(());
        };
        self.rasterizer.remove_light(light.id())?;
        self.lights.remove(index);
        log::debug!("Removed light {}", light.id());
        self.notify(|listener, source| {
            listener.light_removed(&ChangeEvent { source, entity: light })
        });
        Ok(())
    }

    /// Fires `f` for every change listener in registration order
    ///
    /// A panicking listener is logged and skipped; the rest still run and the
    /// listener list is always restored.
    fn notify(&mut self, mut f: impl FnMut(&mut Box<dyn ChangeListener>, &Scene)) {
        let mut listeners = std::mem::take(&mut self.change_listeners);
        for (id, listener) in listeners.iter_mut() {
            let source: &Scene = self;
            if panic::catch_unwind(AssertUnwindSafe(|| f(listener, source))).is_err() {
                log::error!("Change listener {id:?} panicked");
            }
        }
        listeners.append(&mut self.change_listeners);
        self.change_listeners = listeners;
    }

    pub fn primitives(&self) -> Vec<Primitive> {
        self.primitives.clone()
    }

    pub fn meshes(&self) -> Vec<Mesh> {
        self.meshes.clone()
    }

    pub fn lights(&self) -> Vec<Light> {
        self.lights.clone()
    }

    pub fn contains_primitive(&self, primitive: &Primitive) -> bool {
        self.primitives.contains(primitive)
    }

    // Camera

    pub fn set_view(&mut self, eye: Vector3D, look_at: Vector3D) -> Result<()> {
        self.ensure_live()?;
        let view = self.camera.set_view(eye, look_at)?;
        self.rasterizer.set_view_matrix(&view);
        Ok(())
    }

    pub fn set_eye_point(&mut self, eye: Vector3D) -> Result<()> {
        self.ensure_live()?;
        let view = self.camera.set_eye(eye)?;
        self.rasterizer.set_view_matrix(&view);
        Ok(())
    }

    pub fn set_look_at_point(&mut self, look_at: Vector3D) -> Result<()> {
        self.ensure_live()?;
        let view = self.camera.set_look_at(look_at)?;
        self.rasterizer.set_view_matrix(&view);
        Ok(())
    }

    pub fn set_field_of_view(&mut self, fov: f32) -> Result<()> {
        self.ensure_live()?;
        let projection = self.camera.set_fov(fov)?;
        self.rasterizer.set_projection_matrix(&projection);
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) -> Result<()> {
        self.ensure_live()?;
        let projection = self.camera.set_aspect(aspect)?;
        self.rasterizer.set_projection_matrix(&projection);
        Ok(())
    }

    pub fn set_near_clip(&mut self, near: f32) -> Result<()> {
        self.ensure_live()?;
        let projection = self.camera.set_near(near)?;
        self.rasterizer.set_projection_matrix(&projection);
        Ok(())
    }

    pub fn set_far_clip(&mut self, far: f32) -> Result<()> {
        self.ensure_live()?;
        let projection = self.camera.set_far(far)?;
        self.rasterizer.set_projection_matrix(&projection);
        Ok(())
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn eye_point(&self) -> Vector3D {
        self.camera.eye()
    }

    pub fn look_at_point(&self) -> Vector3D {
        self.camera.look_at()
    }

    pub fn field_of_view(&self) -> f32 {
        self.camera.fov()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.camera.aspect()
    }

    pub fn near_clip(&self) -> f32 {
        self.camera.near()
    }

    pub fn far_clip(&self) -> f32 {
        self.camera.far()
    }

    pub fn view_transform(&self) -> Matrix {
        self.camera.view_matrix()
    }

    pub fn projection_transform(&self) -> Matrix {
        self.camera.projection_matrix()
    }

    // World and rendering options

    /// Replaces the world transform; not cumulative
    pub fn set_world_transform(&mut self, world: Matrix) -> Result<()> {
        self.ensure_live()?;
        self.world = world;
        self.rasterizer.set_world_matrix(&world);
        Ok(())
    }

    pub fn world_transform(&self) -> Matrix {
        self.world
    }

    pub fn set_lighting_enabled(&mut self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        self.lighting_enabled = enabled;
        self.rasterizer.set_lighting_enabled(enabled);
        Ok(())
    }

    pub fn is_lighting_enabled(&self) -> bool {
        self.lighting_enabled
    }

    pub fn set_transformation_enabled(&mut self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        self.transformation_enabled = enabled;
        self.rasterizer.set_transformation_enabled(enabled);
        Ok(())
    }

    pub fn is_transformation_enabled(&self) -> bool {
        self.transformation_enabled
    }

    /// `None` switches ambient light off
    pub fn set_ambient_light(&mut self, color: Option<Color>) -> Result<()> {
        self.ensure_live()?;
        self.ambient_light = color;
        self.rasterizer.set_ambient_light(color);
        Ok(())
    }

    pub fn ambient_light(&self) -> Option<Color> {
        self.ambient_light
    }

    /// `None` resets the background to black
    pub fn set_background_color(&mut self, color: Option<Color>) -> Result<()> {
        self.ensure_live()?;
        self.background_color = color;
        self.rasterizer.set_background_color(self.background_color());
        Ok(())
    }

    pub fn background_color(&self) -> Color {
        self.background_color.unwrap_or(Color::BLACK)
    }

    pub fn set_background_texture(&mut self, texture: Option<&Texture>) -> Result<()> {
        self.ensure_live()?;
        let id = texture.map(Texture::ensure_live).transpose()?;
        self.background_texture = texture.cloned();
        self.rasterizer.set_background_texture(id);
        Ok(())
    }

    pub fn background_texture(&self) -> Option<Texture> {
        self.background_texture.clone()
    }

    /// Forwards a new backbuffer size
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.ensure_live()?;
        if width == 0 || height == 0 {
            return Err(SceneError::InvalidArgument(format!(
                "cannot resize to {width} x {height}"
            )));
        }
        self.rasterizer.resize(width, height)
    }

    // Listeners

    fn next_listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    pub(crate) fn add_render_listener(&mut self, listener: Box<dyn RenderListener>) -> Result<ListenerId> {
        self.ensure_live()?;
        let id = self.next_listener_id();
        self.render_listeners.push((id, listener));
        Ok(id)
    }

    pub(crate) fn remove_render_listener(&mut self, id: ListenerId) -> bool {
        let before = self.render_listeners.len();
        self.render_listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.render_listeners.len()
    }

    pub(crate) fn add_change_listener(&mut self, listener: Box<dyn ChangeListener>) -> Result<ListenerId> {
        self.ensure_live()?;
        let id = self.next_listener_id();
        self.change_listeners.push((id, listener));
        Ok(id)
    }

    pub(crate) fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.change_listeners.len();
        self.change_listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.change_listeners.len()
    }

    // Rendering

    pub fn has_rendering_error(&self) -> bool {
        self.rendering_error
    }

    /// Lets painting resume after a failed frame
    pub fn clear_rendering_error(&mut self) {
        self.rendering_error = false;
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Runs one render tick: notifies render listeners, then draws
    ///
    /// Returns whether a frame reached the rasterizer. Failures are logged
    /// and latch the rendering error, which skips every later paint until
    /// cleared.
    pub fn paint(&mut self) -> bool {
        if self.state != SceneState::Running || self.rendering_error {
            return false;
        }
        self.frame_number += 1;
        let frame_number = self.frame_number;

        if let Err(e) = self.notify_render_listeners(frame_number) {
            log::error!("Frame {frame_number} aborted: {e}");
            self.rendering_error = true;
            return false;
        }
        // A listener may have stopped the scene through the event
        if self.state != SceneState::Running {
            return false;
        }

        let frame = self.build_frame(frame_number);
        match self.rasterizer.draw_frame(&frame) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Frame {frame_number} failed to draw: {e}");
                self.rendering_error = true;
                false
            }
        }
    }

    fn notify_render_listeners(&mut self, frame_number: u64) -> Result<()> {
        let mut listeners = std::mem::take(&mut self.render_listeners);
        let mut outcome = Ok(());
        for (id, listener) in listeners.iter_mut() {
            let mut event = FrameRenderingEvent {
                frame_number,
                scene: &mut *self,
            };
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.frame_rendering(&mut event)
            }));
            outcome = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => Err(SceneError::Listener(format!("listener {id:?}: {e}"))),
                Err(_) => Err(SceneError::Listener(format!("listener {id:?} panicked"))),
            };
            break;
        }
        listeners.append(&mut self.render_listeners);
        self.render_listeners = listeners;
        outcome
    }

    fn build_frame(&self, number: u64) -> Frame {
        let primitives = self
            .primitives
            .iter()
            .filter_map(|primitive| match primitive.snapshot() {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    log::debug!("Leaving primitive {} out of the frame: {e}", primitive.id());
                    None
                }
            })
            .collect();
        let meshes = self
            .meshes
            .iter()
            .filter_map(|mesh| mesh.snapshot().ok())
            .collect();
        let lights = self
            .lights
            .iter()
            .filter_map(|light| light.params().ok())
            .collect();

        Frame {
            number,
            world: self.world,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            primitives,
            meshes,
            lights,
            ambient_light: self.ambient_light,
            lighting_enabled: self.lighting_enabled,
            transformation_enabled: self.transformation_enabled,
            background_color: self.background_color(),
            background_texture: self.background_texture.as_ref().map(Texture::id),
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("state", &self.state)
            .field("primitives", &self.primitives.len())
            .field("meshes", &self.meshes.len())
            .field("lights", &self.lights.len())
            .field("frame_number", &self.frame_number)
            .field("rendering_error", &self.rendering_error)
            .finish()
    }
}
