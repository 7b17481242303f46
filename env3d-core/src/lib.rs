/// env3d core library - scene model and render loop
///
/// This library provides the 3D scene container: matrix math, primitives,
/// lights, meshes, the `Environment3D` render loop and the rasterizer
/// boundary it draws through.

pub mod config;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod light;
pub mod mesh;
pub mod primitive;
pub mod projection;
pub mod rasterizer;
pub mod registry;
pub mod scene;
pub mod stl;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use config::SceneConfig;
pub use environment::Environment3D;
pub use error::{ConfigError, Result, SceneError};
pub use geometry::{Color, Triangle, Vector3D, Vertex};
pub use handle::HandleId;
pub use light::{Light, LightParams, LightSource, LightType};
pub use mesh::Mesh;
pub use primitive::{Material, Primitive, RenderMode};
pub use projection::Camera;
pub use rasterizer::{Frame, HeadlessRasterizer, Rasterizer};
pub use registry::Registry;
pub use scene::{
    ChangeEvent, ChangeListener, FrameRenderingEvent, ListenerId, RenderListener, Scene, SceneState,
};
pub use texture::Texture;
pub use transform::Matrix;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
