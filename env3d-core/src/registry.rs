/// Application-level ownership of environments and primitives
use std::sync::{Arc, Mutex};

use crate::config::SceneConfig;
use crate::environment::Environment3D;
use crate::error::{Result, SceneError};
use crate::lock;
use crate::primitive::{Primitive, RenderMode};
use crate::rasterizer::Rasterizer;

/// Tracks every environment and primitive an application creates so they
/// can be released together at shutdown
#[derive(Default)]
pub struct Registry {
    environments: Mutex<Vec<Arc<Environment3D>>>,
    primitives: Mutex<Vec<Primitive>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_environment(
        &self,
        config: &SceneConfig,
        rasterizer: impl Rasterizer + 'static,
    ) -> Result<Arc<Environment3D>> {
        let environment = Arc::new(Environment3D::new(config, rasterizer)?);
        lock(&self.environments).push(Arc::clone(&environment));
        Ok(environment)
    }

    pub fn create_primitive(&self, render_mode: RenderMode) -> Primitive {
        let primitive = Primitive::new(render_mode);
        self.track_primitive(&primitive);
        primitive
    }

    /// Adopts a primitive built elsewhere, e.g. by `Primitive::create_cube`
    pub fn track_primitive(&self, primitive: &Primitive) {
        let mut primitives = lock(&self.primitives);
        if !primitives.contains(primitive) {
            primitives.push(primitive.clone());
        }
    }

    pub fn environments(&self) -> Vec<Arc<Environment3D>> {
        lock(&self.environments).clone()
    }

    pub fn primitives(&self) -> Vec<Primitive> {
        lock(&self.primitives).clone()
    }

    /// Suspends and disposes every environment, then disposes every primitive
    ///
    /// Failures are logged and skipped. Returns how many resources were
    /// released.
    pub fn shutdown(&self) -> usize {
        let environments = std::mem::take(&mut *lock(&self.environments));
        let primitives = std::mem::take(&mut *lock(&self.primitives));
        let mut released = 0;

        for environment in environments {
            match environment
                .suspend_rendering()
                .and_then(|()| environment.dispose())
            {
                Ok(()) => released += 1,
                Err(SceneError::AlreadyDisposed(_)) => {}
                Err(e) => log::warn!("Failed to dispose environment: {e}"),
            }
        }
        for primitive in primitives {
            match primitive.dispose() {
                Ok(()) => released += 1,
                Err(SceneError::AlreadyDisposed(_)) => {}
                Err(e) => log::warn!("Failed to dispose primitive {}: {e}", primitive.id()),
            }
        }

        log::info!("Shutdown released {released} resources");
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::HeadlessRasterizer;
    use crate::scene::SceneState;

    fn deferred() -> SceneConfig {
        SceneConfig {
            start_rendering: false,
            ..SceneConfig::default()
        }
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let registry = Registry::new();
        let first = registry
            .create_environment(&SceneConfig::default(), HeadlessRasterizer::new())
            .unwrap();
        let second = registry
            .create_environment(&deferred(), HeadlessRasterizer::new())
            .unwrap();
        let primitive = registry.create_primitive(RenderMode::LineList);
        let cube = Primitive::create_cube();
        registry.track_primitive(&cube);
        registry.track_primitive(&cube);
        second.add_primitive(&cube).unwrap();

        assert_eq!(registry.primitives().len(), 2);
        assert_eq!(registry.shutdown(), 4);

        assert_eq!(first.state(), SceneState::Disposed);
        assert_eq!(second.state(), SceneState::Disposed);
        assert!(primitive.is_disposed());
        assert!(cube.is_disposed());
        assert!(registry.environments().is_empty());
        assert_eq!(registry.shutdown(), 0);
    }

    #[test]
    fn test_shutdown_skips_already_disposed() {
        let registry = Registry::new();
        let environment: Arc<Environment3D> = registry
            .create_environment(&deferred(), HeadlessRasterizer::new())
            .unwrap();
        environment.dispose().unwrap();
        let primitive = registry.create_primitive(RenderMode::PointList);
        primitive.dispose().unwrap();

        assert_eq!(registry.shutdown(), 0);
    }
}
