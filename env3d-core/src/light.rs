/// Light sources that can be placed into a scene
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{Result, SceneError};
use crate::geometry::{Color, Vector3D};
use crate::handle::{HandleId, ResourceHandle};
use crate::lock;

/// Light type codes understood by the rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Point = 1,
    Spot = 2,
    Directional = 3,
}

/// Uniform light record handed to the rasterizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub light_type: LightType,
    pub diffuse: Color,
    pub specular: Color,
    pub position: Vector3D,
    pub direction: Vector3D,
}

/// Light with color and direction, but no position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vector3D,
    pub color: Color,
}

impl DirectionalLight {
    pub fn params(&self) -> LightParams {
        LightParams {
            light_type: LightType::Directional,
            diffuse: self.color,
            specular: self.color,
            position: Vector3D::zero(),
            direction: self.direction,
        }
    }
}

/// Light with a position that radiates in all directions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vector3D,
    pub color: Color,
}

impl PointLight {
    pub fn params(&self) -> LightParams {
        LightParams {
            light_type: LightType::Point,
            diffuse: self.color,
            specular: self.color,
            position: self.position,
            direction: Vector3D::zero(),
        }
    }
}

/// Light with color, direction and position emitting a cone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub direction: Vector3D,
    pub position: Vector3D,
    pub color: Color,
}

impl SpotLight {
    pub fn params(&self) -> LightParams {
        LightParams {
            light_type: LightType::Spot,
            diffuse: self.color,
            specular: self.color,
            position: self.position,
            direction: self.direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSource {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl LightSource {
    pub fn params(&self) -> LightParams {
        match self {
            LightSource::Directional(light) => light.params(),
            LightSource::Point(light) => light.params(),
            LightSource::Spot(light) => light.params(),
        }
    }

    pub fn color(&self) -> Color {
        match self {
            LightSource::Directional(light) => light.color,
            LightSource::Point(light) => light.color,
            LightSource::Spot(light) => light.color,
        }
    }
}

struct LightInner {
    handle: ResourceHandle,
    source: Mutex<LightSource>,
}

/// Handle to a light source; clones refer to the same light
#[derive(Clone)]
pub struct Light {
    inner: Arc<LightInner>,
}

impl Light {
    pub fn new(source: LightSource) -> Self {
        Self {
            inner: Arc::new(LightInner {
                handle: ResourceHandle::acquire("Light"),
                source: Mutex::new(source),
            }),
        }
    }

    pub fn directional(direction: Vector3D, color: Color) -> Self {
        Self::new(LightSource::Directional(DirectionalLight { direction, color }))
    }

    pub fn point(position: Vector3D, color: Color) -> Self {
        Self::new(LightSource::Point(PointLight { position, color }))
    }

    pub fn spot(direction: Vector3D, position: Vector3D, color: Color) -> Self {
        Self::new(LightSource::Spot(SpotLight {
            direction,
            position,
            color,
        }))
    }

    pub fn id(&self) -> HandleId {
        self.inner.handle.id()
    }

    pub(crate) fn ensure_live(&self) -> Result<HandleId> {
        self.inner.handle.ensure_live()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.handle.is_disposed()
    }

    pub fn source(&self) -> LightSource {
        *lock(&self.inner.source)
    }

    pub fn color(&self) -> Color {
        lock(&self.inner.source).color()
    }

    pub fn set_color(&self, color: Color) -> Result<()> {
        self.ensure_live()?;
        match &mut *lock(&self.inner.source) {
            LightSource::Directional(light) => light.color = color,
            LightSource::Point(light) => light.color = color,
            LightSource::Spot(light) => light.color = color,
        }
        Ok(())
    }

    /// Fails for point lights, which radiate in all directions
    pub fn set_direction(&self, direction: Vector3D) -> Result<()> {
        self.ensure_live()?;
        match &mut *lock(&self.inner.source) {
            LightSource::Directional(light) => light.direction = direction,
            LightSource::Spot(light) => light.direction = direction,
            LightSource::Point(_) => {
                return Err(SceneError::InvalidArgument(
                    "point lights have no direction".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Fails for directional lights, which have no position
    pub fn set_position(&self, position: Vector3D) -> Result<()> {
        self.ensure_live()?;
        match &mut *lock(&self.inner.source) {
            LightSource::Point(light) => light.position = position,
            LightSource::Spot(light) => light.position = position,
            LightSource::Directional(_) => {
                return Err(SceneError::InvalidArgument(
                    "directional lights have no position".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// The record sent to the rasterizer
    pub fn params(&self) -> Result<LightParams> {
        self.ensure_live()?;
        Ok(lock(&self.inner.source).params())
    }

    pub fn dispose(&self) -> Result<()> {
        self.inner.handle.release().map(|_| ())
    }
}

impl PartialEq for Light {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Light {}

impl fmt::Debug for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Light")
            .field("id", &self.id())
            .field("source", &self.source())
            .finish()
    }
}
