/// Scene configuration
use std::f32::consts::{FRAC_PI_4, PI};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{Color, Vector3D};

/// Initial state of an environment, loadable from TOML
///
/// Missing keys fall back to [`SceneConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Start the render tick immediately instead of waiting for a resume
    pub start_rendering: bool,
    pub tick_interval_ms: u64,
    pub eye_point: Vector3D,
    pub look_at_point: Vector3D,
    /// Vertical field of view in radians
    pub field_of_view: f32,
    pub aspect_ratio: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub lighting_enabled: bool,
    pub transformation_enabled: bool,
    pub background: Color,
    pub ambient_light: Option<Color>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            start_rendering: true,
            tick_interval_ms: 15,
            eye_point: Vector3D::new(0.0, 0.0, -5.0),
            look_at_point: Vector3D::zero(),
            field_of_view: FRAC_PI_4,
            aspect_ratio: 1.0,
            near_clip: 1.0,
            far_clip: 100.0,
            lighting_enabled: false,
            transformation_enabled: true,
            background: Color::BLACK,
            ambient_light: None,
        }
    }
}

impl SceneConfig {
    /// Load and validate a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Checks the values a scene cannot start from
    ///
    /// Camera degeneracy is left to the view and projection builders, which
    /// report it in more detail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < PI) {
            return Err(ConfigError::Invalid(format!(
                "field_of_view {} outside (0, PI)",
                self.field_of_view
            )));
        }
        if !(self.aspect_ratio > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "aspect_ratio {} must be positive",
                self.aspect_ratio
            )));
        }
        if self.near_clip == self.far_clip {
            return Err(ConfigError::Invalid(format!(
                "near_clip and far_clip are both {}",
                self.near_clip
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
