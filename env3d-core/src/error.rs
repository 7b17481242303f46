/// Error types shared by the scene core
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by matrix math, scene objects and the scene container
#[derive(Error, Debug)]
pub enum SceneError {
    /// A required argument was missing or out of its valid domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Matrix element access outside `[0, 3] x [0, 3]`
    #[error("Matrix index out of range: ({row}, {col})")]
    IndexOutOfRange { row: usize, col: usize },

    /// Eye and look-at point coincide, or the up vector is parallel to the view direction
    #[error("Degenerate view: {0}")]
    DegenerateView(String),

    /// Field of view, aspect ratio or clip planes produce no valid projection
    #[error("Degenerate projection: {0}")]
    DegenerateProjection(String),

    /// Operation on a resource whose handle was already released
    #[error("{0} already disposed")]
    AlreadyDisposed(&'static str),

    /// The rasterizer could not allocate a resource
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Backing file for a mesh or texture does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Mesh file exists but could not be decoded
    #[error("Failed to parse mesh: {0}")]
    MeshParse(String),

    /// A render listener reported a failure
    #[error("Render listener failed: {0}")]
    Listener(String),

    /// The rasterizer failed to draw a frame
    #[error("Rasterizer error: {0}")]
    Rasterizer(String),

    /// Scene configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values that parse but cannot drive a scene
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SceneError>;
