/// Texture surfaces for primitives and scene backgrounds
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, SceneError};
use crate::handle::{HandleId, ResourceHandle};

/// An image surface referenced by path
///
/// Decoding happens on the rasterizer side; the core only tracks the handle.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

struct TextureInner {
    handle: ResourceHandle,
    path: PathBuf,
}

impl Texture {
    /// Fails with `NotFound` when `path` does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SceneError::NotFound(path.to_path_buf()));
        }
        let handle = ResourceHandle::acquire("Texture");
        log::debug!("Texture {} bound to {}", handle.id(), path.display());
        Ok(Self {
            inner: Arc::new(TextureInner {
                handle,
                path: path.to_path_buf(),
            }),
        })
    }

    pub fn id(&self) -> HandleId {
        self.inner.handle.id()
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub(crate) fn ensure_live(&self) -> Result<HandleId> {
        self.inner.handle.ensure_live()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.handle.is_disposed()
    }

    pub fn dispose(&self) -> Result<()> {
        self.inner.handle.release().map(|_| ())
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id())
            .field("path", &self.inner.path)
            .finish()
    }
}
