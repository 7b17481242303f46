/// Ownership of rasterizer-side resources
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{Result, SceneError};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies a resource across the rasterizer boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An owned handle that can be released exactly once
#[derive(Debug)]
pub struct ResourceHandle {
    id: HandleId,
    kind: &'static str,
    disposed: AtomicBool,
}

impl ResourceHandle {
    pub fn acquire(kind: &'static str) -> Self {
        Self {
            id: HandleId(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)),
            kind,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns the id, or `AlreadyDisposed` once the handle has been released
    pub fn ensure_live(&self) -> Result<HandleId> {
        if self.is_disposed() {
            return Err(SceneError::AlreadyDisposed(self.kind));
        }
        Ok(self.id)
    }

    /// Releases the handle; a second release is an error
    pub fn release(&self) -> Result<HandleId> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Err(SceneError::AlreadyDisposed(self.kind));
        }
        log::debug!("Released {} {}", self.kind, self.id);
        Ok(self.id)
    }
}
