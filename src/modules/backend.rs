// src/modules/backend.rs
use crate::error::Result;
use crate::modules::inputs::FileWatchInputs;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Invoked with no arguments each time a watched path changes.
pub type WatchCallback = Arc<dyn Fn() + Send + Sync>;

/// Something able to turn watch inputs into change notifications.
pub trait WatchBackend: Send + Sync {
    /// Returns the name of the backend (e.g., "NotifyBackend").
    fn name(&self) -> &str;

    /// Starts watching `inputs`, invoking `callback` on every change until the
    /// returned handle is released.
    fn watch(&self, inputs: &FileWatchInputs, callback: WatchCallback) -> Result<CancellationHandle>;
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Stops the notifications of a single watch registration.
///
/// Releasing more than once, or after the backend stopped, is harmless. Dropping
/// the handle does not release the registration.
pub struct CancellationHandle {
    release: Mutex<Option<ReleaseFn>>,
}

impl CancellationHandle {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    pub fn release(&self) {
        let release = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(release) = release {
            release();
        }
    }
}

impl fmt::Debug for CancellationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self
            .release
            .lock()
            .map(|r| r.is_some())
            .unwrap_or(false);
        f.debug_struct("CancellationHandle")
            .field("pending", &pending)
            .finish()
    }
}

/// Accepts every request and never reports a change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpBackend;

impl NoOpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl WatchBackend for NoOpBackend {
    fn name(&self) -> &str {
        "NoOpBackend"
    }

    fn watch(&self, _inputs: &FileWatchInputs, _callback: WatchCallback) -> Result<CancellationHandle> {
        Ok(CancellationHandle::noop())
    }
}
