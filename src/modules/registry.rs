// src/modules/registry.rs
use crate::error::FileWatchError;
use crate::modules::backend::WatchBackend;
use crate::modules::executor::Executor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Identifier the native backend is registered under.
pub const NATIVE_BACKEND_ID: &str = "file_watcher_service::native::NotifyBackend";

pub type BackendConstructor = Box<
    dyn Fn(Arc<Executor>) -> Result<Box<dyn WatchBackend>, FileWatchError> + Send + Sync,
>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No backend registered as '{0}'")]
    NotFound(String),

    #[error("Could not instantiate backend '{id}': {source}")]
    Instantiation {
        id: String,
        #[source]
        source: FileWatchError,
    },
}

/// Backend constructors known to this build, keyed by identifier.
#[derive(Default)]
pub struct BackendRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every native backend compiled for the current target.
    pub fn with_platform_backends() -> Self {
        let mut registry = Self::empty();
        register_native(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, id: &str, constructor: F)
    where
        F: Fn(Arc<Executor>) -> Result<Box<dyn WatchBackend>, FileWatchError> + Send + Sync + 'static,
    {
        self.constructors.insert(id.to_string(), Box::new(constructor));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    pub fn resolve(
        &self,
        id: &str,
        executor: Arc<Executor>,
    ) -> Result<Box<dyn WatchBackend>, ResolveError> {
        let constructor = self
            .constructors
            .get(id)
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))?;
        constructor(executor).map_err(|source| ResolveError::Instantiation {
            id: id.to_string(),
            source,
        })
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "windows",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
fn register_native(registry: &mut BackendRegistry) {
    registry.register(NATIVE_BACKEND_ID, |executor| {
        Ok(Box::new(crate::modules::native::NotifyBackend::new(executor)))
    });
}

// notify only offers polling here.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "windows",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
)))]
fn register_native(_registry: &mut BackendRegistry) {}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
