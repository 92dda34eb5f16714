// src/modules/mod.rs

pub mod backend;
pub mod capability;
pub mod dispatcher;
pub mod executor;
pub mod inputs;
pub mod native;
pub mod registry;

// Re-export for easier access
pub use backend::{CancellationHandle, NoOpBackend, WatchBackend, WatchCallback};
pub use capability::{Capability, Platform, PlatformVersion};
pub use dispatcher::{FileWatcherService, ServiceState, EXECUTOR_NAME};
pub use executor::{Executor, ExecutorFactory, TokioExecutorFactory};
pub use inputs::{DirectoryTree, FileWatchInputs};
pub use native::NotifyBackend;
pub use registry::{BackendConstructor, BackendRegistry, ResolveError, NATIVE_BACKEND_ID};
