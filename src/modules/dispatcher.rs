// src/modules/dispatcher.rs
use crate::error::Result;
use crate::modules::backend::{CancellationHandle, NoOpBackend, WatchBackend, WatchCallback};
use crate::modules::capability::{Capability, Platform};
use crate::modules::executor::{Executor, ExecutorFactory};
use crate::modules::inputs::FileWatchInputs;
use crate::modules::registry::{BackendRegistry, ResolveError, NATIVE_BACKEND_ID};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Logical name of the worker pool owned by the service.
pub const EXECUTOR_NAME: &str = "filewatcher";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Ready,
    Stopped,
}

/// Process-wide file watching that works the same whether or not the platform
/// supports native change notification.
///
/// The backend is chosen once, at construction. When native watching is
/// unavailable every request is accepted and no change is ever reported.
pub struct FileWatcherService {
    executor: Arc<Executor>,
    capability: Capability,
    backend: Box<dyn WatchBackend>,
}

impl FileWatcherService {
    pub fn new(executor_factory: &dyn ExecutorFactory) -> Result<Self> {
        Self::with_environment(
            executor_factory,
            Platform::current(),
            &BackendRegistry::with_platform_backends(),
        )
    }

    pub fn with_environment(
        executor_factory: &dyn ExecutorFactory,
        platform: Platform,
        registry: &BackendRegistry,
    ) -> Result<Self> {
        let executor = Arc::new(executor_factory.create(EXECUTOR_NAME)?);
        let capability = Capability::detect(&platform);
        debug!(
            "Platform {} {:?}: native file watching {:?}",
            platform.os, platform.version, capability
        );
        let backend = select_backend(capability, registry, executor.clone());

        Ok(Self {
            executor,
            capability,
            backend,
        })
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn state(&self) -> ServiceState {
        if self.executor.is_shutdown() {
            ServiceState::Stopped
        } else {
            ServiceState::Ready
        }
    }

    /// Blocks the calling thread on `future` using the service's worker pool.
    ///
    /// Must be called from a thread outside any tokio runtime; inside one it
    /// returns a `WouldBlock` error instead of blocking.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> std::io::Result<F::Output> {
        self.executor.block_on(future)
    }

    pub fn watch(
        &self,
        inputs: &FileWatchInputs,
        callback: WatchCallback,
    ) -> Result<CancellationHandle> {
        self.backend.watch(inputs, callback)
    }

    /// Releases the worker pool. Later calls do nothing.
    pub fn stop(&self) {
        self.executor.shutdown();
    }
}

impl Drop for FileWatcherService {
    fn drop(&mut self) {
        self.stop();
    }
}

impl WatchBackend for FileWatcherService {
    fn name(&self) -> &str {
        "FileWatcherService"
    }

    fn watch(&self, inputs: &FileWatchInputs, callback: WatchCallback) -> Result<CancellationHandle> {
        FileWatcherService::watch(self, inputs, callback)
    }
}

fn select_backend(
    capability: Capability,
    registry: &BackendRegistry,
    executor: Arc<Executor>,
) -> Box<dyn WatchBackend> {
    if capability.supports_native_watch() {
        match registry.resolve(NATIVE_BACKEND_ID, executor) {
            Ok(backend) => {
                info!("Using {} for file watching.", backend.name());
                return backend;
            }
            Err(ResolveError::NotFound(id)) => {
                error!(
                    "Native file watcher backend '{}' is not available on a capable platform, falling back to no-op implementation.",
                    id
                );
            }
            Err(e) => {
                error!("{}, falling back to no-op implementation.", e);
            }
        }
    }
    warn!("Using no-op file watcher service.");
    Box::new(NoOpBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileWatchError;
    use crate::modules::capability::PlatformVersion;
    use crate::modules::executor::TokioExecutorFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FailingFactory;

    impl ExecutorFactory for FailingFactory {
        fn create(&self, name: &str) -> Result<Executor> {
            Err(FileWatchError::Executor(format!("no threads left for {}", name)))
        }
    }

    #[derive(Default)]
    struct Recorded {
        inputs: Vec<FileWatchInputs>,
        callbacks: Vec<WatchCallback>,
    }

    struct RecordingBackend {
        recorded: Arc<Mutex<Recorded>>,
    }

    impl WatchBackend for RecordingBackend {
        fn name(&self) -> &str {
            "RecordingBackend"
        }

        fn watch(
            &self,
            inputs: &FileWatchInputs,
            callback: WatchCallback,
        ) -> Result<CancellationHandle> {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.inputs.push(inputs.clone());
            recorded.callbacks.push(callback);
            Ok(CancellationHandle::noop())
        }
    }

    fn factory() -> TokioExecutorFactory {
        TokioExecutorFactory::new(Some(1), Duration::from_secs(1))
    }

    fn capable() -> Platform {
        Platform::new("linux", Some(PlatformVersion::new(6, 1, 0)))
    }

    fn incapable() -> Platform {
        Platform::new("unknown", None)
    }

    fn counting_callback() -> (WatchCallback, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        (
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            calls,
        )
    }

    #[test]
    fn executor_failure_is_fatal_and_skips_selection() {
        let resolved = Arc::new(AtomicUsize::new(0));
        let counter = resolved.clone();
        let mut registry = BackendRegistry::empty();
        registry.register(NATIVE_BACKEND_ID, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NoOpBackend::new()))
        });

        let err = FileWatcherService::with_environment(&FailingFactory, capable(), &registry)
            .err()
            .unwrap();
        assert!(matches!(err, FileWatchError::Executor(ref msg) if msg.contains("filewatcher")));
        assert_eq!(resolved.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsupported_platform_selects_noop_without_resolving() {
        let resolved = Arc::new(AtomicUsize::new(0));
        let counter = resolved.clone();
        let mut registry = BackendRegistry::empty();
        registry.register(NATIVE_BACKEND_ID, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NoOpBackend::new()))
        });

        let service =
            FileWatcherService::with_environment(&factory(), incapable(), &registry).unwrap();
        assert_eq!(service.capability(), Capability::Unsupported);
        assert_eq!(service.backend_name(), "NoOpBackend");
        assert_eq!(resolved.load(Ordering::SeqCst), 0);
        service.stop();
    }

    #[test]
    fn missing_native_backend_degrades_to_noop() {
        let service =
            FileWatcherService::with_environment(&factory(), capable(), &BackendRegistry::empty())
                .unwrap();
        assert_eq!(service.capability(), Capability::Native);
        assert_eq!(service.backend_name(), "NoOpBackend");

        let (callback, calls) = counting_callback();
        let handle = service
            .watch(&FileWatchInputs::new().with_file("/tmp/x"), callback)
            .unwrap();
        handle.release();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        service.stop();
    }

    #[test]
    fn broken_native_backend_degrades_to_noop() {
        let mut registry = BackendRegistry::empty();
        registry.register(NATIVE_BACKEND_ID, |_| {
            Err(FileWatchError::Io(std::io::Error::other("inotify limit reached")))
        });

        let service = FileWatcherService::with_environment(&factory(), capable(), &registry).unwrap();
        assert_eq!(service.backend_name(), "NoOpBackend");
        assert_eq!(service.state(), ServiceState::Ready);
        service.stop();
    }

    #[test]
    fn requests_are_relayed_unchanged() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let backend_recorded = recorded.clone();
        let mut registry = BackendRegistry::empty();
        registry.register(NATIVE_BACKEND_ID, move |_| {
            Ok(Box::new(RecordingBackend {
                recorded: backend_recorded.clone(),
            }))
        });

        let service = FileWatcherService::with_environment(&factory(), capable(), &registry).unwrap();
        assert_eq!(service.backend_name(), "RecordingBackend");

        let inputs = FileWatchInputs::new().with_file("/tmp/x");
        let (callback, calls) = counting_callback();
        service.watch(&inputs, callback.clone()).unwrap();

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.inputs, vec![inputs]);
        assert!(Arc::ptr_eq(&recorded.callbacks[0], &callback));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        service.stop();
    }

    #[test]
    fn backend_errors_propagate_unchanged() {
        struct RejectingBackend;

        impl WatchBackend for RejectingBackend {
            fn name(&self) -> &str {
                "RejectingBackend"
            }

            fn watch(&self, _: &FileWatchInputs, _: WatchCallback) -> Result<CancellationHandle> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
            }
        }

        let mut registry = BackendRegistry::empty();
        registry.register(NATIVE_BACKEND_ID, |_| Ok(Box::new(RejectingBackend)));
        let service = FileWatcherService::with_environment(&factory(), capable(), &registry).unwrap();

        let (callback, _calls) = counting_callback();
        let err = service
            .watch(&FileWatchInputs::new().with_file("/tmp/x"), callback)
            .unwrap_err();
        assert!(
            matches!(err, FileWatchError::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied)
        );
        service.stop();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dropping_service_with_live_registration_releases_executor() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = FileWatcherService::with_environment(
            &factory(),
            capable(),
            &BackendRegistry::with_platform_backends(),
        )
        .unwrap();
        assert_eq!(service.backend_name(), "NotifyBackend");

        let (callback, calls) = counting_callback();
        let inputs = FileWatchInputs::new()
            .with_directory(crate::modules::inputs::DirectoryTree::new(dir.path()));
        let handle = service.watch(&inputs, callback).unwrap();

        drop(service);
        handle.release();
        handle.release();

        std::fs::write(dir.path().join("after-drop.txt"), b"hello").unwrap();
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn block_on_inside_a_runtime_is_refused() {
        let service =
            FileWatcherService::with_environment(&factory(), incapable(), &BackendRegistry::empty())
                .unwrap();
        let nested = service
            .block_on(async { service.block_on(async {}).is_err() })
            .unwrap();
        assert!(nested);
    }

    #[test]
    fn stop_is_idempotent() {
        let service =
            FileWatcherService::with_environment(&factory(), incapable(), &BackendRegistry::empty())
                .unwrap();
        assert_eq!(service.state(), ServiceState::Ready);
        service.stop();
        service.stop();
        assert_eq!(service.state(), ServiceState::Stopped);
    }
}
