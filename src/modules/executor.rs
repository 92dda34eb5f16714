// src/modules/executor.rs
use crate::config::ExecutorConfig;
use crate::error::{FileWatchError, Result};
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Creates the named worker pool a file watcher service runs its backend on.
pub trait ExecutorFactory {
    fn create(&self, name: &str) -> Result<Executor>;
}

/// A worker pool exclusively owned by one service.
///
/// Work may be submitted until [`Executor::shutdown`] is called; from then on
/// [`Executor::spawn`] refuses new tasks and already running ones are torn down.
pub struct Executor {
    name: String,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    shutdown: Arc<AtomicBool>,
    shutdown_timeout: Duration,
}

impl Executor {
    pub fn from_runtime(name: &str, runtime: Runtime, shutdown_timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// A flag that turns `true` once shutdown begins, for tasks running on
    /// this pool. Tasks must not hold the executor itself: it owns them.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn spawn<F>(&self, future: F) -> io::Result<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_shutdown() {
            return Err(io::Error::other(format!(
                "executor '{}' has been shut down",
                self.name
            )));
        }
        Ok(self.handle.spawn(future))
    }

    /// Runs a future to completion on this pool from a thread outside of it.
    ///
    /// Fails instead of blocking when called from inside any tokio runtime.
    pub fn block_on<F: Future>(&self, future: F) -> io::Result<F::Output> {
        if self.is_shutdown() {
            return Err(io::Error::other(format!(
                "executor '{}' has been shut down",
                self.name
            )));
        }
        if Handle::try_current().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!(
                    "cannot block on executor '{}' from an async context",
                    self.name
                ),
            ));
        }
        Ok(self.handle.block_on(future))
    }

    /// Shuts the pool down. Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("Executor '{}' already shut down", self.name);
            return;
        }

        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(runtime) = runtime else {
            return;
        };

        // Blocking on shutdown is not allowed from inside a runtime.
        if Handle::try_current().is_ok() {
            warn!(
                "Executor '{}' shut down from an async context; not waiting for running tasks",
                self.name
            );
            runtime.shutdown_background();
        } else {
            runtime.shutdown_timeout(self.shutdown_timeout);
        }
        info!("Executor '{}' shut down", self.name);
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if !self.is_shutdown() {
            self.shutdown();
        }
    }
}

/// Builds a multi-threaded tokio runtime per executor.
#[derive(Debug, Clone)]
pub struct TokioExecutorFactory {
    worker_threads: Option<usize>,
    shutdown_timeout: Duration,
}

impl TokioExecutorFactory {
    pub fn new(worker_threads: Option<usize>, shutdown_timeout: Duration) -> Self {
        Self {
            worker_threads,
            shutdown_timeout,
        }
    }
}

impl Default for TokioExecutorFactory {
    fn default() -> Self {
        Self::from(&ExecutorConfig::default())
    }
}

impl From<&ExecutorConfig> for TokioExecutorFactory {
    fn from(config: &ExecutorConfig) -> Self {
        Self::new(
            config.worker_threads,
            Duration::from_millis(config.shutdown_timeout_ms),
        )
    }
}

impl ExecutorFactory for TokioExecutorFactory {
    fn create(&self, name: &str) -> Result<Executor> {
        if self.worker_threads == Some(0) {
            return Err(FileWatchError::Executor(format!(
                "executor '{}' needs at least one worker thread",
                name
            )));
        }

        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(format!("{}-worker", name));
        if let Some(threads) = self.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder.build().map_err(|e| {
            FileWatchError::Executor(format!("Failed to build executor '{}': {}", name, e))
        })?;

        debug!(
            "Created executor '{}' (worker threads: {:?})",
            name, self.worker_threads
        );
        Ok(Executor::from_runtime(name, runtime, self.shutdown_timeout))
    }
}
