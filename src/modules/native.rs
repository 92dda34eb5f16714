// src/modules/native.rs
use crate::error::Result;
use crate::modules::backend::{CancellationHandle, WatchBackend, WatchCallback};
use crate::modules::executor::Executor;
use crate::modules::inputs::FileWatchInputs;
use log::{debug, warn};
use notify::{recommended_watcher, Event, EventKind, Watcher};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Watches through the platform's native notification API (inotify, FSEvents,
/// ReadDirectoryChangesW, kqueue) and runs callbacks on the shared executor.
pub struct NotifyBackend {
    executor: Arc<Executor>,
}

impl NotifyBackend {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

/// Per-registration cancellation state shared between handle and task.
struct Registration {
    released: AtomicBool,
    wake: Notify,
}

impl WatchBackend for NotifyBackend {
    fn name(&self) -> &str {
        "NotifyBackend"
    }

    fn watch(&self, inputs: &FileWatchInputs, callback: WatchCallback) -> Result<CancellationHandle> {
        if self.executor.is_shutdown() {
            return Err(io::Error::other(format!(
                "Cannot watch files: executor '{}' has been shut down",
                self.executor.name()
            ))
            .into());
        }
        if inputs.is_empty() {
            debug!("Empty watch inputs; nothing to register");
            return Ok(CancellationHandle::noop());
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver is gone once the registration ended.
            let _ = tx.send(res);
        })
        .map_err(io::Error::other)?;

        for (root, mode) in inputs.watch_roots() {
            debug!("Registering watch on {:?} ({:?})", root, mode);
            watcher.watch(&root, mode).map_err(|e| {
                io::Error::other(format!("Cannot watch path {:?}: {}", root, e))
            })?;
        }

        let registration = Arc::new(Registration {
            released: AtomicBool::new(false),
            wake: Notify::new(),
        });
        let task_registration = registration.clone();
        let shutdown = self.executor.shutdown_flag();
        let inputs = inputs.clone();

        self.executor.spawn(async move {
            // Dropping the watcher removes the OS-level watches.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    biased;
                    _ = task_registration.wake.notified() => break,
                    received = rx.recv() => {
                        let Some(res) = received else { break };
                        if task_registration.released.load(Ordering::Acquire)
                            || shutdown.load(Ordering::Acquire)
                        {
                            break;
                        }
                        match res {
                            Ok(event) => {
                                if is_relevant_event(&event.kind)
                                    && event.paths.iter().any(|p| inputs.matches(p))
                                {
                                    debug!("Change detected: {:?} {:?}", event.kind, event.paths);
                                    callback();
                                }
                            }
                            Err(e) => warn!("File watch error: {}", e),
                        }
                    }
                }
            }
            debug!("Watch registration ended");
        })?;

        Ok(CancellationHandle::new(move || {
            registration.released.store(true, Ordering::Release);
            registration.wake.notify_one();
        }))
    }
}

fn is_relevant_event(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}
