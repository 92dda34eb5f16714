// src/main.rs
use anyhow::{Context, Result};
use file_watcher_service::config::Config;
use file_watcher_service::{FileWatcherService, TokioExecutorFactory, WatchCallback};
use log::{error, info, warn};
use std::env;
use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    // Initialize logger based on RUST_LOG env var, or default to info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    if let Some(ref path) = config_path {
        info!("Loading configuration from: {:?}", path);
    } else {
        info!("Use default configuration");
    }

    let config = match Config::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            exit(1);
        }
    };

    let inputs = config
        .watch_inputs()
        .context("Invalid watch targets in configuration")?;
    if inputs.is_empty() {
        warn!("No watch targets configured; nothing will be reported.");
    }

    let factory = TokioExecutorFactory::from(&config.executor);
    let service = match FileWatcherService::new(&factory) {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to start file watcher service: {}", e);
            exit(1);
        }
    };
    info!(
        "File watcher service ready (capability: {:?}, backend: {})",
        service.capability(),
        service.backend_name()
    );

    let changes = Arc::new(AtomicU64::new(0));
    let counter = changes.clone();
    let callback: WatchCallback = Arc::new(move || {
        let seen = counter.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Watched files changed ({} changes so far)", seen);
    });

    let handle = match service.watch(&inputs, callback) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to watch configured paths: {}", e);
            service.stop();
            exit(1);
        }
    };

    info!("Watching; press Ctrl-C to stop.");
    match service.block_on(tokio::signal::ctrl_c()) {
        Ok(Ok(())) => info!("Shutdown requested."),
        Ok(Err(e)) => error!("Failed to listen for Ctrl-C: {}", e),
        Err(e) => error!("Executor unavailable while waiting for Ctrl-C: {}", e),
    }

    handle.release();
    service.stop();
    info!(
        "File watcher service stopped after {} changes.",
        changes.load(Ordering::Relaxed)
    );
    Ok(())
}
