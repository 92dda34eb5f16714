// src/lib.rs
//! A process-wide file watching service that selects a native backend when the
//! platform supports one and silently degrades to a no-op backend otherwise.

pub mod config;
pub mod error;
pub mod modules;

pub use error::{FileWatchError, Result};
pub use modules::*;
