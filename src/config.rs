// src/config.rs
use crate::error::{FileWatchError, Result as WatchResult};
use crate::modules::{DirectoryTree, FileWatchInputs};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "file-watcher-config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub watch: Vec<WatchTargetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchTargetConfig {
    pub path: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML from config file: {:?}", path))?;
        Ok(config)
    }

    /// Directories become recursively watched trees; any other path is watched
    /// as a single file.
    pub fn watch_inputs(&self) -> WatchResult<FileWatchInputs> {
        let mut inputs = FileWatchInputs::new();
        for target in &self.watch {
            let path = PathBuf::from(&target.path);
            if path.is_dir() {
                let mut tree = DirectoryTree::new(path);
                for pattern in &target.include {
                    tree = tree.include(pattern)?;
                }
                for pattern in &target.exclude {
                    tree = tree.exclude(pattern)?;
                }
                inputs = inputs.with_directory(tree);
            } else if target.include.is_empty() && target.exclude.is_empty() {
                inputs = inputs.with_file(path);
            } else {
                return Err(FileWatchError::Config(format!(
                    "include/exclude patterns require a directory, but {:?} is not one",
                    target.path
                )));
            }
        }
        Ok(inputs)
    }
}
