// src/modules/inputs.rs
use crate::error::Result;
use glob::Pattern;
use notify::RecursiveMode;
use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};

/// Anchors relative paths at the current directory, since the OS reports
/// events under the absolute path that was registered.
fn absolutize(path: &Path) -> Cow<'_, Path> {
    if path.is_absolute() {
        return Cow::Borrowed(path);
    }
    match env::current_dir() {
        Ok(cwd) => Cow::Owned(cwd.join(path)),
        Err(_) => Cow::Borrowed(path),
    }
}

/// A directory observed recursively, optionally narrowed by glob patterns
/// matched against paths relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTree {
    root: PathBuf,
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl DirectoryTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            root: absolutize(&root).into_owned(),
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.includes.push(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.excludes.push(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, path: &Path) -> bool {
        let path = absolutize(path);
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if self.excludes.iter().any(|p| p.matches_path(relative)) {
            return false;
        }
        self.includes.is_empty() || self.includes.iter().any(|p| p.matches_path(relative))
    }
}

/// The paths one watch registration is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileWatchInputs {
    directories: Vec<DirectoryTree>,
    files: Vec<PathBuf>,
}

impl FileWatchInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, tree: DirectoryTree) -> Self {
        self.directories.push(tree);
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        self.files.push(absolutize(&file).into_owned());
        self
    }

    pub fn directories(&self) -> &[DirectoryTree] {
        &self.directories
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = absolutize(path);
        let path = path.as_ref();
        self.files.iter().any(|f| f == path) || self.directories.iter().any(|d| d.contains(path))
    }

    /// Directories that must be registered with the OS to observe these inputs.
    ///
    /// Single files are observed through their parent directory.
    pub fn watch_roots(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots: Vec<(PathBuf, RecursiveMode)> = Vec::new();
        for tree in &self.directories {
            roots.retain(|(path, _)| !path.starts_with(&tree.root));
            if !roots
                .iter()
                .any(|(path, mode)| *mode == RecursiveMode::Recursive && tree.root.starts_with(path))
            {
                roots.push((tree.root.clone(), RecursiveMode::Recursive));
            }
        }
        for file in &self.files {
            let parent = file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let covered = roots.iter().any(|(path, mode)| match mode {
                RecursiveMode::Recursive => parent.starts_with(path),
                RecursiveMode::NonRecursive => *path == parent,
            });
            if !covered {
                roots.push((parent, RecursiveMode::NonRecursive));
            }
        }
        roots
    }
}
