use crate::glob::PathSet;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use upstage_core::{MigrationError, Project};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into when globbing.
const SKIPPED_DIRS: [&str; 2] = [".git", "node_modules"];

/// A project rooted at a directory on disk.
///
/// File operations use `tokio::fs`. Package-manager operations are not
/// provided; wrap this type to add them.
///
/// Globbing never descends into `.git` or `node_modules`, so
/// [`glob`](Project::glob) does not list their files and a wildcard passed
/// to [`remove`](Project::remove) leaves them alone. A literal pattern naming
/// one of those directories still deletes it.
#[derive(Debug, Clone)]
pub struct FsProject {
    root: PathBuf,
}

impl FsProject {
    /// Creates a project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches("./"))
    }

    async fn walk(&self) -> Result<Vec<String>, MigrationError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || walk_files(&root))
            .await
            .map_err(|e| io_error(&self.root, std::io::Error::other(e)))?
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && SKIPPED_DIRS.iter().any(|skipped| entry.file_name() == *skipped)
}

fn walk_files(root: &Path) -> Result<Vec<String>, MigrationError> {
    let mut files = Vec::new();
    let entries = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry));
    for entry in entries {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            io_error(&path, e.into())
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Some(relative) = relative(root, entry.path()) {
            files.push(relative);
        }
    }
    files.sort();
    Ok(files)
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn io_error(path: &Path, source: std::io::Error) -> MigrationError {
    MigrationError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl Project for FsProject {
    async fn read(&self, path: &str) -> Result<String, MigrationError> {
        match tokio::fs::read_to_string(self.resolve(path)).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MigrationError::NotFound {
                path: path.to_string(),
            }),
            Err(source) => Err(MigrationError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), MigrationError> {
        let target = self.resolve(path);
        let write_failure = |e: std::io::Error| MigrationError::WriteFailure {
            path: path.to_string(),
            details: e.to_string(),
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failure)?;
        }
        tokio::fs::write(&target, contents).await.map_err(write_failure)?;
        debug!("Wrote {}", path);
        Ok(())
    }

    /// Deletes every walked file a pattern covers, then every directory a
    /// literal pattern names, skipped directories included.
    async fn remove(&self, patterns: &[&str]) -> Result<(), MigrationError> {
        let paths = PathSet::new(patterns)?;
        for path in self.walk().await? {
            if paths.covers(&path) {
                let target = self.resolve(&path);
                tokio::fs::remove_file(&target)
                    .await
                    .map_err(|source| io_error(&target, source))?;
                debug!("Removed {}", path);
            }
        }
        for dir in paths.literals() {
            let target = self.resolve(dir);
            if tokio::fs::metadata(&target).await.is_ok_and(|meta| meta.is_dir()) {
                tokio::fs::remove_dir_all(&target)
                    .await
                    .map_err(|source| io_error(&target, source))?;
                debug!("Removed {}", dir);
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, MigrationError> {
        let target = self.resolve(path);
        tokio::fs::try_exists(&target)
            .await
            .map_err(|source| io_error(&target, source))
    }

    /// Lists matching files in sorted order, outside `.git` and
    /// `node_modules`.
    async fn glob(&self, patterns: &[&str]) -> Result<Vec<String>, MigrationError> {
        let paths = PathSet::new(patterns)?;
        Ok(self
            .walk()
            .await?
            .into_iter()
            .filter(|path| paths.is_match(path))
            .collect())
    }
}
