//! Local filesystem adapter.
//!
//! Implements the `FileSystem` trait from `conductor-core` for real
//! filesystem I/O. Relative paths resolve against an optional root so a
//! workflow can target a project directory other than the process cwd.

use std::path::{Path, PathBuf};

use conductor_core::fs::FileSystem;
use conductor_types::error::FileError;

/// Local filesystem implementation of the `FileSystem` trait.
///
/// All operations go through `tokio::fs` for async I/O.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    root: Option<PathBuf>,
}

impl LocalFileSystem {
    /// Resolve relative paths against the process working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// The on-disk location for `path`. Absolute paths are kept as-is.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl FileSystem for LocalFileSystem {
    async fn read_file(&self, path: &Path) -> Result<String, FileError> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| FileError::from_io(path, e))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), FileError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::from_io(path, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| FileError::from_io(path, e))?;
        tracing::debug!(path = %target.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }

    async fn file_size(&self, path: &Path) -> Result<u64, FileError> {
        tokio::fs::metadata(self.resolve(path))
            .await
            .map(|m| m.len())
            .map_err(|e| FileError::from_io(path, e))
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, FileError> {
        let base = self.resolve(dir);
        let mut files = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(|e| FileError::from_io(&current, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| FileError::from_io(&current, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| FileError::from_io(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&base) {
                    files.push(relative.to_path_buf());
                }
            }
        }

        files.sort();
        tracing::debug!(dir = %base.display(), count = files.len(), "listed files");
        Ok(files)
    }
}
