//! FileSystem trait for abstracting file I/O.
//!
//! Defined in conductor-core so the engine and the built-in capabilities can
//! read and write files without depending on a specific filesystem. The
//! `LocalFileSystem` adapter lives in conductor-infra.

use std::path::{Path, PathBuf};

use conductor_types::error::FileError;

/// Abstraction over the file operations used by workflows.
///
/// The engine only calls `read_file` (for review and augmentation); the
/// built-in capabilities use the rest.
pub trait FileSystem: Send + Sync {
    /// Read a file's content as a string.
    fn read_file(
        &self,
        path: &Path,
    ) -> impl std::future::Future<Output = Result<String, FileError>> + Send;

    /// Write string content to a file, creating parent directories as needed.
    fn write_file(
        &self,
        path: &Path,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), FileError>> + Send;

    /// Check whether a path exists.
    fn exists(&self, path: &Path) -> impl std::future::Future<Output = bool> + Send;

    /// Size of the file in bytes.
    fn file_size(
        &self,
        path: &Path,
    ) -> impl std::future::Future<Output = Result<u64, FileError>> + Send;

    /// Every file below `dir`, recursively, as sorted paths relative to `dir`.
    fn list_files(
        &self,
        dir: &Path,
    ) -> impl std::future::Future<Output = Result<Vec<PathBuf>, FileError>> + Send;
}
