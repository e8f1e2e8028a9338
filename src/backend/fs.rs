//! Filesystem collaborator.

use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Text-file primitives the executor's file handlers are built on.
///
/// Implementations report a missing file from `read_text` and `remove` with
/// [`io::ErrorKind::NotFound`].
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check whether a path exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read a whole file as UTF-8.
    async fn read_text(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate a file with the given content.
    async fn write_text(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Remove a file.
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by the local disk via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn read_text(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_text(&self, path: &Path, content: &str) -> io::Result<()> {
        tokio::fs::write(path, content).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
