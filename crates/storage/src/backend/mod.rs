//! Artifact store trait and implementations.
//!
//! Every pipeline stage persists its output under a well-known key, and the
//! existence of that key is the cache entry. This module defines the
//! [`ArtifactStore`] trait that stages talk to, and the backends behind it.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Unified interface for artifact stores.
///
/// Keys are relative paths validated with [`validate_key`](crate::validate_key).
/// Implementations must enforce this validation.
///
/// # Atomicity
/// An artifact either exists in full or not at all. The cache has no other
/// way of telling a finished artifact from a half-written one, so
/// [`write()`](Self::write) and [`import()`](Self::import) must never expose
/// a partially written file under its final key.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use narrate_storage::{ArtifactStore, error::Result};
///
/// async fn cached_text(store: &dyn ArtifactStore) -> Result<Option<String>> {
///     let key = Path::new("extracts/Dune.txt");
///     if !store.exists(key).await? {
///         return Ok(None);
///     }
///     let data = store.read(key).await?;
///     Ok(Some(String::from_utf8_lossy(&data).into_owned()))
/// }
/// ```
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// List all artifacts whose key starts with an optional prefix.
    ///
    /// Asking for a prefix that doesn't exist results in an empty list, not
    /// an error.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>>;

    /// Check if an artifact exists.
    async fn exists(&self, key: &Path) -> Result<bool>;

    /// Read artifact contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// artifact does not exist.
    async fn read(&self, key: &Path) -> Result<Vec<u8>>;

    /// Atomically write artifact contents, replacing any existing artifact.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    async fn write(&self, key: &Path, data: &[u8]) -> Result<()>;

    /// Atomically adopt a file that was produced outside of the store (by
    /// an external process, for example).
    ///
    /// The source file may be moved rather than copied; callers must not
    /// rely on it still existing afterwards.
    async fn import(&self, key: &Path, source: &Path) -> Result<()>;

    /// Copy an artifact out of the store to a filesystem path.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// artifact does not exist.
    async fn export(&self, key: &Path, destination: &Path) -> Result<()>;

    /// Filesystem location of an artifact, for stores that keep artifacts
    /// on local disk. External tools can read from it directly instead of
    /// going through [`export()`](Self::export).
    ///
    /// The returned path is not guaranteed to exist.
    fn local_path(&self, _key: &Path) -> Option<PathBuf> {
        None
    }

    /// Get artifact metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// artifact does not exist.
    async fn stat(&self, key: &Path) -> Result<FileInfo>;
}
