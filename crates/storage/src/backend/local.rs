//! Local filesystem artifact store.
//!
//! Artifacts live under a configured root directory (the pipeline's work
//! directory). Reads go through `tokio::fs`; writes go through a temporary
//! file in the destination directory followed by a rename, so an artifact
//! is never visible under its key until it is complete.

use crate::error::ErrorKind;
use crate::{ArtifactStore, FileInfo, error::Result, path::validate as validate_key};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Local filesystem artifact store.
///
/// # Examples
///
/// ```no_run
/// use narrate_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalBackend::new("workdir", "/home/me/audiobooks")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory that all keys are relative to
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it only happens once per run and it's not
            // worth making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for a key.
    fn absolute_path(&self, key: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_key(key.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a key.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_key(relative)
    }

    fn metadata(key: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo::new(key, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Parent directory of an absolute artifact path, created if missing.
    async fn prepare_parent(absolute: &Path, key: &Path) -> Result<PathBuf> {
        let parent = absolute
            .parent()
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(key.to_path_buf())))?
            .to_path_buf();
        fs::create_dir_all(&parent).await.map_err(|e| Self::map_io_error(e, key))?;
        Ok(parent)
    }

    /// Runs blocking temp-file work off the async runtime.
    async fn blocking<T, F>(task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(task)
            .await
            .or_raise(|| ErrorKind::BackendError("blocking filesystem task panicked".to_string()))?
    }
}

/// Write `data` to a temporary file next to `destination`, flush it to disk,
/// then rename it into place.
fn atomic_write(parent: &Path, destination: &Path, key: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| LocalBackend::map_io_error(e, key))?;
    tmp.write_all(data).map_err(ErrorKind::Io)?;
    tmp.as_file().sync_all().map_err(ErrorKind::Io)?;
    tmp.persist(destination).map_err(|e| LocalBackend::map_io_error(e.error, key))?;
    Ok(())
}

/// Copy `source` to a temporary file next to `destination`, then rename it
/// into place.
fn atomic_copy(parent: &Path, source: &Path, destination: &Path, key: &Path) -> Result<()> {
    let tmp = NamedTempFile::new_in(parent).map_err(|e| LocalBackend::map_io_error(e, key))?;
    std::fs::copy(source, tmp.path()).map_err(|e| LocalBackend::map_io_error(e, source))?;
    tmp.as_file().sync_all().map_err(ErrorKind::Io)?;
    tmp.persist(destination).map_err(|e| LocalBackend::map_io_error(e.error, key))?;
    Ok(())
}

#[async_trait]
impl ArtifactStore for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        let prefix = prefix.map(validate_key).transpose()?;
        // Walk from the parent directory of the prefix, so that a prefix whose
        // leaf doesn't exist yet (or is a file) doesn't error.
        let start = prefix
            .as_ref()
            .map(|p| self.root.join(p).parent().unwrap_or(&self.root).to_path_buf())
            .unwrap_or_else(|| self.root.clone());
        let mut stack = vec![start];
        let mut files = Vec::new();
        while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => exn::bail!(Self::map_io_error(err, &current)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, &current))? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
                let relative = self.relative_path(&path)?;
                if let Some(pfx) = &prefix
                    && !relative.starts_with(pfx)
                {
                    continue;
                }
                if metadata.is_dir() {
                    stack.push(path);
                } else if metadata.is_file() {
                    files.push(Self::metadata(&relative, metadata)?);
                }
            }
        }
        Ok(files)
    }

    async fn exists(&self, key: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, key: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    #[tracing::instrument(skip(self, data), fields(store = %self.name, bytes = data.len()))]
    async fn write(&self, key: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        let parent = Self::prepare_parent(&abs_path, key).await?;
        let (key, data) = (key.to_path_buf(), data.to_vec());
        Self::blocking(move || atomic_write(&parent, &abs_path, &key, &data)).await
    }

    #[tracing::instrument(skip(self), fields(store = %self.name))]
    async fn import(&self, key: &Path, source: &Path) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        let parent = Self::prepare_parent(&abs_path, key).await?;
        // A rename is atomic and free when both paths are on the same
        // filesystem. Anything else (temp dirs on tmpfs, mostly) gets copied.
        match fs::rename(source, &abs_path).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => exn::bail!(ErrorKind::NotFound(source.to_path_buf())),
            Err(e) => tracing::debug!(error = %e, "Rename into store failed; copying instead"),
        }
        let (key, source) = (key.to_path_buf(), source.to_path_buf());
        Self::blocking(move || atomic_copy(&parent, &source, &abs_path, &key)).await
    }

    async fn export(&self, key: &Path, destination: &Path) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        fs::copy(&abs_path, destination).await.map_err(|e| Self::map_io_error(e, key))?;
        Ok(())
    }

    fn local_path(&self, key: &Path) -> Option<PathBuf> {
        self.absolute_path(key).ok()
    }

    async fn stat(&self, key: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        let key = validate_key(key)?;
        Self::metadata(&key, metadata)
    }
}
