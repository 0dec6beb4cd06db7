//! In-memory artifact store for testing.

use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

use crate::ArtifactStore;

/// In-memory artifact store for testing.
///
/// Artifacts are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Writes
/// are counted per key so tests can assert that a cached stage didn't
/// recompute anything.
///
/// # Examples
///
/// ```
/// use narrate_storage::backend::MockBackend;
/// use narrate_storage::ArtifactStore;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockBackend::with_files([
///     ("summaries/Dune.txt", b"Spice must flow."),
/// ]);
/// assert!(store.exists(Path::new("summaries/Dune.txt")).await?);
///
/// store.write(Path::new("wavs/Dune.wav"), b"RIFF...").await?;
/// assert_eq!(store.writes(Path::new("wavs/Dune.wav")).await, 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
    writes: RwLock<HashMap<PathBuf, usize>>,
}

impl MockBackend {
    /// Create a mock store pre-populated with artifacts.
    ///
    /// Panics if any key fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = UtcDateTime::now();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_key(&path) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            writes: RwLock::new(HashMap::new()),
        }
    }

    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of times an artifact has been written (or imported) since the
    /// store was created. Pre-populated files don't count.
    pub async fn writes(&self, key: &Path) -> usize {
        match validate_key(key) {
            Ok(key) => self.writes.read().await.get(&key).copied().unwrap_or_default(),
            Err(_) => 0,
        }
    }

    async fn insert(&self, key: PathBuf, data: Vec<u8>) {
        *self.writes.write().await.entry(key.clone()).or_default() += 1;
        self.storage.write().await.insert(key, (UtcDateTime::now(), data));
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl ArtifactStore for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        let prefix = prefix.map(validate_key).transpose()?;
        let guard = self.storage.read().await;
        Ok(guard
            .iter()
            .filter(|(path, _)| prefix.as_ref().is_none_or(|pfx| path.starts_with(pfx)))
            .map(|(path, (inserted, data))| FileInfo::new(path, data.len() as u64, *inserted))
            .collect())
    }

    async fn exists(&self, key: &Path) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn read(&self, key: &Path) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let (_inserted, data) =
            self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        Ok(data)
    }

    async fn write(&self, key: &Path, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        self.insert(key, data.to_vec()).await;
        Ok(())
    }

    async fn import(&self, key: &Path, source: &Path) -> Result<()> {
        let key = validate_key(key)?;
        let data = tokio::fs::read(source).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(source.to_path_buf()),
            _ => ErrorKind::Io(e),
        })?;
        self.insert(key, data).await;
        Ok(())
    }

    async fn export(&self, key: &Path, destination: &Path) -> Result<()> {
        let data = self.read(key).await?;
        tokio::fs::write(destination, data).await.map_err(ErrorKind::Io)?;
        Ok(())
    }

    async fn stat(&self, key: &Path) -> Result<FileInfo> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let (inserted, data) = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(FileInfo::new(&key, data.len() as u64, *inserted))
    }
}
