//! Local durable copy of the installed set.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use toolkit_types::ModuleId;

/// Fixed file name of the on-disk cache.
pub const CACHE_FILE_NAME: &str = "installed-modules.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache contents are malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// A single slot holding the last known installed set.
///
/// The store is the only writer; last write wins.
#[async_trait]
pub trait InstallCache: Send + Sync {
    async fn load(&self) -> Result<Vec<ModuleId>, CacheError>;

    async fn save(&self, ids: &[ModuleId]) -> Result<(), CacheError>;
}

/// JSON array of ids stored in [`CACHE_FILE_NAME`].
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The cache file inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InstallCache for FileCache {
    async fn load(&self) -> Result<Vec<ModuleId>, CacheError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, ids: &[ModuleId]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string(ids)?;

        // Write then rename so readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-process cache, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    ids: Mutex<Vec<ModuleId>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: impl IntoIterator<Item = ModuleId>) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl InstallCache for MemoryCache {
    async fn load(&self) -> Result<Vec<ModuleId>, CacheError> {
        Ok(self.ids.lock().await.clone())
    }

    async fn save(&self, ids: &[ModuleId]) -> Result<(), CacheError> {
        *self.ids.lock().await = ids.to_vec();
        Ok(())
    }
}
