//! The persisted session token, kept next to the install cache.

use std::path::{Path, PathBuf};

use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::fs;

pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    pub async fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).await?;
        let stored: StoredSession = serde_json::from_str(&content)?;
        Ok(Some(stored.token))
    }

    pub async fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string(&StoredSession {
            token: token.to_string(),
        })?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
