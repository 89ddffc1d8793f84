use std::sync::Arc;

use chrono::Duration;
use toolkit_storage::{MemoryStorage, ToolkitStorage};
use tracing::{info, warn};

use crate::auth::TokenKeys;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn ToolkitStorage>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(storage: Arc<dyn ToolkitStorage>, tokens: TokenKeys) -> Self {
        Self {
            storage,
            tokens: Arc::new(tokens),
        }
    }

    /// Build the state described by `config`: connect storage, seed the
    /// catalog when asked, and set up token keys.
    pub async fn from_config(config: &ServerConfig) -> eyre::Result<Self> {
        let storage: Arc<dyn ToolkitStorage> = match &config.database.url {
            Some(url) => {
                info!("Using PostgreSQL storage");
                Arc::new(
                    toolkit_storage::PostgresStorage::connect(url, config.database.max_connections)
                        .await?,
                )
            }
            None => {
                warn!("No database.url configured, data will be kept in memory");
                Arc::new(MemoryStorage::new())
            }
        };

        if config.database.seed {
            toolkit_storage::seed_catalog(storage.as_ref()).await?;
        }

        let secret = match &config.auth.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("No auth.jwt_secret configured, generating a random one");
                uuid::Uuid::new_v4().to_string()
            }
        };
        let tokens = TokenKeys::new(
            secret.as_bytes(),
            Duration::days(config.auth.token_ttl_days),
        );

        Ok(Self::new(storage, tokens))
    }
}
