use std::sync::Arc;

use eyre::Result;
use toolkit_client::{
    Catalog, ClientError, FileCache, HttpBackend, InstallStore, StoreOptions,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::session::SessionFile;

/// Everything a command needs: the backend, the install store and the
/// persisted session.
pub struct Context {
    pub backend: Arc<HttpBackend>,
    pub store: InstallStore,
    pub session: SessionFile,
}

impl Context {
    pub async fn open(config: &Config) -> Result<Self> {
        let data_dir = Config::get_data_dir();
        let backend = Arc::new(HttpBackend::new(&config.api.url, config.api.timeout())?);
        let store = InstallStore::open(
            backend.clone(),
            Arc::new(FileCache::in_dir(&data_dir)),
            StoreOptions {
                request_timeout: config.api.timeout(),
            },
        )
        .await;

        let context = Self {
            backend,
            store,
            session: SessionFile::in_dir(&data_dir),
        };
        context.restore_session().await;
        Ok(context)
    }

    async fn restore_session(&self) {
        let token = match self.session.load().await {
            Ok(Some(token)) => token,
            Ok(None) => return,
            Err(e) => {
                warn!("Ignoring unreadable session file: {}", e);
                return;
            }
        };

        match self.store.restore(&token).await {
            Ok(user) => debug!("Restored session for {}", user.username),
            Err(ClientError::Unauthenticated) => {
                warn!("Saved session is no longer valid");
                if let Err(e) = self.session.clear().await {
                    warn!("Failed to remove session file: {}", e);
                }
            }
            Err(e) => warn!("Could not restore session: {}", e),
        }
    }

    /// Load the catalog, telling the user when it is the built-in fallback.
    pub async fn catalog(&self) -> Catalog {
        let catalog = Catalog::load(self.backend.as_ref()).await;
        if catalog.is_fallback() {
            println!("⚠️ Backend unavailable, showing built-in demo modules");
        }
        catalog
    }

    /// Persist the store's current token, or forget it when signed out.
    pub async fn sync_session(&self) -> Result<()> {
        match self.store.token().await {
            Some(token) => self.session.save(&token).await,
            None => self.session.clear().await,
        }
    }
}
