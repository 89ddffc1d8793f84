//! The install-state store.
//!
//! [`InstallStore`] owns the client's view of which modules are installed.
//! Mutations are applied optimistically, confirmed or rolled back when the
//! backend answers, and re-derived whenever the session changes. Callers
//! only ever see snapshots.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use toolkit_types::{
    AuthResponse, InstallResponse, LoginRequest, ModuleId, ModuleRef, RegisterRequest,
    UserProjection,
};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::cache::InstallCache;
use crate::error::{ClientError, Result};
use crate::http::DEFAULT_TIMEOUT;
use crate::reconcile::{Begin, Intent, InstallState, Settle, Ticket};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Upper bound on every backend call. Expiry counts as
    /// [`ClientError::NetworkUnreachable`].
    pub request_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How a successful install or uninstall was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The backend confirmed the change and its set was adopted.
    Applied,
    /// Nothing to do: the module was already in the requested state.
    AlreadySatisfied,
    /// The backend accepted the change, but a newer request for the same
    /// module had been issued meanwhile and owns what is displayed.
    Superseded,
    /// Demo module: applied locally without contacting the backend.
    Local,
}

/// Published to subscribers after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub installed: BTreeSet<ModuleId>,
    pub authenticated: bool,
    pub pending: usize,
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    user: UserProjection,
}

#[derive(Debug, Default)]
struct Inner {
    state: InstallState,
    session: Option<Session>,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            installed: self.state.snapshot(),
            authenticated: self.session.is_some(),
            pending: self.state.pending_count(),
        }
    }
}

pub struct InstallStore {
    backend: Arc<dyn Backend>,
    cache: Arc<dyn InstallCache>,
    options: StoreOptions,
    inner: Mutex<Inner>,
    updates: watch::Sender<Snapshot>,
}

impl InstallStore {
    /// Create a signed-out store seeded from `cache`.
    pub async fn open(
        backend: Arc<dyn Backend>,
        cache: Arc<dyn InstallCache>,
        options: StoreOptions,
    ) -> Self {
        let cached = load_cache(cache.as_ref()).await;
        let inner = Inner {
            state: InstallState::new(cached),
            session: None,
        };
        let (updates, _) = watch::channel(inner.snapshot());

        Self {
            backend,
            cache,
            options,
            inner: Mutex::new(inner),
            updates,
        }
    }

    // === Queries ===

    pub async fn is_installed(&self, module: ModuleId) -> bool {
        self.inner.lock().await.state.is_installed(module)
    }

    /// Optimistic installed set, sorted.
    pub async fn installed(&self) -> BTreeSet<ModuleId> {
        self.inner.lock().await.state.snapshot()
    }

    /// The signed-in principal, as last reported by the backend.
    pub async fn session(&self) -> Option<UserProjection> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub async fn token(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.state.pending_count()
    }

    /// Receive a fresh [`Snapshot`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    // === Session ===

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProjection> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.bounded(self.backend.login(&request)).await?;
        Ok(self.start_session(response).await)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProjection> {
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.bounded(self.backend.register(&request)).await?;
        Ok(self.start_session(response).await)
    }

    /// Re-establish a session from a persisted token.
    pub async fn restore(&self, token: &str) -> Result<UserProjection> {
        match self.bounded(self.backend.current_user(token)).await {
            Ok(user) => {
                let response = AuthResponse {
                    token: token.to_string(),
                    user,
                };
                Ok(self.start_session(response).await)
            }
            Err(ClientError::Unauthenticated) => {
                self.end_session("token rejected").await;
                Err(ClientError::Unauthenticated)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self) {
        self.end_session("logout").await;
    }

    async fn start_session(&self, response: AuthResponse) -> UserProjection {
        let AuthResponse { token, user } = response;
        let mut inner = self.inner.lock().await;

        inner.state.reset(user.installed_modules.iter().copied());
        inner.session = Some(Session {
            token,
            user: user.clone(),
        });
        info!(
            "Signed in as {} with {} installed modules",
            user.username,
            user.installed_modules.len()
        );

        self.persist(&inner).await;
        self.publish(&inner);
        user
    }

    async fn end_session(&self, reason: &str) {
        let mut inner = self.inner.lock().await;
        let cached = load_cache(self.cache.as_ref()).await;

        inner.state.reset(cached);
        if inner.session.take().is_some() {
            info!("Session ended ({})", reason);
        }
        self.publish(&inner);
    }

    // === Mutations ===

    pub async fn install(&self, module: ModuleRef) -> Result<Outcome> {
        self.apply(module, Intent::Install).await
    }

    pub async fn uninstall(&self, module: ModuleRef) -> Result<Outcome> {
        self.apply(module, Intent::Uninstall).await
    }

    async fn apply(&self, module: ModuleRef, intent: Intent) -> Result<Outcome> {
        let (ticket, token) = {
            let mut inner = self.inner.lock().await;
            let Some(token) = inner.session.as_ref().map(|s| s.token.clone()) else {
                return Err(ClientError::Unauthenticated);
            };
            match inner.state.begin(module.id(), intent) {
                Begin::AlreadySatisfied => {
                    debug!("{} already satisfies {:?}", module, intent);
                    return Ok(Outcome::AlreadySatisfied);
                }
                Begin::Started(ticket) => {
                    self.publish(&inner);
                    (ticket, token)
                }
            }
        };
        debug!("{:?} {} started (seq {})", intent, module, ticket.seq);

        if module.is_demo() {
            let mut inner = self.inner.lock().await;
            return Ok(match inner.state.confirm_demo(ticket) {
                Settle::Applied => {
                    self.persist(&inner).await;
                    self.publish(&inner);
                    Outcome::Local
                }
                Settle::Stale => Outcome::Superseded,
            });
        }

        let id = module.id();
        let result = match intent {
            Intent::Install => self.bounded(self.backend.install(&token, id)).await,
            Intent::Uninstall => self.bounded(self.backend.uninstall(&token, id)).await,
        };

        match result {
            Ok(response) => Ok(self.on_confirmed(ticket, response).await),
            Err(err) if already_satisfied(intent, &err) => {
                debug!("Backend reports {} already satisfies {:?}", module, intent);
                Ok(self.on_already_satisfied(ticket).await)
            }
            Err(ClientError::Unauthenticated) => {
                warn!("Backend rejected the session token");
                self.end_session("token expired").await;
                Err(ClientError::Unauthenticated)
            }
            Err(err) => {
                self.on_failed(ticket, &err).await;
                Err(err)
            }
        }
    }

    async fn on_confirmed(&self, ticket: Ticket, response: InstallResponse) -> Outcome {
        let mut inner = self.inner.lock().await;
        match inner
            .state
            .confirm(ticket, response.installed_modules.iter().copied())
        {
            Settle::Applied => {
                if let Some(session) = inner.session.as_mut() {
                    session.user = response.user;
                }
                info!("{:?} {} confirmed", ticket.intent, ticket.module);
                self.persist(&inner).await;
                self.publish(&inner);
                Outcome::Applied
            }
            Settle::Stale => {
                debug!(
                    "Response for {} (seq {}) superseded by a newer request",
                    ticket.module, ticket.seq
                );
                if inner.state.is_current(&ticket) {
                    self.persist(&inner).await;
                }
                Outcome::Superseded
            }
        }
    }

    async fn on_already_satisfied(&self, ticket: Ticket) -> Outcome {
        let mut inner = self.inner.lock().await;
        match inner.state.confirm_single(ticket) {
            Settle::Applied => {
                self.persist(&inner).await;
                self.publish(&inner);
                Outcome::AlreadySatisfied
            }
            Settle::Stale => {
                if inner.state.is_current(&ticket) {
                    self.persist(&inner).await;
                }
                Outcome::Superseded
            }
        }
    }

    async fn on_failed(&self, ticket: Ticket, err: &ClientError) {
        let mut inner = self.inner.lock().await;
        match inner.state.rollback(ticket) {
            Settle::Applied => {
                warn!(
                    "{:?} {} failed, rolled back: {}",
                    ticket.intent, ticket.module, err
                );
                self.publish(&inner);
            }
            Settle::Stale => {
                debug!(
                    "{:?} {} failed (seq {}), newer request owns the module",
                    ticket.intent, ticket.module, ticket.seq
                );
            }
        }
    }

    // === Helpers ===

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.options.request_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::unreachable(format!(
                "no response within {}s",
                timeout.as_secs_f64()
            ))),
        }
    }

    async fn persist(&self, inner: &Inner) {
        let ids: Vec<ModuleId> = inner.state.settled().into_iter().collect();
        if let Err(e) = self.cache.save(&ids).await {
            warn!("Failed to write install cache: {}", e);
        }
    }

    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.snapshot());
    }
}

/// The backend refused because the relation is already in the target state.
fn already_satisfied(intent: Intent, err: &ClientError) -> bool {
    matches!(
        (intent, err),
        (Intent::Install, ClientError::Conflict { .. })
            | (Intent::Uninstall, ClientError::NotFound { .. })
    )
}

async fn load_cache(cache: &dyn InstallCache) -> Vec<ModuleId> {
    match cache.load().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Failed to read install cache, starting empty: {}", e);
            Vec::new()
        }
    }
}
