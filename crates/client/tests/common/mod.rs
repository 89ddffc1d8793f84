#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use toolkit_client::{Backend, ClientError, Result};
use toolkit_types::{
    AuthResponse, Category, InstallResponse, LoginRequest, Module, ModuleId, RegisterRequest,
    UserId, UserProjection,
};

pub const TOKEN: &str = "valid-token";

pub fn user(installed: impl IntoIterator<Item = ModuleId>) -> UserProjection {
    UserProjection {
        id: UserId(1),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        created_at: None,
        updated_at: None,
        installed_modules: installed.into_iter().collect(),
    }
}

pub fn install_response(installed: impl IntoIterator<Item = ModuleId>) -> InstallResponse {
    let installed: Vec<ModuleId> = installed.into_iter().collect();
    InstallResponse {
        message: "ok".to_string(),
        user: user(installed.clone()),
        installed_modules: installed,
    }
}

pub fn module(id: i64, name: &str, downloads: i64) -> Module {
    let now = Utc::now();
    Module {
        id: ModuleId(id),
        name: name.to_string(),
        description: format!("{} description", name),
        category: Category::Utility,
        content: "content".to_string(),
        tags: Vec::new(),
        downloads,
        created_at: now,
        updated_at: now,
    }
}

pub fn unreachable() -> ClientError {
    ClientError::NetworkUnreachable {
        message: "connection refused".to_string(),
        source: None,
    }
}

#[derive(Debug, Default)]
struct ServerState {
    modules: BTreeMap<ModuleId, Module>,
    installed: BTreeSet<ModuleId>,
    token_valid: bool,
    failing: bool,
}

/// Backend with the server's install semantics for a single principal.
#[derive(Debug)]
pub struct FakeServer {
    state: Mutex<ServerState>,
    install_calls: AtomicUsize,
}

impl FakeServer {
    pub fn new(modules: Vec<Module>) -> Self {
        Self {
            state: Mutex::new(ServerState {
                modules: modules.into_iter().map(|m| (m.id, m)).collect(),
                installed: BTreeSet::new(),
                token_valid: true,
                failing: false,
            }),
            install_calls: AtomicUsize::new(0),
        }
    }

    pub fn downloads(&self, id: i64) -> i64 {
        self.state.lock().unwrap().modules[&ModuleId(id)].downloads
    }

    /// Install/uninstall calls received, including failed ones.
    pub fn install_calls(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn revoke_token(&self) {
        self.state.lock().unwrap().token_valid = false;
    }

    /// Install behind the client's back, as another device would.
    pub fn install_elsewhere(&self, id: i64) {
        self.state.lock().unwrap().installed.insert(ModuleId(id));
    }

    fn check(&self, token: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(ClientError::ServerError {
                status: 500,
                message: "boom".to_string(),
            });
        }
        if token != TOKEN || !state.token_valid {
            return Err(ClientError::Unauthenticated);
        }
        Ok(())
    }

    fn auth_response(&self) -> AuthResponse {
        let state = self.state.lock().unwrap();
        AuthResponse {
            token: TOKEN.to_string(),
            user: user(state.installed.iter().copied()),
        }
    }
}

#[async_trait]
impl Backend for FakeServer {
    async fn list_modules(&self) -> Result<Vec<Module>> {
        Ok(self.state.lock().unwrap().modules.values().cloned().collect())
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse> {
        Ok(self.auth_response())
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        if request.password != "secret123" {
            return Err(ClientError::Rejected {
                status: 400,
                code: "invalid_credentials".to_string(),
                message: "Invalid credentials".to_string(),
            });
        }
        Ok(self.auth_response())
    }

    async fn current_user(&self, token: &str) -> Result<UserProjection> {
        self.check(token)?;
        Ok(self.auth_response().user)
    }

    async fn install(&self, token: &str, id: ModuleId) -> Result<InstallResponse> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        self.check(token)?;

        let mut state = self.state.lock().unwrap();
        if !state.modules.contains_key(&id) {
            return Err(ClientError::NotFound {
                message: format!("Module not found: {}", id),
            });
        }
        if !state.installed.insert(id) {
            return Err(ClientError::Conflict {
                message: "Module is already installed".to_string(),
            });
        }
        if let Some(module) = state.modules.get_mut(&id) {
            module.downloads += 1;
        }
        Ok(install_response(state.installed.iter().copied()))
    }

    async fn uninstall(&self, token: &str, id: ModuleId) -> Result<InstallResponse> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        self.check(token)?;

        let mut state = self.state.lock().unwrap();
        if !state.installed.remove(&id) {
            return Err(ClientError::NotFound {
                message: "Module is not installed".to_string(),
            });
        }
        Ok(install_response(state.installed.iter().copied()))
    }
}

/// One install or uninstall request waiting for the test to answer it.
pub struct Call {
    pub module: ModuleId,
    pub install: bool,
    pub reply: oneshot::Sender<Result<InstallResponse>>,
}

/// Backend whose install and uninstall responses are supplied by the test,
/// in whatever order the test chooses.
pub struct ScriptedBackend {
    calls: mpsc::UnboundedSender<Call>,
}

impl ScriptedBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (Self { calls }, rx)
    }

    async fn call(&self, module: ModuleId, install: bool) -> Result<InstallResponse> {
        let (reply, rx) = oneshot::channel();
        self.calls
            .send(Call {
                module,
                install,
                reply,
            })
            .map_err(|_| unreachable())?;
        rx.await.unwrap_or_else(|_| Err(unreachable()))
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn list_modules(&self) -> Result<Vec<Module>> {
        Err(unreachable())
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse> {
        Ok(AuthResponse {
            token: TOKEN.to_string(),
            user: user([]),
        })
    }

    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse> {
        Ok(AuthResponse {
            token: TOKEN.to_string(),
            user: user([]),
        })
    }

    async fn current_user(&self, _token: &str) -> Result<UserProjection> {
        Ok(user([]))
    }

    async fn install(&self, _token: &str, module: ModuleId) -> Result<InstallResponse> {
        self.call(module, true).await
    }

    async fn uninstall(&self, _token: &str, module: ModuleId) -> Result<InstallResponse> {
        self.call(module, false).await
    }
}
