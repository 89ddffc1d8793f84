use std::sync::Arc;

use async_trait::async_trait;
use toolkit_types::{
    AuthResponse, InstallResponse, LoginRequest, Module, ModuleId, RegisterRequest,
    UserProjection,
};

use crate::error::Result;

/// The backend operations the client core depends on.
///
/// [`crate::HttpBackend`] talks to the real service; tests substitute
/// scripted implementations to control timing and failures.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_modules(&self) -> Result<Vec<Module>>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;

    /// The principal behind `token`, with its installed module ids.
    async fn current_user(&self, token: &str) -> Result<UserProjection>;

    async fn install(&self, token: &str, module: ModuleId) -> Result<InstallResponse>;

    async fn uninstall(&self, token: &str, module: ModuleId) -> Result<InstallResponse>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn list_modules(&self) -> Result<Vec<Module>> {
        (**self).list_modules().await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        (**self).register(request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        (**self).login(request).await
    }

    async fn current_user(&self, token: &str) -> Result<UserProjection> {
        (**self).current_user(token).await
    }

    async fn install(&self, token: &str, module: ModuleId) -> Result<InstallResponse> {
        (**self).install(token, module).await
    }

    async fn uninstall(&self, token: &str, module: ModuleId) -> Result<InstallResponse> {
        (**self).uninstall(token, module).await
    }
}
