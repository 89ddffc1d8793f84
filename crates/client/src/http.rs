//! reqwest-backed [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use toolkit_types::{
    AUTH_HEADER, AuthResponse, ErrorBody, InstallResponse, LoginRequest, Module, ModuleId,
    RegisterRequest, UserProjection,
};
use tracing::debug;
use url::Url;

use crate::backend::Backend;
use crate::error::{ClientError, Result};

pub const USER_AGENT: &str = concat!("toolkit-client/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to the toolkit API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| ClientError::InvalidConfig {
            message: format!("invalid API url '{}': {}", base_url, e),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::InvalidConfig {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> Result<RequestBuilder> {
        let url = self.base.join(path).map_err(|e| ClientError::InvalidConfig {
            message: format!("invalid endpoint '{}': {}", path, e),
        })?;
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url);
        if let Some(token) = token {
            builder = builder.header(AUTH_HEADER, token);
        }
        Ok(builder)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let bytes = response.bytes().await?;
    let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| ErrorBody {
        message: String::from_utf8_lossy(&bytes).trim().to_string(),
        code: String::new(),
    });
    debug!("Backend answered {}: {}", status, body.message);
    Err(ClientError::from_response(status.as_u16(), body))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_modules(&self) -> Result<Vec<Module>> {
        let response = self.request(Method::GET, "modules", None)?.send().await?;
        decode(response).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response = self
            .request(Method::POST, "auth/register", None)?
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let response = self
            .request(Method::POST, "auth/login", None)?
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn current_user(&self, token: &str) -> Result<UserProjection> {
        let response = self
            .request(Method::GET, "auth/user", Some(token))?
            .send()
            .await?;
        decode(response).await
    }

    async fn install(&self, token: &str, module: ModuleId) -> Result<InstallResponse> {
        let path = format!("modules/{}/install", module);
        let response = self
            .request(Method::POST, &path, Some(token))?
            .send()
            .await?;
        decode(response).await
    }

    async fn uninstall(&self, token: &str, module: ModuleId) -> Result<InstallResponse> {
        let path = format!("modules/{}/uninstall", module);
        let response = self
            .request(Method::DELETE, &path, Some(token))?
            .send()
            .await?;
        decode(response).await
    }
}
