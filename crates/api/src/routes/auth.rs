use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use toolkit_storage::NewUser;
use toolkit_types::{AuthResponse, LoginRequest, RegisterRequest, UserProjection};
use tracing::info;

use crate::auth::{AuthUser, hash_password, verify_password};
use crate::error::ApiError;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/user", get(current_user))
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash_password(request.password).await?;
    let user = state
        .storage
        .create_user(&NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash,
        })
        .await?;

    info!("Registered user {} ({})", user.username, user.id);
    let token = state.tokens.issue(user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: user.projection(Vec::new()),
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .storage
        .find_user_by_username(&request.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(request.password, user.password_hash.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let installed = state.storage.installed_module_ids(user.id).await?;
    let token = state.tokens.issue(user.id)?;
    info!("User {} logged in", user.id);

    Ok(Json(AuthResponse {
        token,
        user: user.projection(installed),
    }))
}

async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProjection>, ApiError> {
    let user = state
        .storage
        .get_user(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    let installed = state.storage.installed_module_ids(user_id).await?;
    Ok(Json(user.projection(installed)))
}
