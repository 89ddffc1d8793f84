use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use toolkit_types::{MessageResponse, Module, PasswordChange, ProfileUpdate, UserProjection};
use tracing::info;

use crate::auth::{AuthUser, hash_password, verify_password};
use crate::error::ApiError;
use crate::routes::auth::MIN_PASSWORD_LEN;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route("/password", put(change_password))
        .route("/modules", get(installed_modules))
}

async fn profile(
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

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProjection>, ApiError> {
    // Empty strings mean "leave unchanged".
    let update = ProfileUpdate {
        username: update.username.filter(|u| !u.trim().is_empty()),
        email: update.email.filter(|e| !e.trim().is_empty()),
    };

    let user = state.storage.update_profile(user_id, &update).await?;
    let installed = state.storage.installed_module_ids(user_id).await?;
    Ok(Json(user.projection(installed)))
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(change): Json<PasswordChange>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .storage
        .get_user(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if !verify_password(change.current_password, user.password_hash).await? {
        return Err(ApiError::WrongPassword);
    }
    if change.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let hash = hash_password(change.new_password).await?;
    state.storage.set_password_hash(user_id, &hash).await?;
    info!("User {} changed their password", user_id);

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

async fn installed_modules(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Module>>, ApiError> {
    Ok(Json(state.storage.installed_modules(user_id).await?))
}
