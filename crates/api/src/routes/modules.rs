//! Catalog endpoints and the install/uninstall pair.
//!
//! Install and uninstall answer with the principal's full installed set so a
//! client can replace its local view instead of patching it.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use toolkit_storage::ModuleFilter;
use toolkit_types::{
    Category, InstallResponse, MessageResponse, Module, ModuleId, ModuleUpdate, NewModule, UserId,
};
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules).post(create_module))
        .route(
            "/{id}",
            get(get_module).put(update_module).delete(delete_module),
        )
        .route("/category/{category}", get(modules_by_category))
        .route("/search/{query}", get(search_modules))
        .route("/{id}/install", post(install_module))
        .route("/{id}/uninstall", delete(uninstall_module))
}

async fn list_modules(State(state): State<AppState>) -> Result<Json<Vec<Module>>, ApiError> {
    Ok(Json(
        state.storage.list_modules(&ModuleFilter::default()).await?,
    ))
}

async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Module>, ApiError> {
    let id = ModuleId(id);
    state
        .storage
        .get_module(id)
        .await?
        .map(Json)
        .ok_or(ApiError::ModuleNotFound(id))
}

async fn create_module(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(module): Json<NewModule>,
) -> Result<Json<Module>, ApiError> {
    let module = state.storage.create_module(&module).await?;
    info!("User {} created module {} ({})", user_id, module.name, module.id);
    Ok(Json(module))
}

async fn update_module(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<ModuleUpdate>,
) -> Result<Json<Module>, ApiError> {
    Ok(Json(state.storage.update_module(ModuleId(id), &update).await?))
}

async fn delete_module(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = ModuleId(id);
    if !state.storage.delete_module(id).await? {
        return Err(ApiError::ModuleNotFound(id));
    }
    info!("User {} deleted module {}", user_id, id);
    Ok(Json(MessageResponse {
        message: "Module deleted".to_string(),
    }))
}

async fn modules_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Module>>, ApiError> {
    let category: Category = category
        .parse()
        .map_err(|e: toolkit_types::ParseCategoryError| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(
        state
            .storage
            .list_modules(&ModuleFilter::category(category))
            .await?,
    ))
}

async fn search_modules(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<Vec<Module>>, ApiError> {
    debug!("Searching modules for '{}'", query);
    Ok(Json(
        state.storage.list_modules(&ModuleFilter::text(query)).await?,
    ))
}

async fn install_module(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<InstallResponse>, ApiError> {
    let id = ModuleId(id);
    state.storage.install_module(user_id, id).await?;
    info!("User {} installed module {}", user_id, id);
    install_response(&state, user_id, "Module installed").await
}

async fn uninstall_module(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<InstallResponse>, ApiError> {
    let id = ModuleId(id);
    state.storage.uninstall_module(user_id, id).await?;
    info!("User {} uninstalled module {}", user_id, id);
    install_response(&state, user_id, "Module uninstalled").await
}

async fn install_response(
    state: &AppState,
    user_id: UserId,
    message: &str,
) -> Result<Json<InstallResponse>, ApiError> {
    let user = state
        .storage
        .get_user(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    let installed = state.storage.installed_module_ids(user_id).await?;

    Ok(Json(InstallResponse {
        message: message.to_string(),
        user: user.projection(installed.clone()),
        installed_modules: installed,
    }))
}
