use axum::{Json, Router, routing::get};
use toolkit_types::{
    AuthResponse, ErrorBody, InstallResponse, LoginRequest, Module, NewModule, RegisterRequest,
    UserProjection,
};

use crate::state::AppState;

pub mod auth;
pub mod modules;
pub mod users;

/// Every route served under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/schema", get(schema))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/modules", modules::router())
}

/// JSON schemas of the wire types, keyed by type name.
async fn schema() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "Module": schemars::schema_for!(Module),
        "NewModule": schemars::schema_for!(NewModule),
        "UserProjection": schemars::schema_for!(UserProjection),
        "RegisterRequest": schemars::schema_for!(RegisterRequest),
        "LoginRequest": schemars::schema_for!(LoginRequest),
        "AuthResponse": schemars::schema_for!(AuthResponse),
        "InstallResponse": schemars::schema_for!(InstallResponse),
        "ErrorBody": schemars::schema_for!(ErrorBody),
    }))
}
