//! HTTP backend for the developer toolkit.
//!
//! Serves the module catalog, principal accounts and the install relation
//! between them under `/api`. Authenticated routes read a token from the
//! `x-auth-token` header.

use std::time::Duration;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::get,
};
use tokio::net::TcpListener;
use toolkit_types::AUTH_HEADER;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span};
use uuid::Uuid;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

pub const BANNER: &str = "Developer toolkit API is running";

/// Assemble the full application: banner, `/api` routes, CORS and tracing.
pub fn build_router(state: AppState, cors_max_age: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(AUTH_HEADER)])
        .max_age(cors_max_age);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = Uuid::new_v4();
        info_span!(
            "request",
            %request_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .route("/", get(|| async { BANNER }))
        .nest("/api", routes::api_router())
        .layer(cors)
        .layer(trace)
        .with_state(state)
}

/// Build state from `config`, bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig) -> eyre::Result<()> {
    info!("Initializing state...");
    let state = AppState::from_config(&config).await?;
    let app = build_router(state, Duration::from_secs(config.cors_max_age_secs));

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
