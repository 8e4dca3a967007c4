//! Light90 REST API
//!
//! HTTP API layer for Light90, built with Axum.
//!
//! # Endpoints
//!
//! ## Auth
//! - `GET /auth/whoop` - Start WHOOP OAuth login
//! - `GET /auth/whoop/callback` - OAuth callback
//! - `GET /auth/status` - Session login state
//! - `GET /auth/logout` - End the session
//!
//! ## Data
//! - `GET /api/v1/sleep` - Recent sleep records
//! - `GET /api/v1/profile` - WHOOP basic profile
//! - `GET /api/v1/schedule/status` - Next sunlight and coffee reminders
//!
//! ## Health
//! - `GET /health` - Full health status
//! - `GET /health/live` - Liveness probe
//!
//! # Example
//!
//! ```rust,ignore
//! use light90::api::{serve, ApiConfig, AppState};
//! use light90::schedule::ReminderScheduler;
//! use light90::session::SessionStore;
//! use light90::store::UserStore;
//! use light90::whoop::{WhoopClient, WhoopClientConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let whoop = Arc::new(WhoopClient::new(WhoopClientConfig::default())?);
//!     let users = UserStore::open("users.db")?;
//!     let sessions = Arc::new(SessionStore::new(chrono::Duration::days(7)));
//!     let scheduler = Arc::new(ReminderScheduler::default());
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(whoop, users, sessions, scheduler, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiQuery, AuthUser};
pub use state::{ApiConfig, AppState};

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/sleep", get(routes::sleep::get_sleep))
        .route("/profile", get(routes::profile::get_profile))
        .route("/schedule/status", get(routes::schedule::schedule_status));

    let auth_routes = Router::new()
        .route("/whoop", get(routes::auth::login))
        .route("/whoop/callback", get(routes::auth::callback))
        .route("/status", get(routes::auth::status))
        .route("/logout", get(routes::auth::logout));

    let health_routes = Router::new()
        .route("/", get(routes::health::full_health))
        .route("/live", get(routes::health::liveness));

    let cors = cors_layer(&state.config.client_url);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/auth", auth_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS for the front end; cookies require an explicit origin
fn cors_layer(client_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    match HeaderValue::from_str(client_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Invalid CLIENT_URL {:?} for CORS: {}", client_url, e);
            layer
        }
    }
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Light90 API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Light90 API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
