//! Health Routes
//!
//! Health check endpoints for monitoring.
//!
//! - GET /health - Full health status
//! - GET /health/live - Liveness probe (process is alive)

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let users = match state.users.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("User store health check failed: {}", e);
            None
        }
    };

    let database_ok = users.is_some();

    Json(HealthResponse {
        status: if database_ok { "ok" } else { "degraded" }.to_string(),
        database: if database_ok { "ok" } else { "error" }.to_string(),
        sessions: state.sessions.len().await,
        scheduled_users: state.scheduler.len().await,
        users,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
