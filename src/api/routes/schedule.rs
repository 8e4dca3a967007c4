//! Schedule Routes
//!
//! - GET /api/v1/schedule/status - Next sunlight and coffee reminders

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{ScheduleQuery, ScheduleStatusResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiQuery, AuthUser};
use crate::api::state::AppState;
use crate::schedule::Location;
use crate::whoop::MAX_PAGE_SIZE;

/// GET /api/v1/schedule/status?lat=..&lng=..&refresh=..
///
/// Location comes from the query, then the user's previous request, then
/// the configured default. Sleep data is refetched when the user has no
/// schedule yet, the location changed, or `refresh=true`.
pub async fn schedule_status(
    State(state): State<Arc<AppState>>,
    mut auth: AuthUser,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> ApiResult<Json<ScheduleStatusResponse>> {
    let requested = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            Some(Location::new(lat, lng).map_err(|e| ApiError::Validation(e.to_string()))?)
        }
        (None, None) => None,
        _ => {
            return Err(ApiError::Validation(
                "lat and lng must be given together".to_string(),
            ))
        }
    };

    let user_id = auth.user.whoop_user_id;
    let known = state.scheduler.location(user_id).await;
    let location = requested
        .or(known.flatten())
        .or(state.config.default_location);

    let now = Utc::now();
    let current = state.scheduler.status(user_id).await;
    let stale = query.refresh || known != Some(location);

    let status = match current {
        Some(status) if !stale => status,
        _ => {
            let access_token = auth.access_token(&state).await?;
            let limit = state.config.sleep_window.clamp(1, MAX_PAGE_SIZE);
            let page = state.whoop.sleep(&access_token, limit).await?;

            tracing::info!(
                user_id,
                records = page.records.len(),
                has_location = location.is_some(),
                "Computing reminder schedule"
            );

            state
                .scheduler
                .update(user_id, page.records, location, now)
                .await
        }
    };

    Ok(Json(ScheduleStatusResponse { now, status }))
}
