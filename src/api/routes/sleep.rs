//! Sleep Routes
//!
//! - GET /api/v1/sleep - Recent WHOOP sleep records

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{SleepQuery, SleepResponse};
use crate::api::error::ApiResult;
use crate::api::extract::{ApiQuery, AuthUser};
use crate::api::state::AppState;
use crate::whoop::MAX_PAGE_SIZE;

/// Records returned when the client does not ask for a count
pub const DEFAULT_SLEEP_LIMIT: u32 = 7;

/// GET /api/v1/sleep?limit=N
///
/// Proxies WHOOP's sleep collection. When the user already has a reminder
/// schedule and the page covers the whole sleep window, the schedule is
/// recomputed from the newest `sleep_window` records.
pub async fn get_sleep(
    State(state): State<Arc<AppState>>,
    mut auth: AuthUser,
    ApiQuery(query): ApiQuery<SleepQuery>,
) -> ApiResult<Json<SleepResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SLEEP_LIMIT)
        .clamp(1, MAX_PAGE_SIZE);

    let access_token = auth.access_token(&state).await?;
    let page = state.whoop.sleep(&access_token, limit).await?;

    let user_id = auth.user.whoop_user_id;
    tracing::debug!(user_id, records = page.records.len(), "Fetched sleep records");

    let window = state.config.sleep_window.clamp(1, MAX_PAGE_SIZE);
    if limit >= window {
        if let Some(location) = state.scheduler.location(user_id).await {
            let records = page.records.iter().take(window as usize).cloned().collect();
            state
                .scheduler
                .update(user_id, records, location, Utc::now())
                .await;
        }
    }

    Ok(Json(SleepResponse {
        records: page.records,
        next_token: page.next_token,
    }))
}
