//! Profile Routes
//!
//! - GET /api/v1/profile - WHOOP basic profile of the logged-in user

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::whoop::WhoopProfile;

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    mut auth: AuthUser,
) -> ApiResult<Json<WhoopProfile>> {
    let access_token = auth.access_token(&state).await?;
    let profile = state.whoop.profile(&access_token).await?;
    Ok(Json(profile))
}
