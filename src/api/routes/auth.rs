//! Auth Routes
//!
//! WHOOP OAuth 2.0 login and session status.
//!
//! - GET /auth/whoop - Redirect to WHOOP consent
//! - GET /auth/whoop/callback - OAuth callback, binds the session to a user
//! - GET /auth/status - Whether the session is logged in
//! - GET /auth/logout - Drop the session

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{AuthStatusResponse, CallbackQuery, UserDto};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{current_session, ApiQuery};
use crate::api::state::AppState;
use crate::session::{clear_cookie, session_cookie, Session};
use crate::store::User;
use crate::whoop::MIN_STATE_LEN;

/// GET /auth/whoop
///
/// Stores a fresh OAuth `state` on the session and redirects to WHOOP.
pub async fn login(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Response> {
    let (mut session, is_new) = match current_session(&headers, &state).await {
        Some(session) => (session, false),
        None => (state.sessions.create().await, true),
    };

    let oauth_state = uuid::Uuid::new_v4().simple().to_string();
    session.oauth_state = Some(oauth_state.clone());
    state.sessions.save(session.clone()).await;

    tracing::info!(session_id = %session.id, "Starting WHOOP login");

    let cookie = is_new.then(|| set_cookie(&state, &session));
    found(&state.whoop.authorize_url(&oauth_state), cookie)
}

/// GET /auth/whoop/callback
///
/// Always answers with a redirect to the front end: `/dashboard` on
/// success, `/?error=<reason>` otherwise.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> ApiResult<Response> {
    let client_url = state.config.client_url.clone();

    match complete_login(&state, &headers, query).await {
        Ok(session) => {
            let cookie = set_cookie(&state, &session);
            found(&format!("{}/dashboard", client_url), Some(cookie))
        }
        Err(failure) => {
            tracing::warn!(reason = failure.code(), error = %failure, "WHOOP login failed");
            found(
                &format!(
                    "{}/?error={}",
                    client_url,
                    urlencoding::encode(failure.code())
                ),
                None,
            )
        }
    }
}

/// GET /auth/status
pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthStatusResponse>> {
    let user_id = current_session(&headers, &state)
        .await
        .and_then(|s| s.user_id);

    let user = match user_id {
        Some(id) => state.users.get(id).await?,
        None => None,
    };

    Ok(Json(AuthStatusResponse {
        authenticated: user.is_some(),
        user: user.as_ref().map(UserDto::from),
    }))
}

/// GET /auth/logout
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(session) = current_session(&headers, &state).await {
        state.sessions.remove(&session.id).await;
        if let Some(user_id) = session.user_id {
            state.scheduler.remove(user_id).await;
            tracing::info!(user_id, "User logged out");
        }
    }

    found(
        &state.config.client_url,
        Some(clear_cookie(state.config.secure_cookies)),
    )
}

/// Why a callback did not produce a logged-in session
#[derive(Debug, thiserror::Error)]
enum LoginFailure {
    #[error("WHOOP denied access: {0}")]
    Denied(String),

    #[error("OAuth state missing or mismatched")]
    InvalidState,

    #[error("{0}")]
    Failed(#[from] ApiError),
}

impl LoginFailure {
    fn code(&self) -> &'static str {
        match self {
            LoginFailure::Denied(_) => "access_denied",
            LoginFailure::InvalidState => "invalid_state",
            LoginFailure::Failed(_) => "auth_failed",
        }
    }
}

async fn complete_login(
    state: &AppState,
    headers: &HeaderMap,
    query: CallbackQuery,
) -> Result<Session, LoginFailure> {
    let mut session = current_session(headers, state)
        .await
        .ok_or(LoginFailure::InvalidState)?;

    // A state value is good for one callback only
    let expected = session.oauth_state.take();
    state.sessions.save(session.clone()).await;

    if let Some(error) = query.error {
        return Err(LoginFailure::Denied(
            query.error_description.unwrap_or(error),
        ));
    }

    match (expected, query.state) {
        (Some(expected), Some(got)) if got.len() >= MIN_STATE_LEN && expected == got => {}
        _ => return Err(LoginFailure::InvalidState),
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("missing authorization code".into()))?;

    let tokens = state.whoop.exchange_code(&code).await.map_err(ApiError::from)?;
    let profile = state
        .whoop
        .profile(&tokens.access_token)
        .await
        .map_err(ApiError::from)?;

    let user = User::from_login(&profile, tokens).map_err(ApiError::from)?;
    let user = state.users.upsert(user).await.map_err(ApiError::from)?;

    // New id after login so a pre-login cookie cannot ride the session
    state.sessions.remove(&session.id).await;
    let mut session = state.sessions.create().await;
    session.user_id = Some(user.whoop_user_id);
    state.sessions.save(session.clone()).await;

    tracing::info!(user_id = user.whoop_user_id, "User logged in");
    Ok(session)
}

fn set_cookie(state: &AppState, session: &Session) -> String {
    session_cookie(
        &session.id,
        state.sessions.ttl().num_seconds(),
        state.config.secure_cookies,
    )
}

/// 302 redirect, optionally setting a cookie
fn found(location: &str, cookie: Option<String>) -> ApiResult<Response> {
    let location = HeaderValue::from_str(location)
        .map_err(|e| ApiError::Internal(format!("invalid redirect location: {}", e)))?;

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(header::LOCATION, location);

    if let Some(cookie) = cookie {
        let cookie = HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::Internal(format!("invalid cookie: {}", e)))?;
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}
