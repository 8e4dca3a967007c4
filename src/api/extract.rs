//! Request extractors
//!
//! `AuthUser` resolves the session cookie to a stored user and rejects the
//! request with 401 otherwise. `ApiQuery` is `Query` with a JSON rejection.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::session::{self, Session};
use crate::store::User;

/// The logged-in user behind the request
pub struct AuthUser {
    pub session: Session,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = current_session(&parts.headers, state)
            .await
            .ok_or(ApiError::Unauthorized)?;
        let user_id = session.user_id.ok_or(ApiError::Unauthorized)?;

        let user = state.users.get(user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id, "Session refers to unknown user");
            ApiError::Unauthorized
        })?;

        Ok(AuthUser { session, user })
    }
}

/// Session named by the request's cookie, if it is still live
pub async fn current_session(
    headers: &axum::http::HeaderMap,
    state: &AppState,
) -> Option<Session> {
    let id = session::session_id(headers)?;
    state.sessions.get(&id).await
}

impl AuthUser {
    /// Valid access token, refreshing (and persisting) it when close to expiry
    pub async fn access_token(&mut self, state: &AppState) -> ApiResult<String> {
        if !self.user.tokens.needs_refresh(Utc::now()) {
            return Ok(self.user.tokens.access_token.clone());
        }

        let refresh_token = self.user.tokens.refresh_token.clone().ok_or_else(|| {
            tracing::info!(
                user_id = self.user.whoop_user_id,
                "Access token expired without refresh token"
            );
            ApiError::Unauthorized
        })?;

        tracing::debug!(user_id = self.user.whoop_user_id, "Refreshing WHOOP access token");
        let mut tokens = state.whoop.refresh(&refresh_token).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token);
        }

        state
            .users
            .update_tokens(self.user.whoop_user_id, tokens.clone())
            .await?;

        let access_token = tokens.access_token.clone();
        self.user.tokens = tokens;
        Ok(access_token)
    }
}

/// Query string extractor that rejects with a `{"error": ..}` body
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
