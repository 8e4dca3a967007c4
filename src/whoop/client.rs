//! WHOOP REST API Client
//!
//! OAuth 2.0 authorization-code flow plus the two read endpoints Light90
//! needs (sleep collection and basic profile).
//!
//! WHOOP's token endpoint expects the client credentials in the form body
//! rather than in an `Authorization: Basic` header.

use super::types::{SleepCollection, TokenResponse, TokenSet, WhoopProfile};
use super::{WhoopApi, WhoopError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Scopes requested during authorization
pub const SCOPES: &str = "offline read:sleep read:profile";

/// WHOOP rejects `state` values shorter than this
pub const MIN_STATE_LEN: usize = 8;

/// Upper bound WHOOP accepts for `limit` on collection endpoints
pub const MAX_PAGE_SIZE: u32 = 25;

/// Configuration for the WHOOP client
#[derive(Debug, Clone)]
pub struct WhoopClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// e.g. `https://api.prod.whoop.com`
    pub api_base: String,
    pub request_timeout_ms: u64,
}

impl Default for WhoopClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:5000/auth/whoop/callback".to_string(),
            api_base: "https://api.prod.whoop.com".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl From<&crate::config::WhoopConfig> for WhoopClientConfig {
    fn from(config: &crate::config::WhoopConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            request_timeout_ms: config.request_timeout_secs * 1000,
        }
    }
}

/// HTTP client for the WHOOP API
pub struct WhoopClient {
    client: Client,
    config: WhoopClientConfig,
}

impl WhoopClient {
    /// Create a new WHOOP client with the given configuration
    pub fn new(config: WhoopClientConfig) -> Result<Self, WhoopError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WhoopClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenSet, WhoopError> {
        let response = self
            .client
            .post(self.url("/oauth/oauth2/token"))
            .form(form)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status, body = %text, "WHOOP token request rejected");
            return Err(WhoopError::Api {
                status,
                message: token_error_message(&text),
            });
        }

        let token: TokenResponse = parse_json(response).await?;
        token.into_token_set(Utc::now())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, WhoopError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(WhoopError::Api {
                status,
                message: if text.is_empty() {
                    format!("WHOOP API returned {}", status)
                } else {
                    text
                },
            });
        }

        parse_json(response).await
    }
}

#[async_trait]
impl WhoopApi for WhoopClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/oauth/oauth2/auth?\
             response_type=code&\
             client_id={}&\
             redirect_uri={}&\
             scope={}&\
             state={}",
            self.config.api_base,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, WhoopError> {
        if code.is_empty() {
            return Err(WhoopError::AuthFailed("missing authorization code".into()));
        }

        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, WhoopError> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", "offline"),
        ])
        .await
    }

    async fn sleep(&self, access_token: &str, limit: u32) -> Result<SleepCollection, WhoopError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        self.get_json(
            "/developer/v1/activity/sleep",
            access_token,
            &[("limit", limit.to_string())],
        )
        .await
    }

    async fn profile(&self, access_token: &str) -> Result<WhoopProfile, WhoopError> {
        self.get_json("/developer/v1/user/profile/basic", access_token, &[])
            .await
    }
}

fn map_send_error(e: reqwest::Error) -> WhoopError {
    if e.is_timeout() {
        WhoopError::Timeout
    } else if e.is_connect() {
        WhoopError::Unavailable
    } else {
        WhoopError::Request(e)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, WhoopError> {
    let text = response.text().await.map_err(map_send_error)?;
    serde_json::from_str(&text).map_err(|e| WhoopError::Parse(e.to_string()))
}

/// Pull `error_description` / `error` out of an OAuth error body
fn token_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct OAuthError {
        error: Option<String>,
        error_description: Option<String>,
    }

    match serde_json::from_str::<OAuthError>(body) {
        Ok(OAuthError {
            error_description: Some(desc),
            ..
        }) => desc,
        Ok(OAuthError {
            error: Some(err), ..
        }) => err,
        _ if body.is_empty() => "token request failed".to_string(),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> WhoopClient {
        WhoopClient::new(WhoopClientConfig {
            client_id: "light90-client".into(),
            client_secret: "s3cret".into(),
            redirect_uri: "http://localhost:5000/auth/whoop/callback".into(),
            api_base: server.base_url(),
            request_timeout_ms: 5_000,
        })
        .unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let client = WhoopClient::new(WhoopClientConfig {
            client_id: "abc".into(),
            ..Default::default()
        })
        .unwrap();

        let url = client.authorize_url("state-1234");
        assert!(url.starts_with("https://api.prod.whoop.com/oauth/oauth2/auth?response_type=code&"));
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("scope=offline%20read%3Asleep%20read%3Aprofile"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fwhoop%2Fcallback"
        ));
        assert!(url.ends_with("state=state-1234"));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_credentials_in_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/oauth2/token")
                    .body_contains("grant_type=authorization_code")
                    .body_contains("code=the-code")
                    .body_contains("client_id=light90-client")
                    .body_contains("client_secret=s3cret");
                then.status(200).json_body(json!({
                    "access_token": "access-1",
                    "refresh_token": "refresh-1",
                    "expires_in": 3600,
                    "scope": "offline read:sleep read:profile",
                    "token_type": "bearer"
                }));
            })
            .await;

        let client = client_for(&server);
        let tokens = client.exchange_code("the-code").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token, "access-1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));
        assert!(!tokens.needs_refresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_exchange_code_error_passthrough() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/oauth2/token");
                then.status(400).json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "The authorization code has expired"
                }));
            })
            .await;

        let client = client_for(&server);
        let err = client.exchange_code("stale").await.unwrap_err();

        match err {
            WhoopError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "The authorization code has expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_rejects_empty_code() {
        let client = WhoopClient::new(WhoopClientConfig::default()).unwrap();
        let err = client.exchange_code("").await.unwrap_err();
        assert!(matches!(err, WhoopError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_refresh() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/oauth2/token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=refresh-1")
                    .body_contains("scope=offline");
                then.status(200).json_body(json!({
                    "access_token": "access-2",
                    "refresh_token": "refresh-2",
                    "expires_in": 3600
                }));
            })
            .await;

        let client = client_for(&server);
        let tokens = client.refresh("refresh-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token, "access-2");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_sleep() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/developer/v1/activity/sleep")
                    .query_param("limit", "25")
                    .header("authorization", "Bearer access-1");
                then.status(200).json_body(json!({
                    "records": [{
                        "id": 1,
                        "user_id": 7,
                        "start": "2024-03-01T04:00:00Z",
                        "end": "2024-03-01T12:00:00Z",
                        "timezone_offset": "-05:00",
                        "nap": false,
                        "score_state": "SCORED",
                        "score": {"sleep_performance_percentage": 91}
                    }],
                    "next_token": "page-2"
                }));
            })
            .await;

        let client = client_for(&server);
        // Clamped to the page size WHOOP allows
        let page = client.sleep("access-1", 100).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next_token.as_deref(), Some("page-2"));
        assert_eq!(page.records[0].performance(), Some(91.0));
    }

    #[tokio::test]
    async fn test_profile_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/developer/v1/user/profile/basic");
                then.status(401).body("Authorization was not valid");
            })
            .await;

        let client = client_for(&server);
        let err = client.profile("expired").await.unwrap_err();
        assert!(matches!(err, WhoopError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_profile() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/developer/v1/user/profile/basic");
                then.status(200).json_body(json!({
                    "user_id": 10129,
                    "email": "jsmith123@whoop.com",
                    "first_name": "John",
                    "last_name": "Smith"
                }));
            })
            .await;

        let client = client_for(&server);
        let profile = client.profile("access-1").await.unwrap();
        assert_eq!(profile.user_id, 10129);
        assert_eq!(profile.first_name, "John");
    }

    #[test]
    fn test_token_error_message() {
        assert_eq!(token_error_message(r#"{"error":"invalid_client"}"#), "invalid_client");
        assert_eq!(token_error_message(""), "token request failed");
        assert_eq!(token_error_message("Bad Gateway"), "Bad Gateway");
    }
}
