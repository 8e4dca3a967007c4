//! WHOOP Integration
//!
//! OAuth 2.0 integration with the WHOOP developer API for:
//! - Authorization-code login and token refresh
//! - Sleep records (wake times feed the coffee reminder)
//! - Basic profile (stored on the user record)

mod client;
mod types;

pub use client::{WhoopClient, WhoopClientConfig, MAX_PAGE_SIZE, MIN_STATE_LEN, SCOPES};
pub use types::{
    parse_offset, SleepCollection, SleepRecord, SleepScore, TokenSet, WhoopProfile,
    REFRESH_MARGIN_MINUTES,
};

use async_trait::async_trait;
use thiserror::Error;

/// Operations Light90 performs against WHOOP
#[async_trait]
pub trait WhoopApi: Send + Sync {
    /// URL the browser is redirected to for consent
    fn authorize_url(&self, state: &str) -> String;

    /// Trade an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, WhoopError>;

    /// Trade a refresh token for a new token set
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, WhoopError>;

    /// Most recent sleep records, newest first
    async fn sleep(&self, access_token: &str, limit: u32) -> Result<SleepCollection, WhoopError>;

    /// Basic profile of the token's owner
    async fn profile(&self, access_token: &str) -> Result<WhoopProfile, WhoopError>;
}

/// Errors that can occur when talking to WHOOP
#[derive(Error, Debug)]
pub enum WhoopError {
    #[error("WHOOP unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("WHOOP API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request timeout")]
    Timeout,
}
