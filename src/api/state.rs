//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::Config;
use crate::schedule::{Location, ReminderScheduler};
use crate::session::SessionStore;
use crate::store::UserStore;
use crate::whoop::WhoopApi;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// WHOOP API client
    pub whoop: Arc<dyn WhoopApi>,
    /// Persistent user records
    pub users: UserStore,
    /// Browser sessions
    pub sessions: Arc<SessionStore>,
    /// Reminder state per user
    pub scheduler: Arc<ReminderScheduler>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        whoop: Arc<dyn WhoopApi>,
        users: UserStore,
        sessions: Arc<SessionStore>,
        scheduler: Arc<ReminderScheduler>,
        config: ApiConfig,
    ) -> Self {
        Self {
            whoop,
            users,
            sessions,
            scheduler,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Front-end origin, without trailing slash
    pub client_url: String,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    /// Sleep records fetched to average the wake time
    pub sleep_window: u32,
    /// Location used when the client sends none
    pub default_location: Option<Location>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            client_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
            sleep_window: 7,
            default_location: None,
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&Config> for ApiConfig {
    fn from(config: &Config) -> Self {
        let default_location = match (
            config.schedule.default_latitude,
            config.schedule.default_longitude,
        ) {
            (Some(lat), Some(lng)) => Location::new(lat, lng).ok(),
            _ => None,
        };

        let client_url = config.server.client_url.trim_end_matches('/').to_string();

        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            secure_cookies: client_url.starts_with("https://"),
            client_url,
            sleep_window: config.schedule.sleep_window,
            default_location,
        }
    }
}
