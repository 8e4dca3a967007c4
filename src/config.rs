//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub whoop: WhoopConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Front-end origin; used for CORS and post-login redirects
    #[serde(default = "default_client_url")]
    pub client_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_client_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_url: default_client_url(),
        }
    }
}

/// WHOOP OAuth application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WhoopConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_redirect_uri() -> String {
    "http://localhost:5000/auth/whoop/callback".to_string()
}

fn default_api_base() -> String {
    "https://api.prod.whoop.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for WhoopConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_session_ttl")]
    pub ttl_hours: u64,

    /// Lifetime of a session that has started but not finished login
    #[serde(default = "default_login_ttl")]
    pub login_ttl_minutes: u64,

    /// Accepted for deployment compatibility; sessions are kept in process
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_session_ttl() -> u64 {
    24 * 7
}

fn default_login_ttl() -> u64 {
    crate::session::DEFAULT_LOGIN_TTL_MINUTES as u64
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_hours: default_session_ttl(),
            login_ttl_minutes: default_login_ttl(),
            redis_url: None,
        }
    }
}

/// User database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("light90").join("users.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./light90_data/users.db".to_string())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Reminder scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes before sunrise for the sunlight reminder
    #[serde(default = "default_sunlight_offset")]
    pub sunlight_offset_minutes: i64,

    /// Minutes after average wake for the coffee reminder
    #[serde(default = "default_coffee_offset")]
    pub coffee_offset_minutes: i64,

    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Number of sleep records averaged for the wake time
    #[serde(default = "default_sleep_window")]
    pub sleep_window: u32,

    /// Fallback location when the client sends none
    #[serde(default)]
    pub default_latitude: Option<f64>,

    #[serde(default)]
    pub default_longitude: Option<f64>,
}

fn default_sunlight_offset() -> i64 {
    30
}

fn default_coffee_offset() -> i64 {
    90
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_sleep_window() -> u32 {
    7
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sunlight_offset_minutes: default_sunlight_offset(),
            coffee_offset_minutes: default_coffee_offset(),
            tick_interval_ms: default_tick_interval(),
            sleep_window: default_sleep_window(),
            default_latitude: None,
            default_longitude: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("light90").join("config.toml")),
            Some(PathBuf::from("/etc/light90/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check that everything needed to talk to WHOOP is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.whoop.client_id.is_empty() {
            return Err(ConfigError::Missing("WHOOP_CLIENT_ID".into()));
        }
        if self.whoop.client_secret.is_empty() {
            return Err(ConfigError::Missing("WHOOP_CLIENT_SECRET".into()));
        }
        if self.session.secret.is_empty() {
            return Err(ConfigError::Missing("SESSION_SECRET".into()));
        }
        if self.session.secret.len() < 16 {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET must be at least 16 characters".into(),
            ));
        }
        if let (Some(lat), Some(lng)) =
            (self.schedule.default_latitude, self.schedule.default_longitude)
        {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(ConfigError::Invalid(format!(
                    "default location out of range: {}, {}",
                    lat, lng
                )));
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(client_url) = lookup("CLIENT_URL") {
            self.server.client_url = client_url.trim_end_matches('/').to_string();
        }

        // WHOOP overrides
        if let Some(client_id) = lookup("WHOOP_CLIENT_ID") {
            self.whoop.client_id = client_id;
        }
        if let Some(client_secret) = lookup("WHOOP_CLIENT_SECRET") {
            self.whoop.client_secret = client_secret;
        }
        if let Some(redirect_uri) = lookup("REDIRECT_URI") {
            self.whoop.redirect_uri = redirect_uri;
        }

        // Session overrides
        if let Some(secret) = lookup("SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Some(redis_url) = lookup("REDIS_URL") {
            self.session.redis_url = Some(redis_url);
        }

        if let Some(path) = lookup("LIGHT90_DATABASE_PATH") {
            self.database.path = path;
        }

        // Schedule overrides
        if let Some(lat) = lookup("LIGHT90_LATITUDE").and_then(|s| s.parse().ok()) {
            self.schedule.default_latitude = Some(lat);
        }
        if let Some(lng) = lookup("LIGHT90_LONGITUDE").and_then(|s| s.parse().ok()) {
            self.schedule.default_longitude = Some(lng);
        }

        // Logging overrides
        if let Some(level) = lookup("LIGHT90_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LIGHT90_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Light90 Configuration
#
# Environment variables override these settings:
# - HOST, PORT, CLIENT_URL
# - WHOOP_CLIENT_ID, WHOOP_CLIENT_SECRET, REDIRECT_URI
# - SESSION_SECRET, REDIS_URL
# - LIGHT90_DATABASE_PATH
# - LIGHT90_LATITUDE, LIGHT90_LONGITUDE
# - LIGHT90_LOG_LEVEL, LIGHT90_LOG_FORMAT

[server]
# API server host
host = "0.0.0.0"

# API server port
port = 5000

# Front-end origin (CORS + post-login redirect)
client_url = "http://localhost:3000"

[whoop]
# WHOOP OAuth credentials (get from developer.whoop.com)
client_id = ""
client_secret = ""

# OAuth callback URL registered with WHOOP
redirect_uri = "http://localhost:5000/auth/whoop/callback"

# WHOOP API base URL
api_base = "https://api.prod.whoop.com"

# Request timeout in seconds
request_timeout_secs = 30

[session]
# Required, at least 16 characters
secret = ""

# Session lifetime in hours
ttl_hours = 168

# Minutes a browser has to finish the WHOOP login
login_ttl_minutes = 10

[database]
# SQLite file holding user records (default: platform data dir)
path = "./light90_data/users.db"

[schedule]
# Sunlight reminder: minutes before sunrise
sunlight_offset_minutes = 30

# Coffee reminder: minutes after average wake time
coffee_offset_minutes = 90

# Reminder check interval (ms)
tick_interval_ms = 1000

# Sleep records averaged for the wake time
sleep_window = 7

# Fallback location when the client sends none
# default_latitude = 40.7128
# default_longitude = -74.0060

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
