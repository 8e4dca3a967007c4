//! Light90 API Server
//!
//! Run with: cargo run --bin light90
//!
//! # Configuration
//!
//! Read from `config.toml` (see `light90-cli config init`) with environment
//! overrides:
//! - `WHOOP_CLIENT_ID`, `WHOOP_CLIENT_SECRET`, `REDIRECT_URI`: WHOOP app credentials
//! - `SESSION_SECRET`: required, at least 16 characters
//! - `CLIENT_URL`: front-end origin (default: http://localhost:3000)
//! - `HOST`, `PORT`: bind address (default: 0.0.0.0:5000)
//! - `LIGHT90_DATABASE_PATH`: SQLite file for users
//! - `LIGHT90_LATITUDE`, `LIGHT90_LONGITUDE`: default location for sunrise
//! - `RUST_LOG`: log filter (default: light90=info,tower_http=debug)

use light90::api::{serve, ApiConfig, AppState};
use light90::config::{Config, LoggingConfig};
use light90::schedule::{AlertOffsets, ReminderScheduler};
use light90::session::SessionStore;
use light90::store::UserStore;
use light90::whoop::{WhoopClient, WhoopClientConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are swept
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting Light90 API server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        eprintln!("Invalid configuration: {}", e);
        eprintln!("Generate a starting point with: light90-cli config init");
        std::process::exit(1);
    }

    if let Some(redis_url) = &config.session.redis_url {
        tracing::warn!(
            "REDIS_URL is set ({}) but sessions are kept in process memory",
            redis_url
        );
    }

    // Initialize user store
    tracing::info!("Database: {}", config.database.path);
    let users = UserStore::open(&config.database.path)?;
    tracing::info!("User store initialized ({} users)", users.count().await?);

    // WHOOP client
    let whoop = Arc::new(WhoopClient::new(WhoopClientConfig::from(&config.whoop))?);
    tracing::info!("WHOOP API: {}", whoop.config().api_base);

    // Sessions
    let ttl = chrono::Duration::hours(config.session.ttl_hours as i64);
    let login_ttl = chrono::Duration::minutes(config.session.login_ttl_minutes as i64);
    let sessions = Arc::new(SessionStore::new(ttl).with_login_ttl(login_ttl));
    let purge_handle = Arc::clone(&sessions).start_purge(SESSION_PURGE_INTERVAL);

    // Reminder scheduler
    let scheduler = Arc::new(ReminderScheduler::new(
        AlertOffsets::from(&config.schedule),
        Duration::from_millis(config.schedule.tick_interval_ms.max(1)),
    ));
    let scheduler_handle = Arc::clone(&scheduler).start();

    let api_config = ApiConfig::from(&config);
    tracing::info!("Client URL: {}", api_config.client_url);
    if api_config.default_location.is_none() {
        tracing::info!("No default location; sunlight reminders need lat/lng from the client");
    }

    let state = AppState::new(
        whoop,
        users,
        sessions,
        Arc::clone(&scheduler),
        api_config.clone(),
    );

    let result = serve(state, &api_config).await;

    // Shutdown
    tracing::info!("Shutting down...");
    scheduler.stop().await;
    if let Err(e) = scheduler_handle.await {
        tracing::warn!("Reminder scheduler task ended abnormally: {}", e);
    }
    purge_handle.abort();

    result?;
    tracing::info!("Light90 shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("light90={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}
