//! # Light90
//!
//! Morning-routine reminders from WHOOP sleep data. Light90 logs a user in
//! through WHOOP OAuth 2.0, relays their sleep and profile data, and works
//! out two daily reminders:
//!
//! - **Sunlight**: 30 minutes before local sunrise
//! - **Coffee**: 90 minutes after the user's average wake time
//!
//! ## Modules
//!
//! - [`whoop`]: WHOOP OAuth and developer API client
//! - [`session`]: cookie-keyed server-side sessions
//! - [`store`]: SQLite user records and tokens
//! - [`schedule`]: sunrise math, reminder arithmetic and the background ticker
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{NaiveDate, Utc};
//! use light90::schedule::{compute, solar, AlertOffsets, Location};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
//! let sunrise = solar::sunrise(date, 40.7128, -74.0060);
//! println!("Sunrise in New York: {:?}", sunrise);
//!
//! let location = Location::new(40.7128, -74.0060).unwrap();
//! let alerts = compute(Utc::now(), &[], Some(location), &AlertOffsets::default());
//! println!("Next sunlight reminder: {:?}", alerts.sunlight);
//! ```

pub mod api;
pub mod config;
pub mod schedule;
pub mod session;
pub mod store;
pub mod whoop;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError};

pub use schedule::{
    AlertOffsets, FiredReminder, Location, NextAlerts, ReminderKind, ReminderScheduler,
    ScheduleError, ScheduleStatus,
};

pub use session::{Session, SessionStore};

pub use store::{StoreError, StoreResult, User, UserStore};

pub use whoop::{
    SleepCollection, SleepRecord, TokenSet, WhoopApi, WhoopClient, WhoopClientConfig,
    WhoopError, WhoopProfile,
};
