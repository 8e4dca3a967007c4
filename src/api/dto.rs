//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleStatus;
use crate::store::User;
use crate::whoop::SleepRecord;

// ============================================
// AUTH DTOs
// ============================================

/// Query string WHOOP sends to the OAuth callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set when the user denied consent
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// GET /auth/status response
#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub user: Option<UserDto>,
}

/// User as exposed to the front end (no tokens)
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.whoop_user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            name: user.display_name(),
            created_at: user.created_at,
        }
    }
}

// ============================================
// SLEEP DTOs
// ============================================

/// GET /api/v1/sleep query
#[derive(Debug, Deserialize)]
pub struct SleepQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// GET /api/v1/sleep response
#[derive(Debug, Serialize)]
pub struct SleepResponse {
    pub records: Vec<SleepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

// ============================================
// SCHEDULE DTOs
// ============================================

/// GET /api/v1/schedule/status query
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Refetch sleep data even when a schedule exists
    #[serde(default)]
    pub refresh: bool,
}

/// GET /api/v1/schedule/status response
#[derive(Debug, Serialize)]
pub struct ScheduleStatusResponse {
    pub now: DateTime<Utc>,
    #[serde(flatten)]
    pub status: ScheduleStatus,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "ok" or "degraded"
    pub status: String,
    /// User database status
    pub database: String,
    /// Live sessions
    pub sessions: usize,
    /// Users with a computed schedule
    pub scheduled_users: usize,
    /// Stored users, when the database answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<u64>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}
