//! User records
//!
//! One row per WHOOP account. `upsert` keeps the original `created_at`
//! and overwrites everything else.

use super::error::{StoreError, StoreResult};
use crate::whoop::{TokenSet, WhoopProfile};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    whoop_user_id    INTEGER PRIMARY KEY,
    email            TEXT NOT NULL DEFAULT '',
    first_name       TEXT NOT NULL DEFAULT '',
    last_name        TEXT NOT NULL DEFAULT '',
    access_token     TEXT NOT NULL,
    refresh_token    TEXT,
    token_expires_at TEXT NOT NULL,
    scope            TEXT,
    profile          TEXT NOT NULL DEFAULT '{}',
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
";

/// A Light90 user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub whoop_user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub tokens: TokenSet,
    /// Raw WHOOP profile as returned at login
    pub profile: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user from a fresh login
    pub fn from_login(profile: &WhoopProfile, tokens: TokenSet) -> StoreResult<Self> {
        let now = Utc::now();
        Ok(Self {
            whoop_user_id: profile.user_id,
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            tokens,
            profile: serde_json::to_value(profile)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// SQLite user store
#[derive(Clone)]
pub struct UserStore {
    conn: Arc<Mutex<Connection>>,
}

impl UserStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            tracing::warn!("Failed to enable WAL mode: {}", e);
        }
        Self::init(conn)
    }

    /// In-memory store, mostly for tests
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool
    async fn execute<F, T>(&self, task: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Lock(e.to_string()))?;
            task(&guard)
        })
        .await
        .map_err(|e| StoreError::Lock(format!("database task failed: {}", e)))?
    }

    /// Insert or update a user, returning the stored row
    pub async fn upsert(&self, user: User) -> StoreResult<User> {
        let id = user.whoop_user_id;
        self.execute(move |conn| {
            let profile = serde_json::to_string(&user.profile)?;
            conn.execute(
                "INSERT INTO users (
                    whoop_user_id, email, first_name, last_name,
                    access_token, refresh_token, token_expires_at, scope,
                    profile, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(whoop_user_id) DO UPDATE SET
                    email = excluded.email,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    access_token = excluded.access_token,
                    refresh_token = COALESCE(excluded.refresh_token, users.refresh_token),
                    token_expires_at = excluded.token_expires_at,
                    scope = excluded.scope,
                    profile = excluded.profile,
                    updated_at = excluded.updated_at",
                params![
                    user.whoop_user_id,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.tokens.access_token,
                    user.tokens.refresh_token,
                    user.tokens.expires_at.to_rfc3339(),
                    user.tokens.scope,
                    profile,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;

        tracing::debug!(user_id = id, "User upserted");
        self.get(id).await?.ok_or(StoreError::UserNotFound(id))
    }

    /// Fetch a user by WHOOP id
    pub async fn get(&self, whoop_user_id: i64) -> StoreResult<Option<User>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT whoop_user_id, email, first_name, last_name,
                        access_token, refresh_token, token_expires_at, scope,
                        profile, created_at, updated_at
                 FROM users
                 WHERE whoop_user_id = ?1",
            )?;

            let raw = stmt.query_row(params![whoop_user_id], RawUser::from_row).optional()?;
            raw.map(RawUser::into_user).transpose()
        })
        .await
    }

    /// Replace a user's tokens after a refresh
    pub async fn update_tokens(&self, whoop_user_id: i64, tokens: TokenSet) -> StoreResult<()> {
        let updated = self
            .execute(move |conn| {
                let rows = conn.execute(
                    "UPDATE users
                     SET access_token = ?2,
                         refresh_token = COALESCE(?3, refresh_token),
                         token_expires_at = ?4,
                         scope = COALESCE(?5, scope),
                         updated_at = ?6
                     WHERE whoop_user_id = ?1",
                    params![
                        whoop_user_id,
                        tokens.access_token,
                        tokens.refresh_token,
                        tokens.expires_at.to_rfc3339(),
                        tokens.scope,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(rows)
            })
            .await?;

        if updated == 0 {
            return Err(StoreError::UserNotFound(whoop_user_id));
        }
        Ok(())
    }

    /// Number of stored users
    pub async fn count(&self) -> StoreResult<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}

/// Row as stored, before timestamp/JSON decoding
struct RawUser {
    whoop_user_id: i64,
    email: String,
    first_name: String,
    last_name: String,
    access_token: String,
    refresh_token: Option<String>,
    token_expires_at: String,
    scope: Option<String>,
    profile: String,
    created_at: String,
    updated_at: String,
}

impl RawUser {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            whoop_user_id: row.get("whoop_user_id")?,
            email: row.get("email")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            access_token: row.get("access_token")?,
            refresh_token: row.get("refresh_token")?,
            token_expires_at: row.get("token_expires_at")?,
            scope: row.get("scope")?,
            profile: row.get("profile")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            whoop_user_id: self.whoop_user_id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            tokens: TokenSet {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at: parse_datetime(&self.token_expires_at, "token_expires_at")?,
                scope: self.scope,
            },
            profile: serde_json::from_str(&self.profile)?,
            created_at: parse_datetime(&self.created_at, "created_at")?,
            updated_at: parse_datetime(&self.updated_at, "updated_at")?,
        })
    }
}

fn parse_datetime(value: &str, field: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corruption(format!("invalid {} '{}': {}", field, value, e)))
}
