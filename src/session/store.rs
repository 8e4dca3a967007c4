//! In-process session store
//!
//! Maps an opaque session id to login state. Logged-in entries expire `ttl`
//! after they were last seen; entries still waiting on the OAuth callback
//! expire after the much shorter `login_ttl`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One browser's session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    /// OAuth `state` issued by the last `/auth/whoop` redirect
    #[serde(skip)]
    pub oauth_state: Option<String>,
    /// WHOOP user id once logged in
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            oauth_state: None,
            user_id: None,
            created_at: now,
            last_seen: now,
        }
    }
}

/// Default lifetime of a session that has not logged in
pub const DEFAULT_LOGIN_TTL_MINUTES: i64 = 10;

/// Session store shared by all handlers
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    login_ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            login_ttl: Duration::minutes(DEFAULT_LOGIN_TTL_MINUTES).min(ttl),
        }
    }

    /// Lifetime of anonymous sessions, capped at the logged-in TTL
    pub fn with_login_ttl(mut self, login_ttl: Duration) -> Self {
        self.login_ttl = login_ttl.min(self.ttl);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let lifetime = if session.user_id.is_some() {
            self.ttl
        } else {
            self.login_ttl
        };
        session.last_seen + lifetime > now
    }

    /// Create and store a fresh, anonymous session
    pub async fn create(&self) -> Session {
        let session = Session::new(Utc::now());
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a live session, refreshing its `last_seen`
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get_mut(id) {
            Some(session) if self.is_live(session, now) => {
                session.last_seen = now;
                return Some(session.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.remove(id);
            tracing::debug!(session_id = %id, "Session expired");
        }
        None
    }

    /// Replace a stored session
    pub async fn save(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.write().await.remove(id)
    }

    /// Drop every session not seen within its TTL
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| self.is_live(s, now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Periodically purge expired sessions
    pub fn start_purge(self: Arc<Self>, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let purged = self.purge_expired(Utc::now()).await;
                if purged > 0 {
                    tracing::info!(purged, "Purged expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new(Duration::hours(1));
        let session = store.create().await;

        let fetched = store.get(&session.id).await.unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.user_id, None);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_save_login() {
        let store = SessionStore::new(Duration::hours(1));
        let mut session = store.create().await;
        session.user_id = Some(42);
        session.oauth_state = None;
        store.save(session.clone()).await;

        assert_eq!(store.get(&session.id).await.unwrap().user_id, Some(42));
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let store = SessionStore::new(Duration::hours(1));
        let mut session = store.create().await;
        session.last_seen = Utc::now() - Duration::hours(2);
        store.save(session.clone()).await;

        assert!(store.get(&session.id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new(Duration::hours(1));
        let live = store.create().await;
        let mut stale = store.create().await;
        stale.last_seen = Utc::now() - Duration::hours(3);
        store.save(stale).await;

        assert_eq!(store.purge_expired(Utc::now()).await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&live.id).await.is_some());
    }

    #[tokio::test]
    async fn test_anonymous_sessions_expire_quickly() {
        let store = SessionStore::new(Duration::days(7));
        for _ in 0..1000 {
            store.create().await;
        }
        let mut user = store.create().await;
        user.user_id = Some(42);
        store.save(user.clone()).await;
        assert_eq!(store.len().await, 1001);

        let later = Utc::now() + Duration::minutes(DEFAULT_LOGIN_TTL_MINUTES + 1);
        assert_eq!(store.purge_expired(later).await, 1000);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&user.id).await.is_some());
    }

    #[tokio::test]
    async fn test_stale_login_session_is_dropped() {
        let store = SessionStore::new(Duration::days(7)).with_login_ttl(Duration::minutes(5));
        let mut pending = store.create().await;
        pending.oauth_state = Some("abcdefgh".into());
        pending.last_seen = Utc::now() - Duration::minutes(6);
        store.save(pending.clone()).await;

        assert!(store.get(&pending.id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_login_ttl_capped_by_ttl() {
        let store = SessionStore::new(Duration::minutes(2));
        assert_eq!(store.login_ttl, Duration::minutes(2));

        let store = store.with_login_ttl(Duration::hours(1));
        assert_eq!(store.login_ttl, Duration::minutes(2));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new(Duration::hours(1));
        let session = store.create().await;
        assert!(store.remove(&session.id).await.is_some());
        assert!(store.is_empty().await);
    }
}
