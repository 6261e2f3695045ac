//! In-memory session store
//!
//! Sessions map an opaque UUID to a user id with an absolute expiry.
//! Expired entries are swept on every create and lookup. Nothing is
//! persisted; a restart logs everyone out.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Upper bound keeping `now + ttl` representable
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// Shared session map
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        let ttl_seconds = i64::try_from(ttl_seconds.min(MAX_TTL_SECONDS)).unwrap_or(0);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Session lifetime in seconds (cookie Max-Age)
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Start a session for `user_id` and return its id
    pub async fn create(&self, user_id: &str) -> String {
        let now = Utc::now();
        let session_id = medimind_common::uuid_utils::new_id();

        let mut sessions = self.sessions.write().await;
        sweep_expired(&mut sessions, now);
        sessions.insert(
            session_id.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: now + self.ttl,
            },
        );

        session_id
    }

    /// User owning a live session; unknown or expired ids yield None
    pub async fn user_for(&self, session_id: &str) -> Option<String> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sweep_expired(&mut sessions, now);
        sessions.get(session_id).map(|s| s.user_id.clone())
    }

    /// Remove a session; unknown ids are ignored
    pub async fn delete(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    /// Number of stored sessions (live or not yet swept)
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sweep_expired(sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) {
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    let swept = before - sessions.len();
    if swept > 0 {
        debug!("Swept {} expired session(s)", swept);
    }
}
