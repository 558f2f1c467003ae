//! Server-side sessions
//!
//! Handles:
//! - The session record and its "user" binding
//! - Session store backends (SQLite, in-memory)
//! - Session middleware and extractors

mod memory;
mod middleware;
mod sqlite;

pub use memory::MemorySessionStore;
pub use middleware::{CurrentSession, SessionHandle, session_layer};
pub use sqlite::SqliteSessionStore;

use axum::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::AuthenticatedProfile;

/// Session key holding the bound profile.
pub const USER_KEY: &str = "user";

/// Session store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached or rejected the operation
    #[error("session store unreachable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded
    #[error("session record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// A server-side session record
///
/// Correlated with a browser through the signed session cookie.
/// `data` is a free-form JSON document; the only key this crate
/// interprets is [`USER_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub data: Map<String, Value>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with a fresh opaque id
    pub fn new(ttl: Duration) -> Self {
        Self {
            id: generate_session_id(),
            data: Map::new(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Push the expiry out to `ttl` from now
    pub fn touch(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + ttl;
    }

    /// The bound profile, if any
    ///
    /// A value that no longer parses as a profile reads as unauthenticated.
    pub fn user(&self) -> Option<AuthenticatedProfile> {
        let value = self.data.get(USER_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(profile) => Some(profile),
            Err(error) => {
                tracing::warn!(session_id = %self.id, %error, "Discarding unreadable session user");
                None
            }
        }
    }

    pub fn bind_user(&mut self, profile: &AuthenticatedProfile) -> Result<(), StoreError> {
        let value = serde_json::to_value(profile)?;
        self.data.insert(USER_KEY.to_string(), value);
        Ok(())
    }

    pub fn clear_user(&mut self) {
        self.data.remove(USER_KEY);
    }
}

/// Generate an unguessable session id (32 random bytes, URL-safe base64)
pub fn generate_session_id() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Persistence for session records
///
/// Implementations are responsible for concurrent-write safety of a
/// single record. Missing and expired records both load as `None`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Insert or replace the record
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    async fn destroy(&self, id: &str) -> Result<(), StoreError>;

    /// Remove expired records, returning how many were deleted
    async fn purge_expired(&self) -> Result<u64, StoreError>;

    /// Refresh the TTL and persist
    async fn touch(&self, session: &mut Session, ttl: Duration) -> Result<(), StoreError> {
        session.touch(ttl);
        self.save(session).await
    }
}
