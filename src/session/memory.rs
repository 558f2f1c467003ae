//! In-memory session store
//!
//! Volatile, cleared on restart. Uses Moka so idle records are evicted
//! even if nobody asks for them again.

use axum::async_trait;
use moka::future::Cache;
use std::time::Duration;

use super::{Session, SessionStore, StoreError};

/// Session store held in process memory
pub struct MemorySessionStore {
    sessions: Cache<String, Session>,
}

impl MemorySessionStore {
    /// Create a store whose entries are evicted `ttl` after their last save
    ///
    /// # Arguments
    /// * `ttl` - Should match the session max age
    pub fn new(ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();

        Self { sessions }
    }

    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, StoreError> {
        match self.sessions.get(id).await {
            Some(session) if session.is_expired() => {
                self.sessions.invalidate(id).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions
            .insert(session.id.clone(), session.clone())
            .await;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        self.sessions.invalidate(id).await;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_expired())
            .map(|(id, _)| id.as_ref().clone())
            .collect();

        for id in &expired {
            self.sessions.invalidate(id).await;
        }
        self.sessions.run_pending_tasks().await;

        Ok(expired.len() as u64)
    }
}
