//! SQLite-backed session store
//!
//! Each session is one row holding its JSON document.
//! Expiry is stored as Unix milliseconds so it compares numerically.
//! Uses SQLx; the schema lives in `migrations/`.

use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite, SqlitePool};

use super::{Session, SessionStore, StoreError};

/// Session store on a SQLite connection pool
pub struct SqliteSessionStore {
    pool: Pool<Sqlite>,
}

impl SqliteSessionStore {
    /// Connect to the store
    ///
    /// Creates the database file if the URL allows it (`mode=rwc`).
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `url` - sqlx connection string, e.g. `sqlite:data/sessions.db?mode=rwc`
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if let Some(parent) = sqlite_file_parent(url) {
            std::fs::create_dir_all(&parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let pool = SqlitePool::connect(url).await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running migrations on it
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Session store migration failed: {}", e);
                StoreError::Unavailable(format!("migration failed: {e}"))
            })?;

        tracing::info!("Session store connected and migrated successfully");
        Ok(Self { pool })
    }
}

fn sqlite_file_parent(url: &str) -> Option<std::path::PathBuf> {
    let path = url.strip_prefix("sqlite:")?.trim_start_matches("//");
    let path = path.split('?').next()?;
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    std::path::Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.to_path_buf())
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query("SELECT id, data, expires_at FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at_ms: i64 = row.try_get("expires_at")?;
        let expires_at = DateTime::<Utc>::from_timestamp_millis(expires_at_ms)
            .ok_or_else(|| StoreError::Unavailable(format!("bad expiry for session {id}")))?;
        if expires_at <= Utc::now() {
            self.destroy(id).await?;
            return Ok(None);
        }

        let raw: String = row.try_get("data")?;
        Ok(Some(Session {
            id: row.try_get("id")?,
            data: serde_json::from_str(&raw)?,
            expires_at,
        }))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let data = serde_json::to_string(&session.data)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&session.id)
        .bind(data)
        .bind(session.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
