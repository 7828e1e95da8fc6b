use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::application::{AppError, AppResult, WatchStore};
use crate::domain::{EventId, UserId};

pub struct SqliteWatchStore {
    pool: SqlitePool,
}

impl SqliteWatchStore {
    /// db_url examples
    /// - "sqlite:/data/watcher.db" (docker volume)
    /// - "sqlite:./watcher.db"
    ///
    /// The database file is created if missing.
    pub async fn new(db_url: &str) -> AppResult<Self> {
        Self::connect(db_url, 5).await
    }

    /// A private in-memory database. One connection, since every sqlite
    /// memory connection is its own database.
    pub async fn in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(db_url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(db_url)
            .map_err(|e| AppError::Storage(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> AppResult<()> {
        // the unique key turns racing inserts into ignored conflicts
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watched_events (
              user_id TEXT NOT NULL,
              event_id TEXT NOT NULL,
              created_at INTEGER NOT NULL,
              UNIQUE(user_id, event_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

        // per-user credential for the eligibility service
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watch_users (
              user_id TEXT PRIMARY KEY,
              token TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl WatchStore for SqliteWatchStore {
    async fn exists(&self, user: &UserId, event: &EventId) -> AppResult<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT event_id FROM watched_events WHERE user_id = ? AND event_id = ? LIMIT 1",
        )
        .bind(user.as_str())
        .bind(event.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn insert(&self, user: &UserId, event: &EventId) -> AppResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO watched_events(user_id, event_id, created_at) VALUES(?, ?, ?)",
        )
        .bind(user.as_str())
        .bind(event.as_str())
        .bind(now_epoch())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn list(&self, user: &UserId) -> AppResult<Vec<EventId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT event_id FROM watched_events WHERE user_id = ? ORDER BY rowid")
                .bind(user.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|(id,)| EventId::parse(&id).map_err(|e| AppError::Storage(e.to_string())))
            .collect()
    }

    async fn remove(&self, user: &UserId, event: &EventId) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM watched_events WHERE user_id = ? AND event_id = ?")
            .bind(user.as_str())
            .bind(event.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }

    async fn list_users(&self) -> AppResult<Vec<UserId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT user_id FROM watched_events ORDER BY user_id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|(id,)| UserId::parse(&id).map_err(|e| AppError::Storage(e.to_string())))
            .collect()
    }

    async fn save_token(&self, user: &UserId, token: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO watch_users(user_id, token) VALUES(?, ?)
            ON CONFLICT(user_id) DO UPDATE SET token=excluded.token
            "#,
        )
        .bind(user.as_str())
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn load_token(&self, user: &UserId) -> AppResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT token FROM watch_users WHERE user_id = ? LIMIT 1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(row.map(|t| t.0))
    }
}

fn now_epoch() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
