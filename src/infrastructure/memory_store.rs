use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::application::{AppError, AppResult, WatchStore};
use crate::domain::{EventId, UserId, WatchedEvent};

/// Watch store kept in process memory. Rows keep insertion order.
#[derive(Clone, Default)]
pub struct InMemoryWatchStore {
    rows: Arc<Mutex<Vec<WatchedEvent>>>,
    tokens: Arc<Mutex<HashMap<UserId, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryWatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a storage error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current rows of `user`, read without going through the async trait.
    pub fn snapshot(&self, user: &UserId) -> Vec<EventId> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.iter()
            .filter(|r| r.user_id == *user)
            .map(|r| r.event_id.clone())
            .collect()
    }

    fn rows(&self) -> AppResult<MutexGuard<'_, Vec<WatchedEvent>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Storage("store unavailable".into()));
        }
        self.rows
            .lock()
            .map_err(|_| AppError::Storage("lock poisoned".into()))
    }

    fn tokens(&self) -> AppResult<MutexGuard<'_, HashMap<UserId, String>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Storage("store unavailable".into()));
        }
        self.tokens
            .lock()
            .map_err(|_| AppError::Storage("lock poisoned".into()))
    }
}

fn matches(row: &WatchedEvent, user: &UserId, event: &EventId) -> bool {
    row.user_id == *user && row.event_id == *event
}

#[async_trait]
impl WatchStore for InMemoryWatchStore {
    async fn exists(&self, user: &UserId, event: &EventId) -> AppResult<bool> {
        Ok(self.rows()?.iter().any(|r| matches(r, user, event)))
    }

    async fn insert(&self, user: &UserId, event: &EventId) -> AppResult<()> {
        let mut rows = self.rows()?;
        if !rows.iter().any(|r| matches(r, user, event)) {
            rows.push(WatchedEvent {
                user_id: user.clone(),
                event_id: event.clone(),
            });
        }
        Ok(())
    }

    async fn list(&self, user: &UserId) -> AppResult<Vec<EventId>> {
        Ok(self
            .rows()?
            .iter()
            .filter(|r| r.user_id == *user)
            .map(|r| r.event_id.clone())
            .collect())
    }

    async fn remove(&self, user: &UserId, event: &EventId) -> AppResult<bool> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|r| !matches(r, user, event));
        Ok(rows.len() != before)
    }

    async fn list_users(&self) -> AppResult<Vec<UserId>> {
        let mut users: Vec<UserId> = self.rows()?.iter().map(|r| r.user_id.clone()).collect();
        users.sort();
        users.dedup();
        Ok(users)
    }

    async fn save_token(&self, user: &UserId, token: &str) -> AppResult<()> {
        self.tokens()?.insert(user.clone(), token.to_string());
        Ok(())
    }

    async fn load_token(&self, user: &UserId) -> AppResult<Option<String>> {
        Ok(self.tokens()?.get(user).cloned())
    }
}
