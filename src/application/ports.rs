use async_trait::async_trait;

use crate::domain::{Eligibility, EventId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("eligibility error: {0}")]
    Eligibility(String),
    #[error("malformed eligibility response: {0}")]
    MalformedResponse(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("event {event} is not watched by user {user}")]
    NotFound { user: UserId, event: EventId },
    #[error("notifier error: {0}")]
    Notifier(String),
    #[error("registry error: {0}")]
    Registry(String),
    #[error("invalid config: {0}")]
    Config(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Identity the poller presents to the eligibility service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchUser {
    pub id: UserId,
    pub token: Option<String>,
}

/// Durable set of (user, event) pairs.
#[async_trait]
pub trait WatchStore: Send + Sync {
    async fn exists(&self, user: &UserId, event: &EventId) -> AppResult<bool>;

    /// Insert the pair. Inserting a pair that is already present must not
    /// create a second row.
    async fn insert(&self, user: &UserId, event: &EventId) -> AppResult<()>;

    async fn list(&self, user: &UserId) -> AppResult<Vec<EventId>>;

    /// Returns false when the pair was not present.
    async fn remove(&self, user: &UserId, event: &EventId) -> AppResult<bool>;

    /// Distinct users that have at least one watched event.
    async fn list_users(&self) -> AppResult<Vec<UserId>>;

    /// Store the eligibility-service credential of `user`, replacing any
    /// previous one.
    async fn save_token(&self, user: &UserId, token: &str) -> AppResult<()>;

    async fn load_token(&self, user: &UserId) -> AppResult<Option<String>>;
}

/// Ask the remote service whether a user may enroll in an event.
#[async_trait]
pub trait EligibilityClient: Send + Sync {
    async fn check(&self, user: &WatchUser, event: &EventId) -> AppResult<Eligibility>;
}

/// Deliver "event is open" notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &UserId, event: &EventId) -> AppResult<()>;
}
