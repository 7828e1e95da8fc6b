use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::usecases::PollPassUseCase;
use crate::application::{AppError, AppResult, EligibilityClient, Notifier, WatchStore, WatchUser};
use crate::domain::{EventId, PollPolicy, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyWatched,
}

/// Collaborators shared by every poller.
#[derive(Clone)]
pub struct PollerDeps {
    pub eligibility: Arc<dyn EligibilityClient>,
    pub notifier: Arc<dyn Notifier>,
    pub policy: PollPolicy,
}

/// One user's watch set. The registry keeps at most one per user and starts
/// its poller; constructing one directly starts nothing.
pub struct WatchList {
    user: UserId,
    token: RwLock<Option<String>>,
    store: Arc<dyn WatchStore>,
    cancel: CancellationToken,
}

impl WatchList {
    pub fn new(user: UserId, store: Arc<dyn WatchStore>, cancel: CancellationToken) -> Self {
        info!(user = %user, "creating watch list");
        Self {
            user,
            token: RwLock::new(None),
            store,
            cancel,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user
    }

    /// Replace the credential used for eligibility checks and persist it so
    /// it survives a restart.
    pub async fn set_token(&self, token: String) -> AppResult<()> {
        self.store.save_token(&self.user, &token).await?;
        self.remember_token(token);
        Ok(())
    }

    /// Replace the in-memory credential only.
    pub(crate) fn remember_token(&self, token: String) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token);
    }

    pub fn watch_user(&self) -> WatchUser {
        let token = self
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        WatchUser {
            id: self.user.clone(),
            token,
        }
    }

    /// Watch `event`. Adding an event twice is a no-op.
    ///
    /// The existence check and the insert are separate store calls; two
    /// concurrent adds may both pass the check, in which case the store's own
    /// uniqueness handling decides.
    pub async fn add(&self, event: &EventId) -> AppResult<AddOutcome> {
        if self.store.exists(&self.user, event).await? {
            warn!(user = %self.user, event = %event, "event already watched, discarding");
            return Ok(AddOutcome::AlreadyWatched);
        }
        self.store.insert(&self.user, event).await?;
        debug!(user = %self.user, event = %event, "event added to watch list");
        Ok(AddOutcome::Added)
    }

    pub async fn list(&self) -> AppResult<Vec<EventId>> {
        self.store.list(&self.user).await
    }

    pub async fn delete(&self, event: &EventId) -> AppResult<()> {
        if self.store.remove(&self.user, event).await? {
            Ok(())
        } else {
            Err(AppError::NotFound {
                user: self.user.clone(),
                event: event.clone(),
            })
        }
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Sleep for `delay` unless cancelled first. Returns false on cancellation.
pub(crate) async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// The per-user polling loop. Runs until the list's token is cancelled.
pub(crate) async fn run_poller(list: Arc<WatchList>, deps: PollerDeps) {
    info!(user = %list.user_id(), "poller started");
    let cancel = list.cancel_token().clone();

    while !cancel.is_cancelled() {
        let report = PollPassUseCase {
            watch_list: &list,
            eligibility: deps.eligibility.as_ref(),
            notifier: deps.notifier.as_ref(),
            event_delay: deps.policy.event_delay,
            notify_timeout: deps.policy.notify_timeout,
            cancel: &cancel,
        }
        .execute()
        .await;

        debug!(
            user = %list.user_id(),
            checked = report.checked,
            removed = report.removed,
            enrollable = report.enrollable,
            skipped = report.skipped,
            "pass completed"
        );

        if !pause(&cancel, deps.policy.pass_delay).await {
            break;
        }
    }

    info!(user = %list.user_id(), "poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::InMemoryWatchStore;

    fn list_for(user: &str) -> WatchList {
        WatchList::new(
            UserId::parse(user).unwrap(),
            Arc::new(InMemoryWatchStore::new()),
            CancellationToken::new(),
        )
    }

    fn ev(id: &str) -> EventId {
        EventId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let list = list_for("u1");
        assert_eq!(list.add(&ev("e1")).await.unwrap(), AddOutcome::Added);
        assert_eq!(list.add(&ev("e1")).await.unwrap(), AddOutcome::AlreadyWatched);
        assert_eq!(list.list().await.unwrap(), vec![ev("e1")]);
    }

    #[tokio::test]
    async fn delete_of_unknown_event_is_not_found() {
        let list = list_for("u1");
        let err = list.delete(&ev("nope")).await.unwrap_err();
        assert!(err.is_not_found());

        list.add(&ev("e1")).await.unwrap();
        list.delete(&ev("e1")).await.unwrap();
        assert!(list.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_is_carried_into_watch_user() {
        let list = list_for("u1");
        assert_eq!(list.watch_user().token, None);
        list.set_token("secret".into()).await.unwrap();
        assert_eq!(list.watch_user().token.as_deref(), Some("secret"));
        assert_eq!(
            list.store.load_token(list.user_id()).await.unwrap().as_deref(),
            Some("secret")
        );
    }

    #[tokio::test]
    async fn pause_returns_false_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!pause(&cancel, Duration::from_secs(3600)).await);
        assert!(pause(&CancellationToken::new(), Duration::ZERO).await);
    }
}
