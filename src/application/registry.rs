use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::watch_list::{PollerDeps, run_poller};
use crate::application::{
    AppError, AppResult, EligibilityClient, Notifier, WatchList, WatchStore,
};
use crate::domain::{PollPolicy, UserId};

struct Watcher {
    list: Arc<WatchList>,
    poller: Option<JoinHandle<()>>,
}

/// Process-wide map from user to its single watch list.
///
/// All access goes through one mutex which is held for map lookups and
/// inserts only. Creating a watch list spawns its poller while the lock is
/// held, so racing `get_or_create` calls for a new user start one poller.
pub struct WatcherRegistry {
    watchers: Mutex<HashMap<UserId, Watcher>>,
    store: Arc<dyn WatchStore>,
    deps: PollerDeps,
    shutdown: CancellationToken,
}

impl WatcherRegistry {
    pub fn new(
        store: Arc<dyn WatchStore>,
        eligibility: Arc<dyn EligibilityClient>,
        notifier: Arc<dyn Notifier>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            watchers: Mutex::new(HashMap::new()),
            store,
            deps: PollerDeps {
                eligibility,
                notifier,
                policy,
            },
            shutdown: CancellationToken::new(),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<UserId, Watcher>>> {
        self.watchers
            .lock()
            .map_err(|_| AppError::Registry("lock poisoned".into()))
    }

    /// Return the user's watch list, creating it (and starting its poller)
    /// on first use. Must be called from within a tokio runtime.
    pub fn get_or_create(&self, user: &UserId) -> AppResult<Arc<WatchList>> {
        let mut watchers = self.lock()?;
        if let Some(w) = watchers.get(user) {
            return Ok(w.list.clone());
        }

        let list = Arc::new(WatchList::new(
            user.clone(),
            self.store.clone(),
            self.shutdown.child_token(),
        ));
        let poller = tokio::spawn(run_poller(list.clone(), self.deps.clone()));
        watchers.insert(
            user.clone(),
            Watcher {
                list: list.clone(),
                poller: Some(poller),
            },
        );
        Ok(list)
    }

    pub fn get(&self, user: &UserId) -> AppResult<Option<Arc<WatchList>>> {
        Ok(self.lock()?.get(user).map(|w| w.list.clone()))
    }

    pub fn users(&self) -> AppResult<Vec<UserId>> {
        let mut users: Vec<UserId> = self.lock()?.keys().cloned().collect();
        users.sort();
        Ok(users)
    }

    /// Number of pollers that are still running.
    pub fn poller_count(&self) -> AppResult<usize> {
        Ok(self
            .lock()?
            .values()
            .filter(|w| w.poller.as_ref().is_some_and(|h| !h.is_finished()))
            .count())
    }

    /// Recreate watch lists, with their saved credentials, for every user
    /// found in the store.
    pub async fn restore(&self) -> AppResult<usize> {
        let users = self.store.list_users().await?;
        for user in &users {
            let token = match self.store.load_token(user).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(user = %user, "unable to load saved token: {e}");
                    None
                }
            };
            // no await between creation and the token, so the first pass has it
            let list = self.get_or_create(user)?;
            if let Some(token) = token {
                list.remember_token(token);
            }
        }
        info!(users = users.len(), "restored watch lists from store");
        Ok(users.len())
    }

    /// Stop every poller and wait for them to exit. Watch lists stay
    /// registered; their pollers are not restarted.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles: Vec<(UserId, JoinHandle<()>)> = match self.lock() {
            Ok(mut watchers) => watchers
                .iter_mut()
                .filter_map(|(user, w)| w.poller.take().map(|h| (user.clone(), h)))
                .collect(),
            Err(e) => {
                warn!("cannot collect pollers on shutdown: {e}");
                return;
            }
        };

        for (user, handle) in handles {
            if let Err(e) = handle.await {
                warn!(user = %user, "poller ended abnormally: {e}");
            }
        }
        info!("all pollers stopped");
    }
}
