use std::time::Duration;

use tracing::{error, info, warn};

use crate::application::{EligibilityClient, Notifier, WatchList};
use crate::domain::{Disposition, EventId, Verdict};

/// Check one watched event and apply the cleanup and notify policy.
pub struct CheckEventUseCase<'a> {
    pub watch_list: &'a WatchList,
    pub eligibility: &'a dyn EligibilityClient,
    pub notifier: &'a dyn Notifier,
    /// A delivery still running after this long is abandoned.
    pub notify_timeout: Duration,
}

impl<'a> CheckEventUseCase<'a> {
    pub async fn execute(&self, event: &EventId) -> Disposition {
        let user = self.watch_list.watch_user();

        let eligibility = match self.eligibility.check(&user, event).await {
            Ok(e) => e,
            Err(e) => {
                warn!(user = %user.id, event = %event, "skipping event: {e}");
                return Disposition::Skipped;
            }
        };

        let verdict = Verdict::from_eligibility(&eligibility);

        // cleanup runs before notify and wins the disposition
        let mut removed = None;
        if let Some(code) = verdict.remove_for {
            match self.watch_list.delete(event).await {
                Ok(()) => {
                    info!(user = %user.id, event = %event, code = %code, "removed from watch list");
                    removed = Some(code);
                }
                Err(e) if e.is_not_found() => {
                    warn!(user = %user.id, event = %event, code = %code, "already gone from watch list");
                    removed = Some(code);
                }
                Err(e) => {
                    error!(user = %user.id, event = %event, "unable to remove event: {e}");
                }
            }
        }

        if verdict.notify {
            info!(user = %user.id, event = %event, "event open");
            let delivery = self.notifier.notify(&user.id, event);
            match tokio::time::timeout(self.notify_timeout, delivery).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(user = %user.id, event = %event, "notification failed: {e}");
                }
                Err(_) => {
                    warn!(
                        user = %user.id,
                        event = %event,
                        timeout_ms = self.notify_timeout.as_millis() as u64,
                        "notification timed out"
                    );
                }
            }
        }

        match removed {
            Some(code) => Disposition::Removed { code },
            None if verdict.notify => Disposition::Enrollable,
            None => Disposition::StillPending,
        }
    }
}
