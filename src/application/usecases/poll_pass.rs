use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::application::usecases::CheckEventUseCase;
use crate::application::watch_list::pause;
use crate::application::{EligibilityClient, Notifier, WatchList};
use crate::domain::Disposition;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub checked: usize,
    pub removed: usize,
    pub enrollable: usize,
    pub skipped: usize,
}

impl PassReport {
    fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Skipped => self.skipped += 1,
            Disposition::Removed { .. } => {
                self.checked += 1;
                self.removed += 1;
            }
            Disposition::Enrollable => {
                self.checked += 1;
                self.enrollable += 1;
            }
            Disposition::StillPending => self.checked += 1,
        }
    }
}

/// One pass over a user's current watch set.
pub struct PollPassUseCase<'a> {
    pub watch_list: &'a WatchList,
    pub eligibility: &'a dyn EligibilityClient,
    pub notifier: &'a dyn Notifier,
    pub event_delay: Duration,
    pub notify_timeout: Duration,
    pub cancel: &'a CancellationToken,
}

impl<'a> PollPassUseCase<'a> {
    pub async fn execute(&self) -> PassReport {
        let mut report = PassReport::default();

        let events = match self.watch_list.list().await {
            Ok(v) => v,
            Err(e) => {
                error!(user = %self.watch_list.user_id(), "unable to list watched events: {e}");
                return report;
            }
        };

        let check = CheckEventUseCase {
            watch_list: self.watch_list,
            eligibility: self.eligibility,
            notifier: self.notifier,
            notify_timeout: self.notify_timeout,
        };

        for event in &events {
            let disposition = check.execute(event).await;
            report.record(&disposition);

            // no throttle after a failed check
            if disposition == Disposition::Skipped {
                continue;
            }
            if !pause(self.cancel, self.event_delay).await {
                break;
            }
        }

        report
    }
}
