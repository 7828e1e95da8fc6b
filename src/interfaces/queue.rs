use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::application::WatcherRegistry;
use crate::domain::{EventId, UserId};

/// One work item: watch `event_id` for `user_id`.
#[derive(Debug, Deserialize)]
pub struct QueuedEvent {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    #[serde(rename = "eventID")]
    pub event_id: EventId,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Feeds newline-delimited JSON work items into the registry.
pub struct QueueConsumer {
    pub registry: Arc<WatcherRegistry>,
}

impl QueueConsumer {
    /// Consume until the reader is exhausted. Bad lines are logged and
    /// skipped; only read errors end the loop early.
    pub async fn consume<R>(&self, reader: R) -> anyhow::Result<ConsumeStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut stats = ConsumeStats::default();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let item: QueuedEvent = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    warn!("discarding queue record: {e}");
                    stats.rejected += 1;
                    continue;
                }
            };

            if let Err(e) = self.dispatch(item).await {
                warn!("queue record not applied: {e}");
                stats.rejected += 1;
                continue;
            }
            stats.accepted += 1;
        }

        Ok(stats)
    }

    async fn dispatch(&self, item: QueuedEvent) -> anyhow::Result<()> {
        debug!(user = %item.user_id, event = %item.event_id, "dispatching queued event");
        let list = self.registry.get_or_create(&item.user_id)?;
        if let Some(token) = item.token.filter(|t| !t.is_empty()) {
            list.set_token(token).await?;
        }
        list.add(&item.event_id).await?;
        Ok(())
    }
}
