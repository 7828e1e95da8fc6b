#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use enrollwatch::application::{AppError, AppResult, Notifier};
use enrollwatch::domain::{EventId, PollPolicy, UserId};

pub fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

pub fn ev(id: &str) -> EventId {
    EventId::parse(id).unwrap()
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        event_delay: Duration::from_millis(1),
        pass_delay: Duration::from_millis(10),
        notify_timeout: Duration::from_secs(1),
    }
}

/// Records every notification; optionally fails after recording.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(UserId, EventId)>>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(UserId, EventId)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: &UserId, event: &EventId) -> AppResult<()> {
        self.sent.lock().unwrap().push((user.clone(), event.clone()));
        if self.failing {
            return Err(AppError::Notifier("webhook down".into()));
        }
        Ok(())
    }
}

/// Poll `cond` until it holds or a few seconds pass.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
