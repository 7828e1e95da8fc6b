use async_trait::async_trait;

use crate::application::{AppResult, Notifier};
use crate::domain::{EventId, UserId};

pub struct MultiNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn notify(&self, user: &UserId, event: &EventId) -> AppResult<()> {
        // every channel is tried; one failing channel does not stop the others
        let mut last_err = None;

        for n in &self.notifiers {
            if let Err(e) = n.notify(user, event).await {
                last_err = Some(e);
            }
        }

        if let Some(e) = last_err {
            return Err(e);
        }

        Ok(())
    }
}
