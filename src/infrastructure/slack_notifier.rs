use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::application::{AppError, AppResult, Notifier};
use crate::domain::{EventId, UserId};

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook: String,
    channel: String,
}

impl SlackNotifier {
    pub fn new(webhook: String, channel: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self {
            client,
            webhook,
            channel,
        })
    }
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    channel: &'a str,
    text: String,
    username: &'a str,
    icon_emoji: &'a str,
}

fn message<'a>(channel: &'a str, event: &EventId) -> SlackMessage<'a> {
    SlackMessage {
        channel,
        text: format!("{} open!", event),
        username: "Kettle",
        icon_emoji: ":computer:",
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, _user: &UserId, event: &EventId) -> AppResult<()> {
        let payload = message(&self.channel, event);

        self.client
            .post(&self.webhook)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notifier(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Notifier(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_open_event() {
        let msg = message("#general", &EventId::parse("3000").unwrap());
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["text"], "3000 open!");
        assert_eq!(v["channel"], "#general");
        assert_eq!(v["username"], "Kettle");
    }
}
