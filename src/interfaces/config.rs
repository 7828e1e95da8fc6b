use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::PollPolicy;

pub const DEFAULT_FRONTDESK_URL: &str = "https://localhost";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:watcher.db";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_SLACK_CHANNEL: &str = "#general";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frontdesk_url: Option<String>,
    pub database_url: Option<String>,
    pub slack_webhook: Option<String>,
    pub slack_channel: Option<String>,
    pub listen_addr: Option<String>,
    pub api_token: Option<String>,
    pub http_timeout_seconds: Option<u64>,
    pub poll: PollCfg,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PollCfg {
    pub event_delay_seconds: Option<u64>,
    pub pass_delay_seconds: Option<u64>,
}

impl Config {
    /// Load `path` if it exists, otherwise start from an empty config.
    /// Environment variables fill whatever the file leaves unset.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut cfg = if Path::new(path).exists() {
            Self::load_from_file(path)?
        } else {
            info!("config file {path} not found, using environment and defaults");
            Self::default()
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let raw = expand_env(raw);
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Fill unset (or blank) fields from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        fill(&mut self.frontdesk_url, || get("KETTLE_FRONTDESK"));
        fill(&mut self.database_url, || get("DATABASE_URL"));
        fill(&mut self.slack_webhook, || get("SLACK_WEBHOOK"));
        fill(&mut self.slack_channel, || get("SLACK_CHANNEL"));
        fill(&mut self.listen_addr, || get("LISTEN_ADDR"));
        fill(&mut self.api_token, || get("API_TOKEN"));
    }

    pub fn frontdesk_url(&self) -> String {
        self.frontdesk_url.clone().unwrap_or_else(|| {
            info!("KETTLE_FRONTDESK is not set, falling back to {DEFAULT_FRONTDESK_URL}");
            DEFAULT_FRONTDESK_URL.to_string()
        })
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    pub fn slack_webhook(&self) -> Option<String> {
        if self.slack_webhook.is_none() {
            warn!("SLACK_WEBHOOK is not set, notifications go to the console only");
        }
        self.slack_webhook.clone()
    }

    pub fn slack_channel(&self) -> String {
        self.slack_channel
            .clone()
            .unwrap_or_else(|| DEFAULT_SLACK_CHANNEL.to_string())
    }

    pub fn listen_addr(&self) -> String {
        self.listen_addr
            .clone()
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds.unwrap_or(15))
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let default = PollPolicy::default();
        PollPolicy {
            event_delay: self
                .poll
                .event_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(default.event_delay),
            pass_delay: self
                .poll
                .pass_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(default.pass_delay),
            notify_timeout: self.http_timeout(),
        }
    }
}

fn fill(slot: &mut Option<String>, fallback: impl FnOnce() -> Option<String>) {
    if slot.as_deref().is_none_or(|v| v.trim().is_empty()) {
        *slot = fallback();
    }
}

/// very small ${VAR} expansion to keep config simple
fn expand_env(s: &str) -> String {
    let mut out = s.to_string();
    for (k, v) in std::env::vars() {
        out = out.replace(&format!("${{{}}}", k), &v);
    }
    out
}
