//! Operator notifications over the Telegram bot API.
//!
//! Sends are rate limited and best-effort: a failed or dropped
//! notification never affects the pipeline.

pub mod templates;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Notifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Telegram bot token, usually injected from the environment.
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    /// Minimum gap between ordinary messages.
    #[serde(default = "default_min_gap_seconds")]
    pub min_gap_seconds: u64,
    /// Oldest queued messages are dropped beyond this.
    #[serde(default = "default_queue_cap")]
    pub queue_cap: usize,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_min_gap_seconds() -> u64 {
    10
}
fn default_queue_cap() -> usize {
    100
}
fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            min_gap_seconds: default_min_gap_seconds(),
            queue_cap: default_queue_cap(),
            api_base: default_api_base(),
        }
    }
}

/// Rate-limited, best-effort message sender.
pub struct Notifier {
    config: NotifierConfig,
    queue: Mutex<VecDeque<String>>,
    wakeup: Notify,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            queue: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            client: reqwest::Client::new(),
        })
    }

    fn configured(&self) -> bool {
        self.config.enabled
            && !self.config.bot_token.is_empty()
            && !self.config.chat_id.is_empty()
    }

    /// Queue an ordinary message. Drops the oldest queued message when
    /// the queue is full.
    pub fn send(&self, text: impl Into<String>) {
        if !self.configured() {
            debug!("notifier not configured, dropping message");
            return;
        }
        {
            let mut queue = self.queue.lock().unwrap();
            while queue.len() >= self.config.queue_cap {
                queue.pop_front();
            }
            queue.push_back(text.into());
        }
        self.wakeup.notify_one();
    }

    /// Deliver an urgent message right away, outside the queue and its
    /// send gap. Must be called from within the runtime.
    pub fn send_high(self: &Arc<Self>, text: impl Into<String>) {
        if !self.configured() {
            debug!("notifier not configured, dropping message");
            return;
        }
        let notifier = self.clone();
        let text = text.into();
        tokio::spawn(async move {
            notifier.deliver(&text).await;
        });
    }

    /// Spawn the background sender.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.run().await;
        })
    }

    async fn run(&self) {
        let gap = Duration::from_secs(self.config.min_gap_seconds);
        let mut last_sent: Option<Instant> = None;

        loop {
            let message = {
                let mut queue = self.queue.lock().unwrap();
                queue.pop_front()
            };

            let Some(message) = message else {
                self.wakeup.notified().await;
                continue;
            };

            if let Some(last) = last_sent {
                let elapsed = last.elapsed();
                if elapsed < gap {
                    tokio::time::sleep(gap - elapsed).await;
                }
            }

            self.deliver(&message).await;
            last_sent = Some(Instant::now());
        }
    }

    async fn deliver(&self, text: &str) {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        );
        let body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("notification delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "notification rejected");
            }
            Err(e) => {
                warn!(error = %e, "notification failed");
            }
        }
    }

    #[cfg(test)]
    fn queued_texts(&self) -> Vec<String> {
        self.queue.lock().unwrap().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(cap: usize) -> NotifierConfig {
        NotifierConfig {
            enabled: true,
            bot_token: "token".into(),
            chat_id: "42".into(),
            queue_cap: cap,
            // Unroutable so test deliveries fail fast and locally.
            api_base: "http://127.0.0.1:9".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unconfigured_drops_silently() {
        let notifier = Notifier::new(NotifierConfig::default());
        notifier.send("hola");
        assert!(notifier.queued_texts().is_empty());
    }

    #[test]
    fn test_queue_cap_drops_oldest() {
        let notifier = Notifier::new(test_config(3));
        for i in 0..5 {
            notifier.send(format!("m{i}"));
        }
        assert_eq!(notifier.queued_texts(), vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_high_priority_bypasses_queue_and_eviction() {
        let notifier = Notifier::new(test_config(2));
        notifier.send_high("urgente");
        for i in 0..4 {
            notifier.send(format!("m{i}"));
        }
        // The urgent message never entered the queue, so the normal
        // flood cannot evict it.
        assert_eq!(notifier.queued_texts(), vec!["m2", "m3"]);
    }
}
