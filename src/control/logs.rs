//! In-process log hub: a ring buffer of recent entries plus a broadcast
//! channel for live streaming, fed by a `tracing` layer.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// How many entries the ring buffer keeps.
pub const LOG_BUFFER_CAP: usize = 1000;

/// Per-subscriber channel depth; slow consumers lose the oldest entries.
const CHANNEL_CAP: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

pub struct LogHub {
    buffer: Mutex<VecDeque<LogEntry>>,
    tx: broadcast::Sender<LogEntry>,
}

impl LogHub {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(CHANNEL_CAP);
        Arc::new(Self {
            buffer: Mutex::new(VecDeque::with_capacity(LOG_BUFFER_CAP)),
            tx,
        })
    }

    pub fn push(&self, entry: LogEntry) {
        {
            let mut buffer = self.buffer.lock().unwrap();
            while buffer.len() >= LOG_BUFFER_CAP {
                buffer.pop_front();
            }
            buffer.push_back(entry.clone());
        }
        // No receivers is fine.
        let _ = self.tx.send(entry);
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let buffer = self.buffer.lock().unwrap();
        let skip = buffer.len().saturating_sub(limit);
        buffer.iter().skip(skip).cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

/// `tracing` layer forwarding every event into a [`LogHub`].
pub struct LogLayer {
    hub: Arc<LogHub>,
}

impl LogLayer {
    pub fn new(hub: Arc<LogHub>) -> Self {
        Self { hub }
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.hub.push(LogEntry {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Collects the `message` field plus any structured fields.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: "INFO".into(),
            target: "test".into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let hub = LogHub::new();
        for i in 0..(LOG_BUFFER_CAP + 5) {
            hub.push(entry(&format!("m{i}")));
        }
        let recent = hub.recent(LOG_BUFFER_CAP);
        assert_eq!(recent.len(), LOG_BUFFER_CAP);
        assert_eq!(recent[0].message, "m5");
        assert_eq!(recent.last().unwrap().message, format!("m{}", LOG_BUFFER_CAP + 4));
    }

    #[test]
    fn test_recent_limit() {
        let hub = LogHub::new();
        for i in 0..10 {
            hub.push(entry(&format!("m{i}")));
        }
        let recent = hub.recent(3);
        assert_eq!(
            recent.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(),
            vec!["m7", "m8", "m9"]
        );
    }

    #[tokio::test]
    async fn test_subscribers_receive_pushes() {
        let hub = LogHub::new();
        let mut rx = hub.subscribe();
        hub.push(entry("hola"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, "hola");
    }
}
