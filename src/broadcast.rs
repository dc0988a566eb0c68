//! Fire-and-forget observer announcements
//!
//! The engine announces committed changes through a [`BroadcastSink`]; there
//! is no acknowledgment and no delivery guarantee, and consumers may be
//! absent. Sinks must only be invoked after the corresponding event log
//! commit.

use serde_json::Value;
use tokio::sync::broadcast;

/// Push-broadcast boundary to remote observers
pub trait BroadcastSink: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

/// Discards every announcement
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn emit(&self, _event: &str, _payload: Value) {}
}

/// Announces through the structured log
pub struct TraceSink;

impl BroadcastSink for TraceSink {
    fn emit(&self, event: &str, payload: Value) {
        tracing::info!(target: "hearthvale::broadcast", event, %payload, "emit");
    }
}

/// One announcement as seen by an in-process observer
#[derive(Debug, Clone)]
pub struct Signal {
    pub event: String,
    pub payload: Value,
}

/// Fans announcements out over a tokio broadcast channel
///
/// Lagging or absent receivers are ignored; the send result is discarded.
pub struct ChannelSink {
    tx: broadcast::Sender<Signal>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<Signal>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

impl BroadcastSink for ChannelSink {
    fn emit(&self, event: &str, payload: Value) {
        let _ = self.tx.send(Signal {
            event: event.to_string(),
            payload,
        });
    }
}

/// Records announcements in memory; the observer used by tests
#[derive(Default)]
pub struct RecordingSink {
    seen: std::sync::Mutex<Vec<Signal>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<Signal> {
        let mut guard = self
            .seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }

    pub fn events(&self) -> Vec<String> {
        let guard = self
            .seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.iter().map(|s| s.event.clone()).collect()
    }
}

impl BroadcastSink for RecordingSink {
    fn emit(&self, event: &str, payload: Value) {
        let mut guard = self
            .seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.push(Signal {
            event: event.to_string(),
            payload,
        });
    }
}
