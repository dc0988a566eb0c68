//! Append-only world event log entries

use crate::core::types::{EventId, TimestampMs};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single entry in the append-only event log
///
/// Ids and timestamps are non-decreasing in insertion order; entries are
/// never mutated and only retention queries (most-recent-N) read them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEvent {
    pub id: EventId,
    pub kind: String,
    pub payload: Value,
    pub timestamp: TimestampMs,
}

impl WorldEvent {
    /// One-line rendering for console output and deliberation context
    pub fn describe(&self) -> String {
        match self.payload.as_object() {
            Some(map) if !map.is_empty() => {
                let detail: Vec<String> = map
                    .iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some(format!("{}={}", k, s)),
                        Value::Number(n) => Some(format!("{}={}", k, n)),
                        _ => None,
                    })
                    .collect();
                format!("[{}] {} ({})", self.id, self.kind, detail.join(", "))
            }
            _ => format!("[{}] {}", self.id, self.kind),
        }
    }
}
