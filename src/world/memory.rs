//! Bounded per-resident memory

use crate::core::types::TimestampMs;
use serde::{Deserialize, Serialize};

/// One remembered item: a compressed thought or observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Per-resident sequence index, auto-incremented on insertion
    pub seq: u64,
    pub text: String,
    /// How impactful (0.0 to 1.0)
    pub importance: f32,
    pub timestamp: TimestampMs,
}

/// A resident's memory ring
///
/// Invariant: at most `cap` entries survive an insertion; pruning removes the
/// oldest entries by timestamp, keeping the most recent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRing {
    next_seq: u64,
    entries: Vec<MemoryEntry>,
}

impl MemoryRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a memory and prune past the cap
    pub fn record(&mut self, text: String, importance: f32, timestamp: TimestampMs, cap: usize) {
        let entry = MemoryEntry {
            seq: self.next_seq,
            text,
            importance: importance.clamp(0.0, 1.0),
            timestamp,
        };
        self.next_seq += 1;
        self.entries.push(entry);

        while self.entries.len() > cap {
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.timestamp)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => {
                    self.entries.remove(i);
                }
                None => break,
            }
        }
    }

    /// The `n` most recent entries, newest first
    pub fn recent(&self, n: usize) -> Vec<MemoryEntry> {
        let mut sorted: Vec<&MemoryEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.seq.cmp(&a.seq)));
        sorted.into_iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
