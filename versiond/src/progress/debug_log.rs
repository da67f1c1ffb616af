//! Bounded in-memory debug log
//!
//! Keeps the most recent `capacity` lines with their timestamps so an operator
//! can inspect what happened even if no observer was attached at the time.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::debug;

use crate::utils::now_millis;

/// A timestamped debug line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    /// Milliseconds since the Unix epoch
    pub ts: i64,
    pub line: String,
}

pub struct DebugLog {
    entries: Mutex<VecDeque<DebugEntry>>,
    capacity: usize,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a line stamped with the current time
    pub fn push(&self, line: impl Into<String>) {
        self.push_at(now_millis(), line);
    }

    pub fn push_at(&self, ts: i64, line: impl Into<String>) {
        let line = line.into();
        debug!("{}", line);

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(DebugEntry { ts, line });
    }

    /// Lines recorded at or after `since`
    pub fn since(&self, since: i64) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| e.ts >= since)
            .map(|e| e.line.clone())
            .collect()
    }

    /// The last `n` lines
    pub fn tail(&self, n: usize) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).map(|e| e.line.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
