//! Human-readable activity log.
//!
//! Every scan transition, sensor change, detection, interpretation and
//! transmission leaves a short entry here. The log is newest first and
//! capped; clearing it never touches the anomaly list.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Category of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    System,
    Signal,
    Transmit,
    Error,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::System => "SYSTEM",
            EntryKind::Signal => "SIGNAL",
            EntryKind::Transmit => "TRANSMIT",
            EntryKind::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(EntryKind::System),
            "signal" => Ok(EntryKind::Signal),
            "transmit" => Ok(EntryKind::Transmit),
            "error" => Ok(EntryKind::Error),
            other => Err(format!("unknown log kind '{other}'")),
        }
    }
}

/// One line in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub time: DateTime<Utc>,
    pub kind: EntryKind,
    pub message: String,
}

impl ActivityEntry {
    /// Render as `HH:MM:SS KIND message` in the given timezone.
    pub fn render(&self, tz: Tz) -> String {
        format!(
            "{} {:<8} {}",
            format_clock(self.time, tz),
            self.kind.label(),
            self.message
        )
    }
}

/// Wall-clock time as `HH:MM:SS` (24 hour) in `tz`.
pub fn format_clock(time: DateTime<Utc>, tz: Tz) -> String {
    time.with_timezone(&tz).format("%H:%M:%S").to_string()
}

/// Newest-first activity log with a fixed capacity.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Add an entry at the front, evicting the oldest beyond capacity.
    pub fn push(&mut self, kind: EntryKind, message: impl Into<String>, time: DateTime<Utc>) {
        self.entries.push_front(ActivityEntry {
            time,
            kind,
            message: message.into(),
        });
        self.entries.truncate(self.capacity);
    }

    /// Empty the log, leaving a single "Log cleared" entry.
    pub fn clear(&mut self, time: DateTime<Utc>) {
        self.entries.clear();
        self.push(EntryKind::System, "Log cleared", time);
    }

    /// Entries of one kind, newest first. `None` means all entries.
    pub fn filter(&self, kind: Option<EntryKind>) -> Vec<&ActivityEntry> {
        self.entries
            .iter()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(100)
    }
}
