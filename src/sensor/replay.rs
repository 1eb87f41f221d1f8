//! Replay of recorded sensor readings.
//!
//! A replay file is JSON Lines; each line holds an offset from scan start
//! and one reading:
//!
//! ```text
//! {"offset_ms": 0,   "reading": {"kind": "magnetometer", "x": 0.0, "y": 0.0, "z": 48.0}}
//! {"offset_ms": 500, "reading": {"kind": "light", "lux": 320.0}}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use crate::sensor::types::Reading;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One recorded reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub offset_ms: u64,
    pub reading: Reading,
}

/// A time-ordered script of recorded readings.
#[derive(Debug, Clone, Default)]
pub struct ReplayScript {
    records: Vec<ReplayRecord>,
    cursor: usize,
}

impl ReplayScript {
    pub fn new(mut records: Vec<ReplayRecord>) -> Self {
        records.sort_by_key(|r| r.offset_ms);
        Self { records, cursor: 0 }
    }

    /// Load a script from a JSON Lines file.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Io(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse a script from JSON Lines text.
    pub fn parse(content: &str) -> Result<Self, ReplayError> {
        let mut records = Vec::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record: ReplayRecord =
                serde_json::from_str(line).map_err(|e| ReplayError::Parse {
                    line: number + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(Self::new(records))
    }

    /// Take every reading due at or before `elapsed`.
    pub fn due(&mut self, elapsed: Duration) -> Vec<Reading> {
        let elapsed_ms = elapsed.as_millis() as u64;
        let mut due = Vec::new();
        while let Some(record) = self.records.get(self.cursor) {
            if record.offset_ms > elapsed_ms {
                break;
            }
            due.push(record.reading.clone());
            self.cursor += 1;
        }
        due
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.records.len()
    }

    /// Offset of the last record.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.records.last().map(|r| r.offset_ms).unwrap_or(0))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Errors loading a replay file.
#[derive(Debug)]
pub enum ReplayError {
    Io(String),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::Io(e) => write!(f, "Replay IO error: {e}"),
            ReplayError::Parse { line, message } => {
                write!(f, "Replay parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for ReplayError {}
