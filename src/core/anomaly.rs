//! Flagged events and the capped session log that holds them.

use crate::core::peaks::Peak;
use crate::sensor::types::SpectrumSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Category of a flagged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    Audio,
    Em,
    Ultrasonic,
    Cosmic,
}

impl AnomalyKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyKind::Audio => "AUDIO",
            AnomalyKind::Em => "EM",
            AnomalyKind::Ultrasonic => "ULTRASONIC",
            AnomalyKind::Cosmic => "COSMIC",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Session-unique anomaly identifier, assigned from a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyId(pub u64);

impl std::fmt::Display for AnomalyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SIG-{:06}", self.0)
    }
}

impl std::str::FromStr for AnomalyId {
    type Err = std::num::ParseIntError;

    /// Accepts both `SIG-000042` and `42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("SIG-");
        digits.parse().map(AnomalyId)
    }
}

/// Measurement payload attached to an anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AnomalyPayload {
    /// AUDIO and ULTRASONIC events
    Spectral {
        peaks: Vec<Peak>,
        spectrum: SpectrumSample,
    },
    /// EM events
    Magnetic { baseline: f64, current: f64 },
    /// COSMIC events
    Cosmic { hit_count: u32, cumulative_hits: u64 },
}

/// A recorded flagged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub kind: AnomalyKind,
    pub timestamp: DateTime<Utc>,
    /// Deviation metric; COSMIC events carry none
    pub deviation: Option<f64>,
    pub has_pattern: bool,
    pub analyzed: bool,
    pub payload: AnomalyPayload,
}

impl Anomaly {
    pub fn peaks(&self) -> Option<&[Peak]> {
        match &self.payload {
            AnomalyPayload::Spectral { peaks, .. } => Some(peaks),
            _ => None,
        }
    }

    pub fn spectrum(&self) -> Option<&SpectrumSample> {
        match &self.payload {
            AnomalyPayload::Spectral { spectrum, .. } => Some(spectrum),
            _ => None,
        }
    }

    pub fn peak_count(&self) -> usize {
        self.peaks().map(|p| p.len()).unwrap_or(0)
    }
}

/// An anomaly before it is assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub kind: AnomalyKind,
    pub timestamp: DateTime<Utc>,
    pub deviation: Option<f64>,
    pub has_pattern: bool,
    pub payload: AnomalyPayload,
}

/// Newest-first anomaly log with a fixed capacity.
#[derive(Debug, Clone)]
pub struct AnomalyLog {
    entries: VecDeque<Anomaly>,
    capacity: usize,
    next_id: u64,
}

impl AnomalyLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1_024)),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Record a detection, evicting the oldest entry when full.
    pub fn record(&mut self, detection: Detection) -> &Anomaly {
        let id = AnomalyId(self.next_id);
        self.next_id += 1;

        self.entries.push_front(Anomaly {
            id,
            kind: detection.kind,
            timestamp: detection.timestamp,
            deviation: detection.deviation,
            has_pattern: detection.has_pattern,
            analyzed: false,
            payload: detection.payload,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }

        &self.entries[0]
    }

    pub fn get(&self, id: AnomalyId) -> Option<&Anomaly> {
        self.entries.iter().find(|a| a.id == id)
    }

    /// Flag an anomaly as interpreted. Returns false if it was evicted.
    pub fn mark_analyzed(&mut self, id: AnomalyId) -> bool {
        match self.entries.iter_mut().find(|a| a.id == id) {
            Some(anomaly) => {
                anomaly.analyzed = true;
                true
            }
            None => false,
        }
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Anomaly> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&Anomaly> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<Anomaly> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn em_detection() -> Detection {
        Detection {
            kind: AnomalyKind::Em,
            timestamp: Utc::now(),
            deviation: Some(7.5),
            has_pattern: false,
            payload: AnomalyPayload::Magnetic {
                baseline: 40.0,
                current: 47.5,
            },
        }
    }

    #[test]
    fn test_newest_first_with_unique_ids() {
        let mut log = AnomalyLog::new(100);
        let first = log.record(em_detection()).id;
        let second = log.record(em_detection()).id;

        assert_ne!(first, second);
        assert_eq!(log.newest().unwrap().id, second);
        let ids: Vec<AnomalyId> = log.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = AnomalyLog::new(100);
        for _ in 0..101 {
            log.record(em_detection());
        }

        assert_eq!(log.len(), 100);
        assert!(log.get(AnomalyId(1)).is_none());
        assert!(log.get(AnomalyId(2)).is_some());
        assert_eq!(log.newest().unwrap().id, AnomalyId(101));
    }

    #[test]
    fn test_mark_analyzed() {
        let mut log = AnomalyLog::new(2);
        let id = log.record(em_detection()).id;
        assert!(!log.get(id).unwrap().analyzed);

        assert!(log.mark_analyzed(id));
        assert!(log.get(id).unwrap().analyzed);

        log.record(em_detection());
        log.record(em_detection());
        assert!(!log.mark_analyzed(id));
    }

    #[test]
    fn test_id_display_and_parse() {
        let id = AnomalyId(42);
        assert_eq!(id.to_string(), "SIG-000042");
        assert_eq!("SIG-000042".parse::<AnomalyId>().unwrap(), id);
        assert_eq!("42".parse::<AnomalyId>().unwrap(), id);
        assert!("SIG-XYZ".parse::<AnomalyId>().is_err());
    }

    #[test]
    fn test_accessors_by_payload() {
        let mut log = AnomalyLog::new(10);
        let anomaly = log
            .record(Detection {
                kind: AnomalyKind::Audio,
                timestamp: Utc::now(),
                deviation: Some(31.0),
                has_pattern: true,
                payload: AnomalyPayload::Spectral {
                    peaks: vec![Peak { index: 10, value: 150 }],
                    spectrum: SpectrumSample::silent(16),
                },
            })
            .clone();

        assert_eq!(anomaly.peak_count(), 1);
        assert_eq!(anomaly.spectrum().unwrap().len(), 16);

        let em = log.record(em_detection()).clone();
        assert_eq!(em.peak_count(), 0);
        assert!(em.spectrum().is_none());
    }
}
