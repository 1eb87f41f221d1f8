//! Session-wide counters.
//!
//! Totals survive stopping and restarting a scan; they reset only when the
//! process does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters for the current session.
#[derive(Debug)]
pub struct SessionStats {
    /// Scans started
    scans: AtomicU64,
    /// Anomalies flagged across all scans
    anomalies: AtomicU64,
    /// Transmissions completed
    transmits: AtomicU64,
    /// Interpretations produced
    interpretations: AtomicU64,
    /// Scan time of finished scans, in milliseconds
    scan_time_ms: AtomicU64,
    session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            scans: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
            transmits: AtomicU64::new(0),
            interpretations: AtomicU64::new(0),
            scan_time_ms: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_scan_started(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a finished scan's duration to the total.
    pub fn record_scan_time(&self, elapsed: Duration) {
        self.scan_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transmit(&self) {
        self.transmits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interpretation(&self) {
        self.interpretations.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters. `running` is the elapsed time of a scan in
    /// progress, folded into the scan time total.
    pub fn snapshot(&self, running: Option<Duration>) -> StatsSnapshot {
        let finished = Duration::from_millis(self.scan_time_ms.load(Ordering::Relaxed));
        StatsSnapshot {
            scans: self.scans.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            transmits: self.transmits.load(Ordering::Relaxed),
            interpretations: self.interpretations.load(Ordering::Relaxed),
            total_scan_secs: (finished + running.unwrap_or_default()).as_secs(),
            session_start: self.session_start,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self, running: Option<Duration>) -> String {
        let stats = self.snapshot(running);
        format!(
            "Session Statistics:\n\
             - Scans started: {}\n\
             - Total scan time: {}\n\
             - Anomalies detected: {}\n\
             - Interpretations: {}\n\
             - Transmissions: {}",
            stats.scans,
            format_duration(Duration::from_secs(stats.total_scan_secs)),
            stats.anomalies,
            stats.interpretations,
            stats.transmits,
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub scans: u64,
    pub anomalies: u64,
    pub transmits: u64,
    pub interpretations: u64,
    pub total_scan_secs: u64,
    pub session_start: DateTime<Utc>,
}

/// Thread-safe shared session statistics.
pub type SharedSessionStats = Arc<SessionStats>;

/// Format a duration as `HH:MM:SS`. Hours do not wrap.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = SessionStats::new();
        stats.record_scan_started();
        stats.record_anomaly();
        stats.record_anomaly();
        stats.record_transmit();

        let snap = stats.snapshot(None);
        assert_eq!(snap.scans, 1);
        assert_eq!(snap.anomalies, 2);
        assert_eq!(snap.transmits, 1);
        assert_eq!(snap.interpretations, 0);
    }

    #[test]
    fn test_scan_time_accumulates() {
        let stats = SessionStats::new();
        stats.record_scan_time(Duration::from_secs(61));
        stats.record_scan_time(Duration::from_millis(1500));

        assert_eq!(stats.snapshot(None).total_scan_secs, 62);
        assert_eq!(
            stats.snapshot(Some(Duration::from_secs(10))).total_scan_secs,
            72
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00");
        assert_eq!(format_duration(Duration::from_millis(3_723_900)), "01:02:03");
        assert_eq!(format_duration(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_summary_format() {
        let stats = SessionStats::new();
        stats.record_scan_time(Duration::from_secs(90));
        let summary = stats.summary(None);

        assert!(summary.contains("Session Statistics"));
        assert!(summary.contains("Total scan time: 00:01:30"));
        assert!(summary.contains("Anomalies detected: 0"));
    }
}
