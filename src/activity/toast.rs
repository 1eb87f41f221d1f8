//! Transient notifications for the front end.

use crate::core::cooldown::Cooldown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Pending toasts beyond this are dropped oldest first.
const MAX_PENDING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Info,
    Success,
    Error,
    Anomaly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub time: DateTime<Utc>,
}

/// Queue of toasts waiting to be shown.
///
/// Anomaly toasts are rate limited so a burst of detections raises one
/// notification; every other kind is always queued.
#[derive(Debug, Clone)]
pub struct ToastCenter {
    pending: VecDeque<Toast>,
    anomaly_gate: Cooldown,
}

impl ToastCenter {
    pub fn new(anomaly_interval: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            anomaly_gate: Cooldown::new(anomaly_interval),
        }
    }

    /// Queue a toast. Returns false when an anomaly toast was suppressed.
    pub fn push(
        &mut self,
        kind: ToastKind,
        message: impl Into<String>,
        time: DateTime<Utc>,
    ) -> bool {
        if kind == ToastKind::Anomaly && !self.anomaly_gate.try_fire(time) {
            return false;
        }

        self.pending.push_back(Toast {
            kind,
            message: message.into(),
            time,
        });
        while self.pending.len() > MAX_PENDING {
            self.pending.pop_front();
        }
        true
    }

    /// Take every pending toast, oldest first.
    pub fn drain(&mut self) -> Vec<Toast> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_anomaly_toasts_rate_limited() {
        let mut toasts = ToastCenter::new(Duration::from_millis(3000));
        let start = Utc::now();

        assert!(toasts.push(ToastKind::Anomaly, "Potential AUDIO signal detected!", start));
        assert!(!toasts.push(
            ToastKind::Anomaly,
            "Potential EM signal detected!",
            start + ChronoDuration::milliseconds(1000)
        ));
        assert!(toasts.push(
            ToastKind::Anomaly,
            "Potential EM signal detected!",
            start + ChronoDuration::milliseconds(3000)
        ));
        assert_eq!(toasts.pending(), 2);
    }

    #[test]
    fn test_other_kinds_always_queued() {
        let mut toasts = ToastCenter::new(Duration::from_millis(3000));
        let now = Utc::now();

        assert!(toasts.push(ToastKind::Info, "Scan initiated", now));
        assert!(toasts.push(ToastKind::Info, "Scan initiated", now));
        assert!(toasts.push(ToastKind::Error, "Transmission failed", now));

        let drained = toasts.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[2].kind, ToastKind::Error);
        assert_eq!(toasts.pending(), 0);
    }

    #[test]
    fn test_pending_is_bounded() {
        let mut toasts = ToastCenter::new(Duration::from_millis(3000));
        let now = Utc::now();
        for i in 0..40 {
            toasts.push(ToastKind::Info, format!("toast {i}"), now);
        }

        let drained = toasts.drain();
        assert_eq!(drained.len(), MAX_PENDING);
        assert_eq!(drained[0].message, "toast 8");
    }
}
