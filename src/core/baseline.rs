//! Per-scan reference readings.

use crate::sensor::types::SpectrumSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference readings captured once per scan.
///
/// Until a value is captured the matching deviation check is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
    audio: Option<SpectrumSample>,
    magnetic: Option<f64>,
    captured_at: Option<DateTime<Utc>>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the reference readings.
    ///
    /// Capturing happens once; later calls are ignored until [`Baseline::clear`].
    pub fn capture(
        &mut self,
        audio: Option<&SpectrumSample>,
        magnetic: Option<f64>,
        at: DateTime<Utc>,
    ) -> bool {
        if self.captured_at.is_some() {
            return false;
        }
        self.audio = audio.cloned();
        self.magnetic = magnetic;
        self.captured_at = Some(at);
        true
    }

    /// Forget everything (new scan).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_captured(&self) -> bool {
        self.captured_at.is_some()
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    pub fn audio(&self) -> Option<&SpectrumSample> {
        self.audio.as_ref()
    }

    pub fn magnetic(&self) -> Option<f64> {
        self.magnetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_once() {
        let mut baseline = Baseline::new();
        let sample = SpectrumSample::new(vec![1, 2, 3]);
        let now = Utc::now();

        assert!(baseline.capture(Some(&sample), Some(48.0), now));
        assert!(!baseline.capture(None, None, now));
        assert_eq!(baseline.audio(), Some(&sample));
        assert_eq!(baseline.magnetic(), Some(48.0));
    }

    #[test]
    fn test_capture_copies_spectrum() {
        let mut baseline = Baseline::new();
        let mut sample = SpectrumSample::new(vec![5; 4]);
        baseline.capture(Some(&sample), None, Utc::now());

        sample = SpectrumSample::new(vec![9; 4]);
        assert_ne!(baseline.audio(), Some(&sample));
        assert_eq!(baseline.audio().unwrap().bins(), &[5, 5, 5, 5]);
    }

    #[test]
    fn test_partial_capture_and_clear() {
        let mut baseline = Baseline::new();
        baseline.capture(None, Some(30.0), Utc::now());
        assert!(baseline.is_captured());
        assert!(baseline.audio().is_none());

        baseline.clear();
        assert!(!baseline.is_captured());
        assert!(baseline.magnetic().is_none());
    }
}
