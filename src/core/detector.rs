//! The anomaly decision rules.
//!
//! Each check compares a live reading with its baseline, decides whether it
//! is anomalous, and then passes the candidate through a per-type cooldown
//! window so a sustained condition yields one event per window.

use crate::config::DetectionConfig;
use crate::core::anomaly::{AnomalyKind, AnomalyPayload, Detection};
use crate::core::cooldown::CooldownGate;
use crate::core::cosmic::{FrameDiffer, FrameHits};
use crate::core::peaks::{analyze_pattern, PatternReport};
use crate::core::spectrum::{deviation_profile, DeviationProfile};
use crate::sensor::types::{SpectrumSample, VideoFrame};
use chrono::{DateTime, Utc};

/// Minimum share of the total deviation the top band must carry for an
/// audio event to be classed as ULTRASONIC.
const ULTRASONIC_MIN_SHARE: f64 = 0.5;

/// Outcome of evaluating one spectrum, before rate limiting.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAssessment {
    pub deviation: DeviationProfile,
    pub pattern: PatternReport,
    /// The anomaly type this sample qualifies for, if any
    pub candidate: Option<AnomalyKind>,
}

/// Applies thresholds and cooldowns to live readings.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectionConfig,
    cooldowns: CooldownGate<AnomalyKind>,
    frames: FrameDiffer,
}

impl AnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        let cooldowns = CooldownGate::new([
            (AnomalyKind::Audio, config.audio_cooldown),
            (AnomalyKind::Ultrasonic, config.ultrasonic_cooldown),
            (AnomalyKind::Em, config.em_cooldown),
            (AnomalyKind::Cosmic, config.cosmic_cooldown),
        ]);
        let frames = FrameDiffer::new(config.cosmic_brightness_delta);
        Self {
            config,
            cooldowns,
            frames,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Forget cooldowns and the previous frame (new scan).
    pub fn reset(&mut self) {
        self.cooldowns.reset();
        self.frames.reset();
    }

    /// Evaluate a spectrum against the audio baseline without side effects.
    pub fn assess_audio(
        &self,
        current: &SpectrumSample,
        baseline: &SpectrumSample,
    ) -> AudioAssessment {
        let deviation = deviation_profile(current, baseline, self.config.ultrasonic_band_fraction);
        let pattern = analyze_pattern(
            current.bins(),
            self.config.peak_threshold,
            self.config.regularity_factor,
        );

        let candidate = if deviation.overall > self.config.audio_deviation_threshold
            || pattern.regular
        {
            let ultrasonic = deviation.high_band > self.config.ultrasonic_deviation_threshold
                && deviation.high_band_share >= ULTRASONIC_MIN_SHARE;
            Some(if ultrasonic {
                AnomalyKind::Ultrasonic
            } else {
                AnomalyKind::Audio
            })
        } else {
            None
        };

        AudioAssessment {
            deviation,
            pattern,
            candidate,
        }
    }

    /// Audio path: flag AUDIO or ULTRASONIC when the spectrum deviates or
    /// shows a regular peak pattern, at most once per cooldown window.
    pub fn check_audio(
        &mut self,
        current: &SpectrumSample,
        baseline: &SpectrumSample,
        now: DateTime<Utc>,
    ) -> Option<Detection> {
        let assessment = self.assess_audio(current, baseline);
        tracing::debug!(
            deviation = assessment.deviation.overall,
            high_band = assessment.deviation.high_band,
            peaks = assessment.pattern.peaks.len(),
            regular = assessment.pattern.regular,
            "audio check"
        );

        let kind = assessment.candidate?;
        if !self.cooldowns.try_fire(kind, now) {
            return None;
        }

        Some(Detection {
            kind,
            timestamp: now,
            deviation: Some(assessment.deviation.overall),
            has_pattern: assessment.pattern.regular,
            payload: AnomalyPayload::Spectral {
                peaks: assessment.pattern.peaks,
                spectrum: current.clone(),
            },
        })
    }

    /// Magnetometer path: flag EM when the field magnitude moves away from
    /// the baseline by more than the threshold.
    pub fn check_magnetic(
        &mut self,
        current: f64,
        baseline: f64,
        now: DateTime<Utc>,
    ) -> Option<Detection> {
        let deviation = (current - baseline).abs();
        tracing::debug!(current, baseline, deviation, "magnetic check");

        if deviation <= self.config.em_deviation_threshold {
            return None;
        }
        if !self.cooldowns.try_fire(AnomalyKind::Em, now) {
            return None;
        }

        Some(Detection {
            kind: AnomalyKind::Em,
            timestamp: now,
            deviation: Some(deviation),
            has_pattern: false,
            payload: AnomalyPayload::Magnetic { baseline, current },
        })
    }

    /// Camera path: flag COSMIC when enough pixels brighten at once.
    ///
    /// Every frame updates the comparison state, even while the cooldown
    /// holds, so hits are always measured against the immediately
    /// preceding frame.
    pub fn check_frame(&mut self, frame: &VideoFrame, now: DateTime<Utc>) -> Option<Detection> {
        let FrameHits { hits, cumulative } = self.frames.compare(frame)?;
        if hits < self.config.cosmic_cluster_threshold {
            return None;
        }
        if !self.cooldowns.try_fire(AnomalyKind::Cosmic, now) {
            tracing::debug!(hits, "cosmic cluster suppressed by cooldown");
            return None;
        }

        Some(Detection {
            kind: AnomalyKind::Cosmic,
            timestamp: now,
            deviation: None,
            has_pattern: hits > self.config.cosmic_pattern_threshold,
            payload: AnomalyPayload::Cosmic {
                hit_count: hits,
                cumulative_hits: cumulative,
            },
        })
    }

    /// Total brightening pixels seen by the camera path this scan.
    pub fn cumulative_hits(&self) -> u64 {
        self.frames.cumulative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(DetectionConfig::default())
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
            + ChronoDuration::milliseconds(ms)
    }

    fn harmonic_sample(len: usize) -> SpectrumSample {
        let mut bins = vec![0u8; len];
        for i in (100..500).step_by(100) {
            bins[i] = 200;
        }
        SpectrumSample::new(bins)
    }

    #[test]
    fn test_identical_spectrum_never_flags() {
        let mut detector = detector();
        let sample = SpectrumSample::new(vec![40; 1024]);

        let assessment = detector.assess_audio(&sample, &sample);
        assert_eq!(assessment.deviation.overall, 0.0);
        assert_eq!(assessment.candidate, None);
        assert!(detector.check_audio(&sample, &sample, at(0)).is_none());
    }

    #[test]
    fn test_single_spike_against_silence() {
        let mut detector = detector();
        let baseline = SpectrumSample::silent(2048);
        let mut bins = vec![0u8; 2048];
        bins[500] = 200;
        let current = SpectrumSample::new(bins);

        let assessment = detector.assess_audio(&current, &baseline);
        assert!((assessment.deviation.overall - 0.09765625).abs() < 1e-9);
        assert_eq!(assessment.pattern.peaks.len(), 1);
        assert!(!assessment.pattern.regular);
        assert!(detector.check_audio(&current, &baseline, at(0)).is_none());
    }

    #[test]
    fn test_loud_spectrum_flags_audio() {
        let mut detector = detector();
        let baseline = SpectrumSample::silent(1024);
        let current = SpectrumSample::new(vec![80; 1024]);

        let detection = detector.check_audio(&current, &baseline, at(0)).unwrap();
        assert_eq!(detection.kind, AnomalyKind::Audio);
        assert_eq!(detection.deviation, Some(80.0));
        assert!(!detection.has_pattern);
    }

    #[test]
    fn test_regular_pattern_flags_without_deviation() {
        let mut detector = detector();
        let sample = harmonic_sample(1024);

        let detection = detector.check_audio(&sample, &sample, at(0)).unwrap();
        assert_eq!(detection.kind, AnomalyKind::Audio);
        assert!(detection.has_pattern);
        assert_eq!(detection.deviation, Some(0.0));
    }

    #[test]
    fn test_high_band_energy_is_ultrasonic() {
        let mut detector = detector();
        let baseline = SpectrumSample::silent(1000);
        let mut bins = vec![0u8; 1000];
        for b in bins.iter_mut().skip(800) {
            *b = 250;
        }
        let current = SpectrumSample::new(bins);

        let detection = detector.check_audio(&current, &baseline, at(0)).unwrap();
        assert_eq!(detection.kind, AnomalyKind::Ultrasonic);
    }

    #[test]
    fn test_audio_cooldown() {
        let mut detector = detector();
        let baseline = SpectrumSample::silent(256);
        let current = SpectrumSample::new(vec![90; 256]);

        assert!(detector.check_audio(&current, &baseline, at(0)).is_some());
        assert!(detector.check_audio(&current, &baseline, at(500)).is_none());
        assert!(detector.check_audio(&current, &baseline, at(1500)).is_none());
        assert!(detector.check_audio(&current, &baseline, at(2000)).is_some());
    }

    #[test]
    fn test_magnetic_threshold_and_payload() {
        let mut detector = detector();
        assert!(detector.check_magnetic(44.0, 40.0, at(0)).is_none());

        let detection = detector.check_magnetic(52.0, 40.0, at(0)).unwrap();
        assert_eq!(detection.kind, AnomalyKind::Em);
        assert_eq!(detection.deviation, Some(12.0));
        assert_eq!(
            detection.payload,
            AnomalyPayload::Magnetic {
                baseline: 40.0,
                current: 52.0
            }
        );
        assert!(detector.check_magnetic(30.0, 40.0, at(1000)).is_none());
    }

    #[test]
    fn test_cosmic_once_per_cooldown_window() {
        let mut detector = detector();
        let dark = VideoFrame::uniform(8, 8, 5);
        let bright = VideoFrame::uniform(8, 8, 200);

        let mut flagged = Vec::new();
        // Strike on every other frame for 9.9 seconds at 100 ms spacing.
        for step in 0..100 {
            let frame = if step % 2 == 0 { &dark } else { &bright };
            if let Some(d) = detector.check_frame(frame, at(step * 100)) {
                flagged.push(d);
            }
        }

        let times: Vec<DateTime<Utc>> = flagged.iter().map(|d| d.timestamp).collect();
        assert_eq!(times, vec![at(100), at(5100)]);
        assert!(flagged.iter().all(|d| d.has_pattern));
        assert!(flagged.iter().all(|d| d.deviation.is_none()));
    }

    #[test]
    fn test_small_cluster_ignored() {
        let mut detector = detector();
        let base = VideoFrame::uniform(4, 4, 0);
        let mut strike = base.clone();
        strike.rgba[0..3].copy_from_slice(&[255, 255, 255]);

        detector.check_frame(&base, at(0));
        assert!(detector.check_frame(&strike, at(100)).is_none());
        assert_eq!(detector.cumulative_hits(), 1);
    }

    #[test]
    fn test_reset_clears_cooldowns() {
        let mut detector = detector();
        assert!(detector.check_magnetic(60.0, 40.0, at(0)).is_some());
        detector.reset();
        assert!(detector.check_magnetic(60.0, 40.0, at(100)).is_some());
    }
}
