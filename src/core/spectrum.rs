//! Spectrum comparisons against the audio baseline.

use crate::sensor::types::SpectrumSample;
use serde::{Deserialize, Serialize};

/// How far a live spectrum sits from the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationProfile {
    /// Mean absolute per-bin difference across the whole spectrum
    pub overall: f64,
    /// Mean absolute per-bin difference within the top band
    pub high_band: f64,
    /// Share of the total absolute difference that falls in the top band
    pub high_band_share: f64,
}

/// Mean absolute per-bin difference between `current` and `baseline`.
///
/// Only overlapping bins are compared; an empty overlap has no deviation.
pub fn mean_abs_deviation(current: &SpectrumSample, baseline: &SpectrumSample) -> f64 {
    deviation_profile(current, baseline, 0.0).overall
}

/// Compute overall and top-band deviation in one pass.
///
/// `band_fraction` is the fraction of bins, counted from the top, that
/// make up the high band.
pub fn deviation_profile(
    current: &SpectrumSample,
    baseline: &SpectrumSample,
    band_fraction: f64,
) -> DeviationProfile {
    let len = current.len().min(baseline.len());
    if len == 0 {
        return DeviationProfile::default();
    }

    let band_len = ((len as f64 * band_fraction.clamp(0.0, 1.0)).ceil() as usize).min(len);
    let band_start = len - band_len;

    let mut total = 0.0;
    let mut band_total = 0.0;
    for (i, (&c, &b)) in current.bins().iter().zip(baseline.bins()).enumerate() {
        let diff = (c as f64 - b as f64).abs();
        total += diff;
        if i >= band_start {
            band_total += diff;
        }
    }

    DeviationProfile {
        overall: total / len as f64,
        high_band: if band_len == 0 {
            0.0
        } else {
            band_total / band_len as f64
        },
        high_band_share: if total == 0.0 { 0.0 } else { band_total / total },
    }
}

/// Which third of the spectrum dominates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DominantBand {
    Low,
    High,
}

impl std::fmt::Display for DominantBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DominantBand::Low => f.write_str("LOW"),
            DominantBand::High => f.write_str("HIGH"),
        }
    }
}

/// Average magnitude of the low, mid and high thirds of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyProfile {
    pub low_avg: f64,
    pub mid_avg: f64,
    pub high_avg: f64,
    pub dominant: DominantBand,
}

impl FrequencyProfile {
    /// Summarise a spectrum. Returns `None` for an empty sample.
    pub fn from_sample(sample: &SpectrumSample) -> Option<Self> {
        let bins = sample.bins();
        if bins.is_empty() {
            return None;
        }

        let low_end = (bins.len() as f64 * 0.33).floor() as usize;
        let mid_end = (bins.len() as f64 * 0.66).floor() as usize;
        let (low, rest) = bins.split_at(low_end);
        let (mid, high) = rest.split_at(mid_end - low_end);

        let sum = |band: &[u8]| band.iter().map(|&b| b as f64).sum::<f64>();
        let avg = |band: &[u8]| {
            if band.is_empty() {
                0.0
            } else {
                sum(band) / band.len() as f64
            }
        };

        Some(Self {
            low_avg: avg(low),
            mid_avg: avg(mid),
            high_avg: avg(high),
            dominant: if sum(low) > sum(high) {
                DominantBand::Low
            } else {
                DominantBand::High
            },
        })
    }
}

impl std::fmt::Display for FrequencyProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Low: {:.0}, Mid: {:.0}, High: {:.0} (dominant {})",
            self.low_avg, self.mid_avg, self.high_avg, self.dominant
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples_have_no_deviation() {
        let sample = SpectrumSample::new((0..64).map(|i| (i * 3) as u8).collect());
        assert_eq!(mean_abs_deviation(&sample, &sample), 0.0);
    }

    #[test]
    fn test_single_spike_deviation() {
        let baseline = SpectrumSample::silent(2048);
        let mut bins = vec![0u8; 2048];
        bins[500] = 200;
        let current = SpectrumSample::new(bins);

        let deviation = mean_abs_deviation(&current, &baseline);
        assert!((deviation - 200.0 / 2048.0).abs() < 1e-9);
    }

    #[test]
    fn test_high_band_concentration() {
        let baseline = SpectrumSample::silent(100);
        let mut bins = vec![0u8; 100];
        for b in bins.iter_mut().skip(80) {
            *b = 200;
        }
        let profile = deviation_profile(&SpectrumSample::new(bins), &baseline, 0.2);

        assert!((profile.overall - 40.0).abs() < 1e-9);
        assert!((profile.high_band - 200.0).abs() < 1e-9);
        assert!((profile.high_band_share - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_lengths_compare_overlap() {
        let baseline = SpectrumSample::new(vec![10, 10]);
        let current = SpectrumSample::new(vec![20, 20, 255, 255]);
        assert_eq!(mean_abs_deviation(&current, &baseline), 10.0);
        assert_eq!(
            mean_abs_deviation(&current, &SpectrumSample::default()),
            0.0
        );
    }

    #[test]
    fn test_frequency_profile() {
        let mut bins = vec![0u8; 300];
        for b in bins.iter_mut().take(99) {
            *b = 90;
        }
        let profile = FrequencyProfile::from_sample(&SpectrumSample::new(bins)).unwrap();
        assert_eq!(profile.dominant, DominantBand::Low);
        assert!((profile.low_avg - 90.0).abs() < 1e-9);
        assert_eq!(profile.high_avg, 0.0);

        assert!(FrequencyProfile::from_sample(&SpectrumSample::default()).is_none());
    }
}
