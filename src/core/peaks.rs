//! Peak finding and spacing regularity over a spectrum.
//!
//! This is a coefficient-of-variation style check, not a periodicity
//! detector: a set of peaks is "regular" when the variance of the gaps
//! between them stays below a fraction of the mean gap.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Bins on each side a peak must beat.
const NEIGHBOURHOOD: usize = 2;

/// Minimum number of peaks for a regularity verdict.
const MIN_PATTERN_PEAKS: usize = 3;

/// A bin that is a strict local maximum above the peak threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub value: u8,
}

/// Result of running the peak/pattern test on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub peaks: Vec<Peak>,
    pub regular: bool,
}

/// Find every bin above `threshold` that is strictly greater than its
/// neighbours at ±1 and ±2. The outer two bins on each side are never peaks.
pub fn find_peaks(bins: &[u8], threshold: u8) -> Vec<Peak> {
    if bins.len() < 2 * NEIGHBOURHOOD + 1 {
        return Vec::new();
    }

    (NEIGHBOURHOOD..bins.len() - NEIGHBOURHOOD)
        .filter(|&i| {
            let v = bins[i];
            v > threshold
                && (1..=NEIGHBOURHOOD).all(|d| v > bins[i - d] && v > bins[i + d])
        })
        .map(|i| Peak {
            index: i,
            value: bins[i],
        })
        .collect()
}

/// Whether consecutive peak spacings are regular.
///
/// Requires at least three peaks; the population variance of the spacings
/// must be below `factor` times their mean. Peaks may be in either order.
pub fn has_regular_spacing(peaks: &[Peak], factor: f64) -> bool {
    if peaks.len() < MIN_PATTERN_PEAKS {
        return false;
    }

    let spacings: Vec<f64> = peaks
        .windows(2)
        .map(|pair| pair[1].index.abs_diff(pair[0].index) as f64)
        .collect();

    let mean = spacings.iter().mean();
    let variance = spacings.iter().population_variance();
    variance < mean * factor
}

/// Run peak detection and the regularity test together.
pub fn analyze_pattern(bins: &[u8], threshold: u8, factor: f64) -> PatternReport {
    let peaks = find_peaks(bins, threshold);
    let regular = has_regular_spacing(&peaks, factor);
    PatternReport { peaks, regular }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks_at(indices: &[usize]) -> Vec<Peak> {
        indices
            .iter()
            .map(|&index| Peak { index, value: 200 })
            .collect()
    }

    #[test]
    fn test_single_isolated_peak() {
        let mut bins = vec![0u8; 64];
        bins[30] = 150;
        let peaks = find_peaks(&bins, 100);
        assert_eq!(peaks, vec![Peak { index: 30, value: 150 }]);
    }

    #[test]
    fn test_peak_below_threshold_ignored() {
        let mut bins = vec![0u8; 64];
        bins[30] = 100;
        assert!(find_peaks(&bins, 100).is_empty());
    }

    #[test]
    fn test_edges_excluded() {
        let mut bins = vec![0u8; 16];
        bins[1] = 250;
        bins[14] = 250;
        assert!(find_peaks(&bins, 100).is_empty());
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        let mut bins = vec![0u8; 16];
        bins[7] = 180;
        bins[8] = 180;
        assert!(find_peaks(&bins, 100).is_empty());
    }

    #[test]
    fn test_second_neighbour_must_be_lower() {
        // Bin 4 beats its direct neighbour but not bin 2.
        let bins = [0, 0, 170, 120, 160, 0, 0, 0];
        let peaks = find_peaks(&bins, 100);
        assert_eq!(peaks, vec![Peak { index: 2, value: 170 }]);
    }

    #[test]
    fn test_short_sample_has_no_peaks() {
        assert!(find_peaks(&[0, 200, 0], 100).is_empty());
    }

    #[test]
    fn test_equal_spacing_is_regular() {
        assert!(has_regular_spacing(&peaks_at(&[10, 20, 30]), 0.3));
    }

    #[test]
    fn test_uneven_spacing_is_irregular() {
        assert!(!has_regular_spacing(&peaks_at(&[10, 15, 40]), 0.3));
    }

    #[test]
    fn test_descending_peaks_use_absolute_spacing() {
        assert!(has_regular_spacing(&peaks_at(&[30, 20, 10]), 0.3));
        assert!(!has_regular_spacing(&peaks_at(&[40, 15, 10]), 0.3));
    }

    #[test]
    fn test_two_peaks_never_regular() {
        assert!(!has_regular_spacing(&peaks_at(&[10, 20]), 0.3));
    }

    #[test]
    fn test_analyze_pattern_harmonics() {
        let mut bins = vec![0u8; 256];
        for i in (40..200).step_by(40) {
            bins[i] = 220;
        }
        let report = analyze_pattern(&bins, 100, 0.3);
        assert_eq!(report.peaks.len(), 4);
        assert!(report.regular);
    }
}
