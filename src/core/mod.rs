//! Detection core for CosmicLink.
//!
//! This module contains:
//! - Spectrum deviation and band profiles
//! - Peak finding and spacing regularity
//! - Baseline capture and per-type cooldowns
//! - Camera frame differencing
//! - The anomaly detector and the capped anomaly log

pub mod anomaly;
pub mod baseline;
pub mod cooldown;
pub mod cosmic;
pub mod detector;
pub mod peaks;
pub mod spectrum;

// Re-export commonly used types
pub use anomaly::{Anomaly, AnomalyId, AnomalyKind, AnomalyLog, AnomalyPayload, Detection};
pub use baseline::Baseline;
pub use cooldown::{Cooldown, CooldownGate};
pub use cosmic::{FrameDiffer, FrameHits};
pub use detector::{AnomalyDetector, AudioAssessment};
pub use peaks::{analyze_pattern, find_peaks, has_regular_spacing, PatternReport, Peak};
pub use spectrum::{
    deviation_profile, mean_abs_deviation, DeviationProfile, DominantBand, FrequencyProfile,
};
