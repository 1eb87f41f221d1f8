//! Flavor-text interpretation of flagged anomalies.
//!
//! An anomaly is reduced to a [`SignalSummary`] and handed to an
//! [`Interpreter`]. The remote interpreter (feature `remote`) asks a
//! text-generation API; whenever it is missing or fails, the local template
//! interpreter answers instead, so interpreting never fails outright.

pub mod local;
#[cfg(feature = "remote")]
pub mod remote;

pub use local::LocalInterpreter;
#[cfg(feature = "remote")]
pub use remote::{BlockingMessagesClient, MessagesClient};

use crate::core::anomaly::{Anomaly, AnomalyId, AnomalyKind};
use crate::core::spectrum::FrequencyProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an interpreter is told about an anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub id: AnomalyId,
    pub kind: AnomalyKind,
    pub timestamp: DateTime<Utc>,
    pub deviation: Option<f64>,
    pub peak_count: usize,
    pub has_pattern: bool,
    /// Band averages of the captured spectrum, when there is one
    pub frequency_profile: Option<FrequencyProfile>,
}

impl SignalSummary {
    pub fn from_anomaly(anomaly: &Anomaly) -> Self {
        Self {
            id: anomaly.id,
            kind: anomaly.kind,
            timestamp: anomaly.timestamp,
            deviation: anomaly.deviation,
            peak_count: anomaly.peak_count(),
            has_pattern: anomaly.has_pattern,
            frequency_profile: anomaly.spectrum().and_then(FrequencyProfile::from_sample),
        }
    }

    /// Deviation to two decimals, or "Unknown".
    pub fn deviation_text(&self) -> String {
        self.deviation
            .map(|d| format!("{d:.2}"))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn pattern_text(&self) -> &'static str {
        if self.has_pattern {
            "Regular spacing - possible intentional structure"
        } else {
            "No clear pattern"
        }
    }
}

/// The prompt sent to the remote interpreter.
pub fn build_prompt(summary: &SignalSummary) -> String {
    let profile = summary
        .frequency_profile
        .map(|p| p.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let dominant = summary
        .frequency_profile
        .map(|p| p.dominant.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        "You are the signal analysis unit of CosmicLink, an amateur detection array. \
         Give a brief, intriguing interpretation of the signal below. Sound scientific, \
         stay grounded in the numbers, and keep it mysterious but not absurd.\n\
         \n\
         Signal: {id}\n\
         Type: {kind}\n\
         Timestamp: {timestamp}\n\
         Deviation from baseline: {deviation}\n\
         Peak count: {peaks}\n\
         Pattern: {pattern}\n\
         Frequency profile: {profile}\n\
         Dominant band: {dominant}\n\
         \n\
         Answer in 2-3 sentences.",
        id = summary.id,
        kind = summary.kind,
        timestamp = summary.timestamp.to_rfc3339(),
        deviation = summary.deviation_text(),
        peaks = summary.peak_count,
        pattern = summary.pattern_text(),
    )
}

/// Where an interpretation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationSource {
    Remote,
    Local,
}

impl InterpretationSource {
    /// Heading shown above the text.
    pub fn heading(&self) -> &'static str {
        match self {
            InterpretationSource::Remote => "AI INTERPRETATION",
            InterpretationSource::Local => "SIGNAL ANALYSIS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub anomaly: AnomalyId,
    pub source: InterpretationSource,
    pub heading: String,
    pub text: String,
}

impl Interpretation {
    pub fn new(anomaly: AnomalyId, source: InterpretationSource, text: String) -> Self {
        Self {
            anomaly,
            source,
            heading: source.heading().to_string(),
            text,
        }
    }
}

/// Interpretation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    /// No API key in the configured environment variable
    MissingApiKey(String),
    /// Client setup failed
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// Response body could not be decoded
    Serialization(String),
    /// Response carried no text block
    EmptyResponse,
}

impl std::fmt::Display for InterpretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpretError::MissingApiKey(var) => write!(f, "No API key set in ${var}"),
            InterpretError::Config(msg) => write!(f, "Interpreter config error: {msg}"),
            InterpretError::Network(msg) => write!(f, "Interpreter network error: {msg}"),
            InterpretError::Server { status, message } => {
                write!(f, "Interpreter server error ({status}): {message}")
            }
            InterpretError::Serialization(msg) => {
                write!(f, "Interpreter response error: {msg}")
            }
            InterpretError::EmptyResponse => write!(f, "Interpreter returned no text"),
        }
    }
}

impl std::error::Error for InterpretError {}

/// Something that turns a signal summary into text.
pub trait Interpreter: Send + Sync {
    fn source(&self) -> InterpretationSource;

    fn interpret(&self, summary: &SignalSummary) -> Result<String, InterpretError>;
}

/// Runs an optional primary interpreter with the local fallback behind it.
pub struct InterpretationService {
    primary: Option<Box<dyn Interpreter>>,
    fallback: LocalInterpreter,
}

impl InterpretationService {
    /// Local templates only.
    pub fn local() -> Self {
        Self {
            primary: None,
            fallback: LocalInterpreter,
        }
    }

    pub fn with_primary(primary: Box<dyn Interpreter>) -> Self {
        Self {
            primary: Some(primary),
            fallback: LocalInterpreter,
        }
    }

    /// Interpret `summary`. Never fails: any primary error falls back to
    /// the local templates.
    pub fn interpret(&self, summary: &SignalSummary) -> Interpretation {
        if let Some(primary) = &self.primary {
            match primary.interpret(summary) {
                Ok(text) => return Interpretation::new(summary.id, primary.source(), text),
                Err(e) => {
                    tracing::warn!(
                        anomaly = %summary.id,
                        "Interpretation failed, using local analysis: {e}"
                    );
                }
            }
        }
        fallback_interpretation(summary)
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }
}

impl Default for InterpretationService {
    fn default() -> Self {
        Self::local()
    }
}

/// The local template answer for `summary`.
pub fn fallback_interpretation(summary: &SignalSummary) -> Interpretation {
    Interpretation::new(
        summary.id,
        InterpretationSource::Local,
        LocalInterpreter.render(summary),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anomaly::{AnomalyLog, AnomalyPayload, Detection};
    use crate::core::peaks::Peak;
    use crate::sensor::types::SpectrumSample;

    struct FailingInterpreter;

    impl Interpreter for FailingInterpreter {
        fn source(&self) -> InterpretationSource {
            InterpretationSource::Remote
        }

        fn interpret(&self, _summary: &SignalSummary) -> Result<String, InterpretError> {
            Err(InterpretError::Network("connection refused".to_string()))
        }
    }

    struct CannedInterpreter;

    impl Interpreter for CannedInterpreter {
        fn source(&self) -> InterpretationSource {
            InterpretationSource::Remote
        }

        fn interpret(&self, summary: &SignalSummary) -> Result<String, InterpretError> {
            Ok(format!("{} is a greeting", summary.id))
        }
    }

    fn audio_anomaly() -> Anomaly {
        let mut log = AnomalyLog::new(10);
        let mut bins = vec![0u8; 300];
        for b in bins.iter_mut().take(99) {
            *b = 120;
        }
        log.record(Detection {
            kind: AnomalyKind::Audio,
            timestamp: Utc::now(),
            deviation: Some(42.5),
            has_pattern: true,
            payload: AnomalyPayload::Spectral {
                peaks: vec![
                    Peak { index: 10, value: 150 },
                    Peak { index: 20, value: 150 },
                    Peak { index: 30, value: 150 },
                ],
                spectrum: SpectrumSample::new(bins),
            },
        })
        .clone()
    }

    #[test]
    fn test_summary_from_anomaly() {
        let summary = SignalSummary::from_anomaly(&audio_anomaly());

        assert_eq!(summary.peak_count, 3);
        assert!(summary.has_pattern);
        assert_eq!(summary.deviation_text(), "42.50");
        let profile = summary.frequency_profile.unwrap();
        assert_eq!(profile.dominant, crate::core::spectrum::DominantBand::Low);
    }

    #[test]
    fn test_prompt_contents() {
        let summary = SignalSummary::from_anomaly(&audio_anomaly());
        let prompt = build_prompt(&summary);

        assert!(prompt.contains("Type: AUDIO"));
        assert!(prompt.contains("Deviation from baseline: 42.50"));
        assert!(prompt.contains("Peak count: 3"));
        assert!(prompt.contains("Regular spacing"));
        assert!(prompt.contains("Dominant band: LOW"));
    }

    #[test]
    fn test_fallback_on_failure() {
        let service = InterpretationService::with_primary(Box::new(FailingInterpreter));
        let summary = SignalSummary::from_anomaly(&audio_anomaly());

        let result = service.interpret(&summary);
        assert_eq!(result.source, InterpretationSource::Local);
        assert_eq!(result.heading, "SIGNAL ANALYSIS");
        assert!(!result.text.is_empty());
    }

    #[test]
    fn test_primary_success() {
        let service = InterpretationService::with_primary(Box::new(CannedInterpreter));
        let summary = SignalSummary::from_anomaly(&audio_anomaly());

        let result = service.interpret(&summary);
        assert_eq!(result.source, InterpretationSource::Remote);
        assert_eq!(result.heading, "AI INTERPRETATION");
        assert_eq!(result.text, "SIG-000001 is a greeting");
    }

    #[test]
    fn test_local_only_service() {
        let service = InterpretationService::local();
        assert!(!service.has_primary());
        let summary = SignalSummary::from_anomaly(&audio_anomaly());
        assert_eq!(service.interpret(&summary).source, InterpretationSource::Local);
    }
}
