//! Template interpreter used offline and as the fallback.

use crate::core::spectrum::DominantBand;
use crate::interpret::{InterpretError, InterpretationSource, Interpreter, SignalSummary};

/// Picks one of four templates from the anomaly id.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInterpreter;

const TEMPLATE_COUNT: u64 = 4;

impl LocalInterpreter {
    pub fn render(&self, s: &SignalSummary) -> String {
        let kind = s.kind;
        let peaks = s.peak_count;
        let deviation = s
            .deviation
            .map(|d| format!("{d:.1}"))
            .unwrap_or_else(|| "an unmeasured amount".to_string());
        let strong = s.deviation.map(|d| d > 40.0).unwrap_or(false);

        match s.id.0 % TEMPLATE_COUNT {
            0 => format!(
                "{kind} signal shows {}. Deviation from baseline reached {deviation} across \
                 {peaks} frequency peak{}. {}",
                if s.has_pattern {
                    "a regular pattern, structured periodicity suggesting artificial origin"
                } else {
                    "no clear pattern, the chaotic variance typical of natural phenomena"
                },
                plural(peaks),
                if peaks > 2 {
                    "The distinct peaks warrant further monitoring."
                } else {
                    "Continued observation recommended."
                }
            ),
            1 => format!(
                "Analysis of this {kind} event indicates a {} deviation of {deviation} from \
                 baseline, with {peaks} peak{} and {}. {}",
                if strong { "significant" } else { "moderate" },
                plural(peaks),
                if s.has_pattern {
                    "a regular spacing pattern"
                } else {
                    "no regular pattern"
                },
                match s.frequency_profile.map(|p| p.dominant) {
                    Some(DominantBand::Low) => {
                        "Low frequency dominance is consistent with deep-space propagation."
                    }
                    Some(DominantBand::High) => {
                        "High frequency components suggest a proximate or high-energy source."
                    }
                    None => "Source classification: uncertain.",
                }
            ),
            2 => format!(
                "{kind} anomaly with {}. Signal strength of {deviation} exceeds threshold \
                 and {peaks} peak{} {} resolved. {}",
                if s.has_pattern {
                    "a regular pattern, mathematical regularity defying random noise"
                } else {
                    "a stochastic distribution and no pattern"
                },
                plural(peaks),
                if peaks == 1 { "was" } else { "were" },
                if peaks >= 3 {
                    "Multiple harmonic peaks detected - possible carrier wave."
                } else {
                    "Source classification: uncertain."
                }
            ),
            _ => format!(
                "Spectral review of the {kind} event reveals {}. The {} deviation of \
                 {deviation} and {peaks} peak{} could indicate {}.",
                if s.has_pattern {
                    "a regular pattern and non-random energy distribution"
                } else {
                    "no pattern, only broadband noise characteristics"
                },
                if s.deviation.map(|d| d > 30.0).unwrap_or(false) {
                    "pronounced"
                } else {
                    "subtle"
                },
                plural(peaks),
                if peaks > 3 {
                    "an information-bearing signal"
                } else {
                    "environmental interference or exotic phenomena"
                }
            ),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

impl Interpreter for LocalInterpreter {
    fn source(&self) -> InterpretationSource {
        InterpretationSource::Local
    }

    fn interpret(&self, summary: &SignalSummary) -> Result<String, InterpretError> {
        Ok(self.render(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anomaly::{AnomalyId, AnomalyKind};
    use chrono::Utc;

    fn summary(id: u64, has_pattern: bool) -> SignalSummary {
        SignalSummary {
            id: AnomalyId(id),
            kind: AnomalyKind::Ultrasonic,
            timestamp: Utc::now(),
            deviation: Some(37.25),
            peak_count: 5,
            has_pattern,
            frequency_profile: None,
        }
    }

    #[test]
    fn test_every_template_mentions_the_facts() {
        for id in 0..TEMPLATE_COUNT {
            for has_pattern in [true, false] {
                let text = LocalInterpreter.render(&summary(id, has_pattern));
                assert!(text.contains("ULTRASONIC"), "{text}");
                assert!(text.contains("37.2") || text.contains("37.3"), "{text}");
                assert!(text.contains("5 peaks") || text.contains("5 frequency peaks"), "{text}");
                assert!(text.contains("pattern"), "{text}");
            }
        }
    }

    #[test]
    fn test_template_choice_is_deterministic() {
        let a = LocalInterpreter.render(&summary(7, true));
        let b = LocalInterpreter.render(&summary(7, true));
        assert_eq!(a, b);
        assert_ne!(a, LocalInterpreter.render(&summary(8, true)));
    }

    #[test]
    fn test_missing_deviation() {
        let mut s = summary(2, false);
        s.deviation = None;
        s.peak_count = 1;
        let text = LocalInterpreter.render(&s);
        assert!(text.contains("an unmeasured amount"));
        assert!(text.contains("1 peak was"));
    }
}
