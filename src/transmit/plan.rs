//! Timed tone schedules for an encoded message.

use crate::transmit::encode::Encoded;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bit slot for binary transmissions.
pub const BINARY_BIT: Duration = Duration::from_millis(50);
/// Tone used for a `1` bit.
pub const BINARY_TONE_HZ: f64 = 1000.0;
/// Character slot for frequency transmissions.
pub const FREQUENCY_SLOT: Duration = Duration::from_millis(150);
/// Tone within each character slot (80 % of the slot).
pub const FREQUENCY_TONE: Duration = Duration::from_millis(120);
/// Morse time unit.
pub const MORSE_UNIT: Duration = Duration::from_millis(80);
pub const MORSE_TONE_HZ: f64 = 700.0;

/// A sine burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency: f64,
    #[serde(with = "crate::config::duration_ms")]
    pub duration: Duration,
}

/// One step of a transmission: an optional tone, then a wait before the
/// next step starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneStep {
    pub tone: Option<Tone>,
    #[serde(with = "crate::config::duration_ms")]
    pub advance: Duration,
    /// Fraction of the transmission complete once this step ends
    pub progress: f64,
}

/// The whole tone schedule for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TonePlan {
    pub steps: Vec<ToneStep>,
}

impl TonePlan {
    pub fn from_encoded(encoded: &Encoded) -> Self {
        match encoded {
            Encoded::Binary(bits) => Self::binary(bits),
            Encoded::Frequency(freqs) => Self::frequency(freqs),
            Encoded::Morse(code) => Self::morse(code),
        }
    }

    /// One 50 ms slot per bit, 1000 Hz tone on a `1`.
    fn binary(bits: &str) -> Self {
        let total = bits.chars().count();
        let steps = bits
            .chars()
            .enumerate()
            .map(|(i, bit)| ToneStep {
                tone: (bit == '1').then_some(Tone {
                    frequency: BINARY_TONE_HZ,
                    duration: BINARY_BIT,
                }),
                advance: BINARY_BIT,
                progress: (i + 1) as f64 / total as f64,
            })
            .collect();
        Self { steps }
    }

    /// One 150 ms slot per character, tone for 80 % of it.
    fn frequency(freqs: &[f64]) -> Self {
        let total = freqs.len();
        let steps = freqs
            .iter()
            .enumerate()
            .map(|(i, &frequency)| ToneStep {
                tone: Some(Tone {
                    frequency,
                    duration: FREQUENCY_TONE,
                }),
                advance: FREQUENCY_SLOT,
                progress: (i + 1) as f64 / total as f64,
            })
            .collect();
        Self { steps }
    }

    /// Dot 1 unit on + 1 off, dash 3 on + 1 off, letter gap 2, word gap 4.
    fn morse(code: &str) -> Self {
        let units = |symbol: char| -> (u32, u32) {
            match symbol {
                '.' => (1, 2),
                '-' => (3, 4),
                ' ' => (0, 2),
                '/' => (0, 4),
                _ => (0, 0),
            }
        };

        let total_units: u32 = code.chars().map(|s| units(s).1).sum();
        let mut elapsed = 0u32;
        let mut steps = Vec::new();

        for symbol in code.chars() {
            let (on, advance) = units(symbol);
            if advance == 0 {
                continue;
            }
            elapsed += advance;
            steps.push(ToneStep {
                tone: (on > 0).then_some(Tone {
                    frequency: MORSE_TONE_HZ,
                    duration: MORSE_UNIT * on,
                }),
                advance: MORSE_UNIT * advance,
                progress: elapsed as f64 / total_units as f64,
            });
        }
        Self { steps }
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.advance).sum()
    }

    pub fn tone_count(&self) -> usize {
        self.steps.iter().filter(|s| s.tone.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
