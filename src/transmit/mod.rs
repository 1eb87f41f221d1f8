//! Outbound "transmissions": text encoded as tone sequences.
//!
//! A message is encoded (binary, frequency or morse), turned into a timed
//! [`TonePlan`], and optionally rendered to PCM/WAV for playback.

pub mod encode;
pub mod plan;
pub mod render;

pub use encode::{encode, preview, to_binary, to_frequencies, to_morse, Encoded, Encoding};
pub use plan::{Tone, TonePlan, ToneStep};
pub use render::{render_pcm, write_wav};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters of the message quoted in the activity log.
const EXCERPT_CHARS: usize = 30;

/// Transmission errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmitError {
    /// The message is empty or whitespace only
    EmptyMessage,
    /// Writing the rendered audio failed
    Wav(String),
}

impl std::fmt::Display for TransmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransmitError::EmptyMessage => write!(f, "Please enter a message to transmit"),
            TransmitError::Wav(e) => write!(f, "Audio render failed: {e}"),
        }
    }
}

impl std::error::Error for TransmitError {}

/// A validated, encoded and scheduled message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmission {
    pub message: String,
    pub encoded: Encoded,
    pub plan: TonePlan,
}

impl Transmission {
    /// Encode and schedule `message`. Whitespace-only input is rejected
    /// before any encoding work.
    pub fn prepare(message: &str, encoding: Encoding) -> Result<Self, TransmitError> {
        if message.trim().is_empty() {
            return Err(TransmitError::EmptyMessage);
        }
        let encoded = encode(message, encoding);
        let plan = TonePlan::from_encoded(&encoded);
        Ok(Self {
            message: message.to_string(),
            encoded,
            plan,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoded.encoding()
    }

    pub fn duration(&self) -> Duration {
        self.plan.total_duration()
    }

    /// Mono PCM for the whole transmission.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        render_pcm(&self.plan, sample_rate)
    }
}

/// The message as quoted in the log: at most 30 characters, then "...".
pub fn excerpt(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_rejected() {
        assert_eq!(
            Transmission::prepare("", Encoding::Morse),
            Err(TransmitError::EmptyMessage)
        );
        assert_eq!(
            Transmission::prepare("   \n\t", Encoding::Binary),
            Err(TransmitError::EmptyMessage)
        );
    }

    #[test]
    fn test_prepare() {
        let tx = Transmission::prepare("SOS", Encoding::Morse).unwrap();
        assert_eq!(tx.encoding(), Encoding::Morse);
        assert_eq!(tx.encoded, Encoded::Morse("... --- ...".to_string()));
        // 3 dots (2u) + 3 dashes (4u) + 3 dots + 2 letter gaps (2u) = 28 units
        assert_eq!(tx.duration(), Duration::from_millis(28 * 80));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("HELLO"), "HELLO");
        let exact = "x".repeat(30);
        assert_eq!(excerpt(&exact), exact);
        let long = "y".repeat(31);
        assert_eq!(excerpt(&long), format!("{}...", "y".repeat(30)));
    }
}
