//! Text encodings for outbound transmissions.

use serde::{Deserialize, Serialize};

/// How a message is turned into tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Binary,
    Frequency,
    Morse,
}

impl Encoding {
    pub const ALL: [Encoding; 3] = [Encoding::Binary, Encoding::Frequency, Encoding::Morse];

    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Binary => "binary",
            Encoding::Frequency => "frequency",
            Encoding::Morse => "morse",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(Encoding::Binary),
            "frequency" | "freq" => Ok(Encoding::Frequency),
            "morse" => Ok(Encoding::Morse),
            other => Err(format!("unknown encoding '{other}'")),
        }
    }
}

/// A message in its encoded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "symbols", rename_all = "lowercase")]
pub enum Encoded {
    /// Concatenated 8-bit (or wider) character codes
    Binary(String),
    /// One tone frequency in Hz per character
    Frequency(Vec<f64>),
    /// Dots, dashes, letter-separating spaces and `/` for word breaks
    Morse(String),
}

impl Encoded {
    pub fn encoding(&self) -> Encoding {
        match self {
            Encoded::Binary(_) => Encoding::Binary,
            Encoded::Frequency(_) => Encoding::Frequency,
            Encoded::Morse(_) => Encoding::Morse,
        }
    }

    /// Printable form of the symbols.
    pub fn symbols(&self) -> String {
        match self {
            Encoded::Binary(bits) => bits.clone(),
            Encoded::Frequency(freqs) => freqs
                .iter()
                .map(|f| format!("{f:.0}Hz"))
                .collect::<Vec<_>>()
                .join(" "),
            Encoded::Morse(code) => code.clone(),
        }
    }
}

pub fn encode(message: &str, encoding: Encoding) -> Encoded {
    match encoding {
        Encoding::Binary => Encoded::Binary(to_binary(message)),
        Encoding::Frequency => Encoded::Frequency(to_frequencies(message)),
        Encoding::Morse => Encoded::Morse(to_morse(message)),
    }
}

/// Character codes as zero-padded binary, at least 8 digits each.
pub fn to_binary(message: &str) -> String {
    message.chars().map(|c| format!("{:08b}", c as u32)).collect()
}

/// `200 + code × 20` Hz per character.
pub fn to_frequencies(message: &str) -> Vec<f64> {
    message.chars().map(|c| 200.0 + c as u32 as f64 * 20.0).collect()
}

/// International morse for A–Z and 0–9, `/` for a space.
///
/// Letters are separated by single spaces. Characters without a code are
/// dropped.
pub fn to_morse(message: &str) -> String {
    message
        .chars()
        .filter_map(|c| morse_code(c.to_ascii_uppercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn morse_code(c: char) -> Option<&'static str> {
    let code = match c {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        ' ' => "/",
        _ => return None,
    };
    Some(code)
}

/// Samples drawn per character in the frequency preview.
const FREQUENCY_PREVIEW_SAMPLES: usize = 20;

/// A small waveform sketch of the encoded message, values in roughly [-1, 1].
///
/// - binary: each bit twice, +1 for a one and -1 for a zero
/// - frequency: a short sine per character whose pitch and amplitude grow
///   with the printable character code
/// - morse: one value per time unit, +1 while keyed and -1 while silent
pub fn preview(message: &str, encoding: Encoding) -> Vec<f64> {
    match encoding {
        Encoding::Binary => to_binary(message)
            .chars()
            .flat_map(|bit| {
                let level = if bit == '1' { 1.0 } else { -1.0 };
                [level, level]
            })
            .collect(),
        Encoding::Frequency => message
            .chars()
            .flat_map(|c| {
                let norm = (c as u32 as f64 - 32.0) / 95.0;
                (0..FREQUENCY_PREVIEW_SAMPLES).map(move |j| {
                    (j as f64 * norm * std::f64::consts::TAU).sin() * (norm + 0.2)
                })
            })
            .collect(),
        Encoding::Morse => {
            let mut units = Vec::new();
            for c in message.chars() {
                let code = morse_code(c.to_ascii_uppercase()).unwrap_or("");
                for symbol in code.chars() {
                    match symbol {
                        '.' => units.extend([1.0, 1.0, -1.0]),
                        '-' => units.extend([1.0, 1.0, 1.0, 1.0, 1.0, -1.0]),
                        _ => {}
                    }
                }
                units.extend([-1.0, -1.0, -1.0]);
            }
            units
        }
    }
}
