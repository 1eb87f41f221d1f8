//! Rendering tone plans to PCM and WAV.

use crate::transmit::plan::{Tone, TonePlan};
use crate::transmit::TransmitError;
use std::path::Path;

/// Starting gain of every tone.
pub const TONE_GAIN: f32 = 0.3;
/// Gain a tone decays to by its end.
pub const TONE_FLOOR: f32 = 0.01;

fn samples_for(duration: std::time::Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Append one tone with an exponential decay envelope.
fn push_tone(out: &mut Vec<f32>, tone: &Tone, sample_rate: u32) {
    let n = samples_for(tone.duration, sample_rate);
    if n == 0 {
        return;
    }
    let ratio = TONE_FLOOR / TONE_GAIN;
    let step = std::f64::consts::TAU * tone.frequency / sample_rate as f64;
    out.extend((0..n).map(|i| {
        let envelope = TONE_GAIN * ratio.powf(i as f32 / n as f32);
        (step * i as f64).sin() as f32 * envelope
    }));
}

/// Mono f32 samples for a whole plan.
pub fn render_pcm(plan: &TonePlan, sample_rate: u32) -> Vec<f32> {
    let total = samples_for(plan.total_duration(), sample_rate);
    let mut out = Vec::with_capacity(total);

    for step in &plan.steps {
        let start = out.len();
        if let Some(tone) = &step.tone {
            push_tone(&mut out, tone, sample_rate);
        }
        let slot = samples_for(step.advance, sample_rate);
        // Tones never outlast their slot; pad the rest with silence.
        out.truncate(start + slot);
        out.resize(start + slot, 0.0);
    }
    out
}

/// Write mono f32 samples as a 32-bit float WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), TransmitError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| TransmitError::Wav(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| TransmitError::Wav(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| TransmitError::Wav(e.to_string()))?;

    tracing::debug!(path = %path.display(), samples = samples.len(), "wrote transmission audio");
    Ok(())
}
