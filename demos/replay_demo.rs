//! Demonstration of a CosmicLink scan over synthetic readings.
//!
//! This example shows how to:
//! 1. Build a replay script of sensor readings
//! 2. Drive a scan with it on a simulated clock
//! 3. Interpret flagged anomalies with the local analyser
//! 4. Encode a reply and render it to a WAV file
//!
//! Run with: cargo run --example replay_demo

use std::time::Duration;

use chrono::Utc;
use cosmiclink::{
    activity::format_clock,
    config::Config,
    interpret::InterpretationService,
    sensor::{ReplayRecord, SensorArray},
    transmit::{write_wav, Encoding},
    Reading, ReplayScript, ScanController, SpectrumSample, Vector3, DISCLAIMER,
};

const STEP: Duration = Duration::from_millis(50);

fn quiet_spectrum() -> Reading {
    Reading::Spectrum {
        bins: SpectrumSample::new((0..2048).map(|i| (20 + i % 7) as u8).collect()),
    }
}

/// Evenly spaced loud peaks over the quiet floor.
fn harmonic_spectrum() -> Reading {
    let mut bins: Vec<u8> = (0..2048).map(|i| (20 + i % 7) as u8).collect();
    for k in 1..=6 {
        bins[k * 120] = 230;
    }
    Reading::Spectrum {
        bins: SpectrumSample::new(bins),
    }
}

fn script() -> ReplayScript {
    let mut records = Vec::new();
    for ms in (0..12_000).step_by(250) {
        let reading = if (6_000..7_000).contains(&ms) {
            harmonic_spectrum()
        } else {
            quiet_spectrum()
        };
        records.push(ReplayRecord {
            offset_ms: ms,
            reading,
        });
    }
    for ms in (0..12_000).step_by(500) {
        // A slow drift that jumps once a magnet comes near.
        let field = if ms >= 9_000 { 61.0 } else { 48.0 + ms as f64 / 4_000.0 };
        records.push(ReplayRecord {
            offset_ms: ms,
            reading: Reading::Magnetometer(Vector3::new(0.0, 0.0, field)),
        });
    }
    ReplayScript::new(records)
}

fn main() {
    println!("CosmicLink - Replay Demo");
    println!("========================");
    println!("{DISCLAIMER}");

    let config = Config::default();
    let tz = config.timezone();
    let (array, feeds) = SensorArray::channel_backed(&config.sensors);
    let mut controller = ScanController::new(config.clone(), array);
    let mut script = script();

    let start = Utc::now();
    if let Err(e) = controller.start_scan(start) {
        eprintln!("Could not start scan: {e}");
        return;
    }

    let mut elapsed = Duration::ZERO;
    while !script.is_finished() {
        for reading in script.due(elapsed) {
            if let Some(feed) = feeds.get(&reading.kind()) {
                let _ = feed.push(reading);
            }
        }
        let now = start + chrono::Duration::milliseconds(elapsed.as_millis() as i64);
        for id in controller.tick(now) {
            if let Some(anomaly) = controller.anomaly(id) {
                println!(
                    "[{}] {} {} (pattern: {})",
                    format_clock(anomaly.timestamp, tz),
                    id,
                    anomaly.kind,
                    anomaly.has_pattern
                );
            }
        }
        elapsed += STEP;
    }

    let stop = start + chrono::Duration::milliseconds(elapsed.as_millis() as i64);
    let _ = controller.stop_scan(stop);

    println!();
    let service = InterpretationService::local();
    let ids: Vec<_> = controller.anomalies().iter().map(|a| a.id).collect();
    for id in ids {
        if let Ok(interpretation) = controller.interpret_anomaly(id, &service, Utc::now()) {
            println!("{} - {}", id, interpretation.heading);
            println!("  {}", interpretation.text);
        }
    }

    println!();
    match controller.begin_transmission("We hear you", Encoding::Morse, Utc::now()) {
        Ok(tx) => {
            println!("Reply: {}", tx.encoded.symbols());
            let path = std::env::temp_dir().join("cosmiclink_reply.wav");
            let samples = tx.render(config.transmit.sample_rate);
            match write_wav(&path, &samples, config.transmit.sample_rate) {
                Ok(()) => println!(
                    "Rendered {:.1}s of tones to {:?}",
                    tx.duration().as_secs_f64(),
                    path
                ),
                Err(e) => eprintln!("{e}"),
            }
            controller.complete_transmission(Utc::now());
        }
        Err(e) => eprintln!("{e}"),
    }

    println!();
    println!("{}", controller.stats().summary(None));
}
