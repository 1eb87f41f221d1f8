//! CosmicLink - an ambient sensor signal array.
//!
//! This library samples whatever sensors a device exposes (microphone
//! spectrum, magnetometer, motion, light, camera), captures a baseline, and
//! flags heuristic "anomalies" when readings drift from it. Flagged events
//! can be given a flavor-text interpretation, and text messages can be
//! "transmitted" as tone sequences.
//!
//! # What this is not
//!
//! - **No science**: anomalies are simple threshold heuristics, not detections
//! - **No storage**: the session lives in memory; exports are opt-in
//! - **No capture**: sensor data never leaves the device unless you run the
//!   remote interpreter, which receives only a numeric summary
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         CosmicLink                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Sensors   │──▶│  Baseline   │──▶│  Detector   │       │
//! │  │  (sources)  │   │ (3s delay)  │   │ (cooldowns) │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Activity   │   │  Transmit   │   │  Interpret  │       │
//! │  │    Log      │   │   (tones)   │   │ (flavor)    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cosmiclink::{Config, Reading, ScanController, SensorArray, Vector3};
//! use chrono::Utc;
//!
//! let config = Config::default();
//! let (array, feeds) = SensorArray::channel_backed(&config.sensors);
//! let mut controller = ScanController::new(config, array);
//!
//! controller.start_scan(Utc::now()).expect("scan already running");
//! if let Some(feed) = feeds.get(&cosmiclink::SensorKind::Magnetometer) {
//!     let _ = feed.push(Reading::Magnetometer(Vector3::new(30.0, 0.0, 0.0)));
//! }
//! let flagged = controller.tick(Utc::now());
//! ```

pub mod activity;
pub mod config;
pub mod core;
pub mod interpret;
pub mod sensor;
pub mod session;
pub mod transmit;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use activity::{ActivityEntry, ActivityLog, EntryKind, SessionStats, StatsSnapshot};
pub use config::{Config, DetectionConfig, InterpreterConfig, SensorConfig};
pub use core::{Anomaly, AnomalyDetector, AnomalyId, AnomalyKind, AnomalyLog};
pub use interpret::{Interpretation, InterpretationService, Interpreter, SignalSummary};
pub use sensor::{
    Reading, ReplayScript, SensorArray, SensorError, SensorKind, SensorSource, SpectrumSample,
    Vector3, VideoFrame,
};
pub use session::{ScanController, ScanError, StatusReport};
pub use transmit::{Encoding, Transmission, TransmitError};

// Remote interpreter re-exports (when enabled)
#[cfg(feature = "remote")]
pub use interpret::{BlockingMessagesClient, MessagesClient};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Disclaimer shown before the first scan.
pub const DISCLAIMER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                   COSMICLINK - READ BEFORE SCANNING              ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  CosmicLink is an entertainment and exploration tool.            ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Compares live sensor readings against a short baseline      ║
║    • Flags deviations with simple threshold heuristics           ║
║    • Encodes your messages as audible tone sequences             ║
║                                                                  ║
║  ✗ WHAT IT DOES NOT DO:                                          ║
║    • Detect extraterrestrial signals of any kind                 ║
║    • Send anything beyond your own speaker                       ║
║    • Record or upload raw audio or video                         ║
║                                                                  ║
║  "Anomalies" are ordinary noise, interference and movement.      ║
║  Interpretations are generated flavor text, not analysis.        ║
║                                                                  ║
║  You can review the session at any time with:                    ║
║    cosmiclink status                                             ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
