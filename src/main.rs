//! CosmicLink CLI
//!
//! Ambient sensor signal array.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cosmiclink::{
    activity::{format_duration, ToastKind},
    config::{Config, SensorConfig},
    interpret::{InterpretationService, SignalSummary},
    sensor::{SensorArray, SensorFeeds},
    transmit::{write_wav, Encoding, Transmission},
    Anomaly, AnomalyId, ReplayScript, ScanController, DISCLAIMER, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Step of the scan loop.
const TICK: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "cosmiclink")]
#[command(version = VERSION)]
#[command(about = "Ambient sensor signal array", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan over live feeds or a recorded replay
    Scan {
        /// Sensors to bring online (audio, magnetometer, motion, light, camera, or all)
        #[arg(long)]
        sensors: Option<String>,

        /// JSON Lines file of recorded readings to play back
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Play the replay at wall-clock speed instead of as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Interpret every flagged anomaly when the scan ends
        #[arg(long)]
        interpret: bool,

        /// Write the anomaly log to the export directory when the scan ends
        #[arg(long)]
        export: bool,
    },

    /// Encode a message as a tone sequence
    Transmit {
        /// Message to send
        message: String,

        /// Encoding (binary, frequency or morse)
        #[arg(long, short, default_value = "binary")]
        encoding: Encoding,

        /// Render the tones to a WAV file
        #[arg(long)]
        wav: Option<PathBuf>,
    },

    /// Interpret anomalies from an exported anomaly log
    Interpret {
        /// Exported anomaly log (JSON)
        file: PathBuf,

        /// Only interpret this signal (e.g. SIG-000003)
        #[arg(long)]
        id: Option<AnomalyId>,
    },

    /// Show sensor array status
    Status,

    /// Show configuration
    Config,

    /// Display the disclaimer
    Disclaimer,

    /// Run the HTTP front end (requires server feature)
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8787")]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cosmiclink=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            sensors,
            replay,
            duration,
            realtime,
            interpret,
            export,
        } => cmd_scan(ScanOptions {
            sensors,
            replay,
            duration: duration.map(Duration::from_secs),
            realtime,
            interpret,
            export,
        }),
        Commands::Transmit {
            message,
            encoding,
            wav,
        } => cmd_transmit(&message, encoding, wav.as_deref()),
        Commands::Interpret { file, id } => cmd_interpret(&file, id),
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::Config => {
            cmd_config();
            Ok(())
        }
        Commands::Disclaimer => {
            println!("{DISCLAIMER}");
            Ok(())
        }
        Commands::Serve { port } => cmd_serve(port),
    }
}

struct ScanOptions {
    sensors: Option<String>,
    replay: Option<PathBuf>,
    duration: Option<Duration>,
    realtime: bool,
    interpret: bool,
    export: bool,
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    })
}

fn cmd_scan(options: ScanOptions) -> anyhow::Result<()> {
    let mut config = load_config();
    if let Some(sensors) = &options.sensors {
        config.sensors = SensorConfig::from_csv(sensors);
    }
    if !config.sensors.any_enabled() {
        anyhow::bail!("At least one sensor must be enabled");
    }

    let mut script = match &options.replay {
        Some(path) => Some(ReplayScript::load(path)?),
        None => None,
    };
    let simulated = script.is_some() && !options.realtime;
    let limit = options
        .duration
        .or_else(|| script.as_ref().map(|s| s.duration() + Duration::from_secs(1)));

    println!("CosmicLink v{VERSION}");
    println!();

    let (array, feeds) = SensorArray::channel_backed(&config.sensors);
    let tz = config.timezone();
    let mut controller = ScanController::new(config.clone(), array);

    match &script {
        Some(s) => println!("Replaying {} readings ({})", s.len(), format_duration(s.duration())),
        None => {
            println!("Live feeds: readings arrive only from an attached platform adapter.");
            println!("Use --replay to play back a recording, or `cosmiclink serve`.");
        }
    }
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running));

    let started = Utc::now();
    let wall_start = Instant::now();
    controller.start_scan(started)?;
    println!("{}", controller.status(started).capabilities);

    let mut elapsed = Duration::ZERO;
    while running.load(Ordering::SeqCst) {
        if limit.map(|l| elapsed >= l).unwrap_or(false) {
            break;
        }
        if let Some(script) = script.as_mut() {
            feed(&feeds, script.due(elapsed));
        }

        let now = at(started, elapsed);
        for id in controller.tick(now) {
            if let Some(anomaly) = controller.anomaly(id) {
                println!("{}", describe(anomaly, tz));
            }
        }
        for toast in controller.drain_toasts() {
            if toast.kind != ToastKind::Anomaly {
                println!("  ({})", toast.message);
            }
        }

        if simulated {
            elapsed += TICK;
        } else {
            thread::sleep(TICK);
            elapsed = wall_start.elapsed();
        }
    }

    let stopped = at(started, elapsed);
    let scan_time = controller.stop_scan(stopped)?;

    if options.interpret {
        let service = interpretation_service(&config);
        let ids: Vec<AnomalyId> = controller.anomalies().iter().map(|a| a.id).collect();
        for id in ids {
            let interpretation = controller.interpret_anomaly(id, &service, Utc::now())?;
            println!();
            println!("[{}] {}", id, interpretation.heading);
            println!("{}", interpretation.text);
        }
    }

    println!();
    println!("Activity log:");
    let entries = controller.activity().to_vec();
    for entry in entries.iter().rev() {
        println!("  {}", entry.render(tz));
    }

    if options.export {
        export_anomalies(&config, &controller.anomalies().to_vec())?;
    }

    println!();
    println!("Scan time: {}", format_duration(scan_time));
    println!("{}", controller.stats().summary(None));
    Ok(())
}

fn at(start: DateTime<Utc>, elapsed: Duration) -> DateTime<Utc> {
    start + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
}

fn feed(feeds: &SensorFeeds, readings: Vec<cosmiclink::Reading>) {
    for reading in readings {
        let kind = reading.kind();
        match feeds.get(&kind) {
            Some(feed) => {
                if let Err(e) = feed.push(reading) {
                    tracing::warn!("Replay reading dropped: {}", e);
                }
            }
            None => tracing::debug!("Replay reading for disabled {} sensor skipped", kind),
        }
    }
}

fn describe(anomaly: &Anomaly, tz: chrono_tz::Tz) -> String {
    let deviation = anomaly
        .deviation
        .map(|d| format!("{d:.2}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "[{}] {} {:<10} deviation {:>7}  peaks {:>2}{}",
        cosmiclink::activity::format_clock(anomaly.timestamp, tz),
        anomaly.id,
        anomaly.kind.label(),
        deviation,
        anomaly.peak_count(),
        if anomaly.has_pattern { "  PATTERN" } else { "" }
    )
}

fn export_anomalies(config: &Config, anomalies: &[Anomaly]) -> anyhow::Result<()> {
    if anomalies.is_empty() {
        println!("No anomalies to export.");
        return Ok(());
    }
    config.ensure_directories()?;
    let path = config.export_path.join(format!(
        "anomalies_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_string_pretty(anomalies)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("Exported {} anomalies to {:?}", anomalies.len(), path);
    Ok(())
}

#[cfg(feature = "remote")]
fn interpretation_service(config: &Config) -> InterpretationService {
    match cosmiclink::BlockingMessagesClient::new(config.interpreter.clone()) {
        Ok(client) => InterpretationService::with_primary(Box::new(client)),
        Err(e) => {
            tracing::info!("Remote interpreter unavailable: {}", e);
            InterpretationService::local()
        }
    }
}

#[cfg(not(feature = "remote"))]
fn interpretation_service(_config: &Config) -> InterpretationService {
    InterpretationService::local()
}

fn cmd_transmit(message: &str, encoding: Encoding, wav: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config();
    let tx = Transmission::prepare(message, encoding)?;

    println!("Encoding: {}", tx.encoding());
    println!("Symbols:  {}", tx.encoded.symbols());
    println!(
        "Tones:    {} over {:.2}s",
        tx.plan.tone_count(),
        tx.duration().as_secs_f64()
    );

    if let Some(path) = wav {
        let samples = tx.render(config.transmit.sample_rate);
        write_wav(path, &samples, config.transmit.sample_rate)?;
        println!("Wrote {} samples to {:?}", samples.len(), path);
    }
    Ok(())
}

fn cmd_interpret(file: &Path, id: Option<AnomalyId>) -> anyhow::Result<()> {
    let config = load_config();
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let anomalies: Vec<Anomaly> = serde_json::from_str(&content)
        .with_context(|| format!("parsing anomaly log {}", file.display()))?;

    let selected: Vec<&Anomaly> = anomalies
        .iter()
        .filter(|a| id.map(|wanted| a.id == wanted).unwrap_or(true))
        .collect();
    if selected.is_empty() {
        anyhow::bail!("No matching anomalies in {}", file.display());
    }

    let service = interpretation_service(&config);
    for anomaly in selected {
        let interpretation = service.interpret(&SignalSummary::from_anomaly(anomaly));
        println!("[{}] {} - {}", anomaly.id, anomaly.kind, interpretation.heading);
        println!("{}", interpretation.text);
        println!();
    }
    Ok(())
}

fn cmd_status() {
    let config = load_config();
    let (array, _feeds) = SensorArray::channel_backed(&config.sensors);
    let mut controller = ScanController::new(config, array);

    println!("CosmicLink Status");
    println!("=================");
    println!();
    print!("{}", controller.status(Utc::now()).summary());
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

#[cfg(feature = "server")]
fn cmd_serve(port: u16) -> anyhow::Result<()> {
    use cosmiclink::server::{run, ServerConfig};

    let config = load_config();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (addr, shutdown_tx) = run(ServerConfig::new(port, config)).await?;
        println!("CosmicLink v{VERSION} serving on http://{addr}");
        println!("Press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(());
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: u16) -> anyhow::Result<()> {
    anyhow::bail!("serve requires the server feature (cargo build --features server)")
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
