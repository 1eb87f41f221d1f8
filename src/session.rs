//! The scan controller and the session state it owns.
//!
//! Everything that changes during a session lives in one [`SessionState`]
//! owned by one [`ScanController`]. Front ends drive the controller with
//! explicit timestamps: `tick(now)` captures the baseline once the warm-up
//! delay has passed and then runs the deviation checks at the configured
//! interval.

use crate::activity::{
    format_clock, format_duration, ActivityLog, EntryKind, SessionStats, SharedSessionStats,
    StatsSnapshot, Toast, ToastCenter, ToastKind,
};
use crate::config::Config;
use crate::core::{Anomaly, AnomalyDetector, AnomalyId, AnomalyLog, Baseline, Detection};
use crate::interpret::{Interpretation, InterpretationService, InterpretationSource, SignalSummary};
use crate::sensor::{Reading, SensorArray, SensorError, SensorKind, SensorStatus};
use crate::transmit::{excerpt, Encoding, TransmitError, Transmission};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Scan controller errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    AlreadyScanning,
    NotScanning,
    /// The anomaly is unknown or was evicted from the log
    UnknownAnomaly(AnomalyId),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::AlreadyScanning => write!(f, "A scan is already running"),
            ScanError::NotScanning => write!(f, "No scan is running"),
            ScanError::UnknownAnomaly(id) => write!(f, "No anomaly {id} in the log"),
        }
    }
}

impl std::error::Error for ScanError {}

/// Timing of the scan in progress.
#[derive(Debug, Clone)]
struct ScanRun {
    started_at: DateTime<Utc>,
    baseline_due: DateTime<Utc>,
    baseline_attempted: bool,
    next_check: Option<DateTime<Utc>>,
}

impl ScanRun {
    fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }
}

/// All mutable state of one session.
pub struct SessionState {
    pub session_id: Uuid,
    pub baseline: Baseline,
    pub anomalies: AnomalyLog,
    pub activity: ActivityLog,
    pub toasts: ToastCenter,
    pub stats: SharedSessionStats,
    /// Latest interpretation per anomaly still in the log
    pub interpretations: HashMap<AnomalyId, Interpretation>,
    run: Option<ScanRun>,
}

impl SessionState {
    fn new(config: &Config) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            baseline: Baseline::new(),
            anomalies: AnomalyLog::new(config.detection.anomaly_capacity),
            activity: ActivityLog::new(config.detection.activity_capacity),
            toasts: ToastCenter::new(config.detection.toast_interval),
            stats: Arc::new(SessionStats::new()),
            interpretations: HashMap::new(),
            run: None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.run.is_some()
    }
}

/// One sensor line in a status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReport {
    pub kind: SensorKind,
    pub status: SensorStatus,
    /// Human-readable last value
    pub value: Option<String>,
    /// Normalised display level in [0, 1]
    pub level: Option<f64>,
}

/// Snapshot of the controller for front ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub session_id: Uuid,
    pub station: String,
    pub scanning: bool,
    pub scan_elapsed_secs: u64,
    pub baseline_captured: bool,
    pub capabilities: String,
    pub sensors: Vec<SensorReport>,
    pub anomaly_count: usize,
    pub stats: StatsSnapshot,
}

impl StatusReport {
    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Station: {}\n\
             Session: {}\n\
             {}\n\
             Scanning: {}{}\n\
             Baseline: {}\n\
             Anomalies in log: {}\n",
            self.station,
            self.session_id,
            self.capabilities,
            if self.scanning { "yes" } else { "no" },
            if self.scanning {
                format!(" ({})", format_duration(Duration::from_secs(self.scan_elapsed_secs)))
            } else {
                String::new()
            },
            if self.baseline_captured {
                "captured"
            } else {
                "pending"
            },
            self.anomaly_count,
        );
        out.push_str("Sensors:\n");
        for sensor in &self.sensors {
            out.push_str(&format!(
                "  {:<7} {:<11} {}\n",
                sensor.kind.label(),
                sensor.status.label(),
                sensor.value.as_deref().unwrap_or("-")
            ));
        }
        out
    }
}

/// Drives a scan session.
pub struct ScanController {
    config: Config,
    tz: Tz,
    station: String,
    sensors: SensorArray,
    detector: AnomalyDetector,
    state: SessionState,
}

impl ScanController {
    pub fn new(config: Config, sensors: SensorArray) -> Self {
        Self::new_at(config, sensors, Utc::now())
    }

    pub fn new_at(config: Config, sensors: SensorArray, now: DateTime<Utc>) -> Self {
        let tz = config.timezone();
        let station = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let detector = AnomalyDetector::new(config.detection.clone());
        let mut state = SessionState::new(&config);

        state.activity.push(
            EntryKind::System,
            format!(
                "CosmicLink v{} initialized. All systems nominal.",
                env!("CARGO_PKG_VERSION")
            ),
            now,
        );
        state.activity.push(
            EntryKind::System,
            "Sensor array configured. Awaiting scan command.",
            now,
        );
        tracing::info!(session = %state.session_id, station = %station, "session created");

        Self {
            config,
            tz,
            station,
            sensors,
            detector,
            state,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_scanning(&self) -> bool {
        self.state.is_scanning()
    }

    pub fn anomalies(&self) -> &AnomalyLog {
        &self.state.anomalies
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.state.activity
    }

    pub fn stats(&self) -> SharedSessionStats {
        Arc::clone(&self.state.stats)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Start a scan: reset the baseline and cooldowns and bring sensors up.
    ///
    /// Sensors that fail to start are reported and skipped; the scan runs
    /// with whatever is available.
    pub fn start_scan(&mut self, now: DateTime<Utc>) -> Result<(), ScanError> {
        if self.state.is_scanning() {
            return Err(ScanError::AlreadyScanning);
        }

        self.state.baseline.clear();
        self.detector.reset();
        self.state.stats.record_scan_started();

        self.log(EntryKind::System, "Initiating multi-spectrum scan sequence...", now);
        self.toast(ToastKind::Info, "Scan initiated - activating sensors", now);

        for (kind, result) in self.sensors.start_all() {
            match result {
                Ok(()) | Err(SensorError::AlreadyRunning(_)) => {
                    tracing::info!(sensor = %kind, "sensor online");
                    self.log(EntryKind::System, kind.online_message(), now);
                }
                Err(e) => {
                    tracing::warn!(sensor = %kind, "sensor unavailable: {e}");
                    self.log(EntryKind::Error, e.to_string(), now);
                }
            }
        }

        self.state.run = Some(ScanRun {
            started_at: now,
            baseline_due: now + chrono_duration(self.config.detection.baseline_delay),
            baseline_attempted: false,
            next_check: None,
        });
        tracing::info!(capabilities = %self.sensors.capabilities(), "scan started");
        Ok(())
    }

    /// Stop the scan and every sensor. Returns the scan duration.
    pub fn stop_scan(&mut self, now: DateTime<Utc>) -> Result<Duration, ScanError> {
        let run = self.state.run.take().ok_or(ScanError::NotScanning)?;
        self.sensors.stop_all();

        let elapsed = run.elapsed(now);
        self.state.stats.record_scan_time(elapsed);

        self.log(
            EntryKind::System,
            format!("Scan terminated. Duration: {}", format_duration(elapsed)),
            now,
        );
        self.toast(ToastKind::Info, "Scan complete", now);
        tracing::info!(elapsed_secs = elapsed.as_secs(), "scan stopped");
        Ok(elapsed)
    }

    /// Advance the scan to `now`. Returns the ids of anomalies flagged.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<AnomalyId> {
        let Some(run) = self.state.run.as_ref() else {
            return Vec::new();
        };

        if !run.baseline_attempted {
            if now < run.baseline_due {
                return Vec::new();
            }
            self.capture_baseline(now);
        }

        let due = self
            .state
            .run
            .as_ref()
            .and_then(|r| r.next_check)
            .map(|next| now >= next)
            .unwrap_or(true);
        if !due {
            return Vec::new();
        }
        if let Some(run) = self.state.run.as_mut() {
            run.next_check = Some(now + chrono_duration(self.config.detection.check_interval));
        }

        self.run_checks(now)
    }

    fn capture_baseline(&mut self, now: DateTime<Utc>) {
        let audio = match self.sensors.latest(SensorKind::Audio) {
            Some(Reading::Spectrum { bins }) => Some(bins),
            _ => None,
        };
        let magnetic = self
            .sensors
            .latest(SensorKind::Magnetometer)
            .and_then(|r| r.magnitude());

        self.state.baseline.capture(audio.as_ref(), magnetic, now);
        if let Some(run) = self.state.run.as_mut() {
            run.baseline_attempted = true;
        }

        if audio.is_some() || magnetic.is_some() {
            self.log(
                EntryKind::System,
                "Baseline calibration complete. Monitoring for anomalies.",
                now,
            );
        }
        if audio.is_none() {
            tracing::warn!("no audio spectrum at baseline time; audio checks disabled this scan");
            self.log(
                EntryKind::System,
                "Audio baseline unavailable; audio checks skipped.",
                now,
            );
        }
        if magnetic.is_none() {
            tracing::warn!(
                "no magnetometer reading at baseline time; EM checks disabled this scan"
            );
            self.log(
                EntryKind::System,
                "Magnetometer baseline unavailable; EM checks skipped.",
                now,
            );
        }
        tracing::info!(
            audio_bins = audio.as_ref().map(|a| a.len()),
            magnetic,
            "baseline captured"
        );
    }

    fn run_checks(&mut self, now: DateTime<Utc>) -> Vec<AnomalyId> {
        let mut detections: Vec<Detection> = Vec::new();

        if let Some(base) = self.state.baseline.audio() {
            if let Some(Reading::Spectrum { bins }) = self.sensors.latest(SensorKind::Audio) {
                detections.extend(self.detector.check_audio(&bins, base, now));
            }
        }

        if let Some(base) = self.state.baseline.magnetic() {
            if let Some(current) = self
                .sensors
                .latest(SensorKind::Magnetometer)
                .and_then(|r| r.magnitude())
            {
                detections.extend(self.detector.check_magnetic(current, base, now));
            }
        }

        // Every queued frame is compared with its predecessor; the cosmic
        // cooldown keeps a burst to one flag.
        for reading in self.sensors.drain(SensorKind::Camera) {
            if let Reading::Frame(frame) = reading {
                detections.extend(self.detector.check_frame(&frame, now));
            }
        }

        detections
            .into_iter()
            .map(|d| self.register(d, now))
            .collect()
    }

    /// Record a detection with all of its side effects.
    fn register(&mut self, detection: Detection, now: DateTime<Utc>) -> AnomalyId {
        let anomaly = self.state.anomalies.record(detection);
        let (id, kind, deviation, at) =
            (anomaly.id, anomaly.kind, anomaly.deviation, anomaly.timestamp);

        // Drop interpretations of anomalies that fell out of the log.
        let anomalies = &self.state.anomalies;
        self.state
            .interpretations
            .retain(|kept, _| anomalies.get(*kept).is_some());

        self.state.stats.record_anomaly();
        tracing::info!(%id, %kind, deviation, "anomaly flagged");
        self.log(
            EntryKind::Signal,
            format!(
                "Anomaly detected: {kind} signal deviation at {}",
                format_clock(at, self.tz)
            ),
            now,
        );
        self.toast(
            ToastKind::Anomaly,
            format!("Potential {kind} signal detected!"),
            now,
        );
        id
    }

    pub fn anomaly(&self, id: AnomalyId) -> Option<&Anomaly> {
        self.state.anomalies.get(id)
    }

    pub fn signal_summary(&self, id: AnomalyId) -> Option<SignalSummary> {
        self.anomaly(id).map(SignalSummary::from_anomaly)
    }

    /// Log the start of an interpretation and return what to interpret.
    pub fn begin_interpretation(
        &mut self,
        id: AnomalyId,
        now: DateTime<Utc>,
    ) -> Result<SignalSummary, ScanError> {
        let summary = self.signal_summary(id).ok_or(ScanError::UnknownAnomaly(id))?;
        self.log(
            EntryKind::System,
            format!("Initiating AI interpretation of signal {id}..."),
            now,
        );
        Ok(summary)
    }

    /// Store a finished interpretation and mark its anomaly analyzed.
    ///
    /// Returns false when the anomaly was evicted while interpreting; the
    /// result is then discarded.
    pub fn record_interpretation(
        &mut self,
        interpretation: Interpretation,
        now: DateTime<Utc>,
    ) -> bool {
        let id = interpretation.anomaly;
        if !self.state.anomalies.mark_analyzed(id) {
            tracing::debug!(%id, "interpretation arrived after eviction");
            return false;
        }
        self.state.stats.record_interpretation();

        match interpretation.source {
            InterpretationSource::Remote => {
                self.log(
                    EntryKind::Signal,
                    format!("AI interpretation complete for {id}"),
                    now,
                );
                self.toast(ToastKind::Success, "Signal interpretation complete", now);
            }
            InterpretationSource::Local => {
                self.log(
                    EntryKind::System,
                    "Using local analysis algorithms (API unavailable)",
                    now,
                );
                self.log(EntryKind::Signal, format!("Interpretation complete for {id}"), now);
            }
        }
        self.state.interpretations.insert(id, interpretation);
        true
    }

    /// Interpret an anomaly synchronously with `service`.
    pub fn interpret_anomaly(
        &mut self,
        id: AnomalyId,
        service: &InterpretationService,
        now: DateTime<Utc>,
    ) -> Result<Interpretation, ScanError> {
        let summary = self.begin_interpretation(id, now)?;
        let interpretation = service.interpret(&summary);
        self.record_interpretation(interpretation.clone(), now);
        Ok(interpretation)
    }

    pub fn interpretation(&self, id: AnomalyId) -> Option<&Interpretation> {
        self.state.interpretations.get(&id)
    }

    /// Validate and schedule a transmission.
    ///
    /// An empty message is logged as an error and nothing is encoded.
    pub fn begin_transmission(
        &mut self,
        message: &str,
        encoding: Encoding,
        now: DateTime<Utc>,
    ) -> Result<Transmission, TransmitError> {
        match Transmission::prepare(message, encoding) {
            Ok(tx) => {
                self.log(
                    EntryKind::Transmit,
                    format!("Initiating transmission: \"{}\"", excerpt(message)),
                    now,
                );
                self.toast(ToastKind::Info, "Transmission in progress...", now);
                tracing::info!(
                    %encoding,
                    duration_ms = tx.duration().as_millis() as u64,
                    "transmission started"
                );
                Ok(tx)
            }
            Err(e) => {
                self.fail_transmission(&e, now);
                Err(e)
            }
        }
    }

    pub fn complete_transmission(&mut self, now: DateTime<Utc>) {
        self.state.stats.record_transmit();
        self.log(EntryKind::Transmit, "Transmission complete", now);
        self.toast(ToastKind::Success, "Message transmitted successfully!", now);
    }

    pub fn fail_transmission(&mut self, error: &TransmitError, now: DateTime<Utc>) {
        tracing::warn!("transmission failed: {error}");
        match error {
            TransmitError::EmptyMessage => {
                self.log(EntryKind::Error, format!("Transmission failed: {error}"), now);
                self.toast(ToastKind::Error, error.to_string(), now);
            }
            _ => {
                self.log(EntryKind::Error, format!("Transmission failed: {error}"), now);
                self.toast(ToastKind::Error, "Transmission failed", now);
            }
        }
    }

    pub fn clear_log(&mut self, now: DateTime<Utc>) {
        self.state.activity.clear(now);
    }

    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        self.state.toasts.drain()
    }

    pub fn scan_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.state.run.as_ref().map(|r| r.elapsed(now))
    }

    pub fn status(&mut self, now: DateTime<Utc>) -> StatusReport {
        let statuses = self.sensors.statuses();
        let sensors = statuses
            .into_iter()
            .map(|(kind, status)| {
                let reading = self.sensors.latest(kind);
                SensorReport {
                    kind,
                    status,
                    value: reading.as_ref().map(|r| r.display_value()),
                    level: reading.as_ref().map(|r| r.level()),
                }
            })
            .collect();
        let running = self.scan_elapsed(now);

        StatusReport {
            session_id: self.state.session_id,
            station: self.station.clone(),
            scanning: running.is_some(),
            scan_elapsed_secs: running.map(|d| d.as_secs()).unwrap_or(0),
            baseline_captured: self.state.baseline.is_captured(),
            capabilities: self.sensors.capabilities(),
            sensors,
            anomaly_count: self.state.anomalies.len(),
            stats: self.state.stats.snapshot(running),
        }
    }

    fn log(&mut self, kind: EntryKind, message: impl Into<String>, now: DateTime<Utc>) {
        self.state.activity.push(kind, message, now);
    }

    fn toast(&mut self, kind: ToastKind, message: impl Into<String>, now: DateTime<Utc>) {
        self.state.toasts.push(kind, message, now);
    }
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}
