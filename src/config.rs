//! Configuration for the CosmicLink signal array.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the signal array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which sensors to bring online when a scan starts
    pub sensors: SensorConfig,

    /// Thresholds, delays and cooldowns for anomaly flagging
    pub detection: DetectionConfig,

    /// Text-generation collaborator settings
    pub interpreter: InterpreterConfig,

    /// Transmit rendering settings
    pub transmit: TransmitConfig,

    /// IANA timezone used when rendering log timestamps
    pub display_timezone: String,

    /// Path for exported anomaly logs and rendered transmissions
    pub export_path: PathBuf,

    /// Path for runtime data
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cosmiclink");

        Self {
            sensors: SensorConfig::default(),
            detection: DetectionConfig::default(),
            interpreter: InterpreterConfig::default(),
            transmit: TransmitConfig::default(),
            display_timezone: "UTC".to_string(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cosmiclink")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Resolve the display timezone, falling back to UTC on an unknown name.
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.display_timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Unknown display timezone '{}', using UTC",
                self.display_timezone
            );
            chrono_tz::Tz::UTC
        })
    }
}

/// Configuration for which sensors to bring online.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub audio: bool,
    pub magnetometer: bool,
    pub motion: bool,
    pub light: bool,
    pub camera: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            audio: true,
            magnetometer: true,
            motion: true,
            light: true,
            camera: false,
        }
    }
}

impl SensorConfig {
    /// Parse sensor selection from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sensors: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let has = |names: &[&str]| {
            sensors
                .iter()
                .any(|s| s == "all" || names.contains(&s.as_str()))
        };

        Self {
            audio: has(&["audio", "mic"]),
            magnetometer: has(&["magnetometer", "mag", "em"]),
            motion: has(&["motion", "accelerometer"]),
            light: has(&["light"]),
            camera: has(&["camera", "cosmic"]),
        }
    }

    /// Check if at least one sensor is enabled.
    pub fn any_enabled(&self) -> bool {
        self.audio || self.magnetometer || self.motion || self.light || self.camera
    }
}

/// Thresholds and timings for the anomaly heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Delay between scan start and baseline capture
    #[serde(with = "duration_ms")]
    pub baseline_delay: Duration,
    /// Period of the deviation check
    #[serde(with = "duration_ms")]
    pub check_interval: Duration,

    /// Minimum bin value for a peak
    pub peak_threshold: u8,
    /// Spacing variance must stay below this fraction of the mean spacing
    pub regularity_factor: f64,
    /// Mean per-bin deviation above which audio is flagged
    pub audio_deviation_threshold: f64,
    /// Fraction of bins (from the top) treated as the ultrasonic band
    pub ultrasonic_band_fraction: f64,
    /// Mean deviation within the ultrasonic band required for ULTRASONIC
    pub ultrasonic_deviation_threshold: f64,
    /// Magnetometer deviation (μT) above which EM is flagged
    pub em_deviation_threshold: f64,

    /// Brightness rise that counts a pixel as a hit
    pub cosmic_brightness_delta: u8,
    /// Hits needed in one frame comparison to flag COSMIC
    pub cosmic_cluster_threshold: u32,
    /// Hits above which a COSMIC event is marked as patterned
    pub cosmic_pattern_threshold: u32,

    #[serde(with = "duration_ms")]
    pub audio_cooldown: Duration,
    #[serde(with = "duration_ms")]
    pub ultrasonic_cooldown: Duration,
    #[serde(with = "duration_ms")]
    pub em_cooldown: Duration,
    #[serde(with = "duration_ms")]
    pub cosmic_cooldown: Duration,
    /// Minimum time between two anomaly toasts
    #[serde(with = "duration_ms")]
    pub toast_interval: Duration,

    /// Maximum anomalies retained in the session log
    pub anomaly_capacity: usize,
    /// Maximum entries retained in the activity log
    pub activity_capacity: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            baseline_delay: Duration::from_millis(3000),
            check_interval: Duration::from_millis(500),
            peak_threshold: 100,
            regularity_factor: 0.3,
            audio_deviation_threshold: 30.0,
            ultrasonic_band_fraction: 0.2,
            ultrasonic_deviation_threshold: 60.0,
            em_deviation_threshold: 5.0,
            cosmic_brightness_delta: 50,
            cosmic_cluster_threshold: 3,
            cosmic_pattern_threshold: 12,
            audio_cooldown: Duration::from_millis(2000),
            ultrasonic_cooldown: Duration::from_millis(2000),
            em_cooldown: Duration::from_millis(2000),
            cosmic_cooldown: Duration::from_millis(5000),
            toast_interval: Duration::from_millis(3000),
            anomaly_capacity: 100,
            activity_capacity: 100,
        }
    }
}

/// Settings for the remote text-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Messages endpoint
    pub endpoint: String,
    /// Model identifier sent in the request body
    pub model: String,
    pub max_tokens: u32,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 300,
            api_key_env: "COSMICLINK_API_KEY".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl InterpreterConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Settings for rendering transmissions to audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmitConfig {
    pub sample_rate: u32,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self { sample_rate: 44_100 }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_config_parsing() {
        let config = SensorConfig::from_csv("audio,mag");
        assert!(config.audio);
        assert!(config.magnetometer);
        assert!(!config.camera);

        let config = SensorConfig::from_csv("camera");
        assert!(config.camera);
        assert!(!config.audio);

        let config = SensorConfig::from_csv("all");
        assert!(config.audio && config.magnetometer && config.motion);
        assert!(config.light && config.camera);

        assert!(!SensorConfig::from_csv("sonar").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detection.baseline_delay, Duration::from_millis(3000));
        assert_eq!(config.detection.check_interval, Duration::from_millis(500));
        assert_eq!(config.detection.anomaly_capacity, 100);
        assert!(config.sensors.audio);
        assert!(!config.sensors.camera);
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let json = serde_json::to_value(DetectionConfig::default()).unwrap();
        assert_eq!(json["cosmic_cooldown"], 5000);
        assert_eq!(json["check_interval"], 500);
    }

    #[test]
    fn test_unknown_timezone_falls_back() {
        let mut config = Config::default();
        config.display_timezone = "Mars/Olympus_Mons".to_string();
        assert_eq!(config.timezone(), chrono_tz::Tz::UTC);

        config.display_timezone = "Europe/Berlin".to_string();
        assert_eq!(config.timezone(), chrono_tz::Tz::Europe__Berlin);
    }
}
