//! Reading types pushed by sensor adapters.
//!
//! Adapters translate platform callbacks into these values; the core only
//! ever sees the last known reading per sensor.

use serde::{Deserialize, Serialize};

/// The sensors a scan can draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Audio,
    Magnetometer,
    Motion,
    Light,
    Camera,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Audio,
        SensorKind::Magnetometer,
        SensorKind::Motion,
        SensorKind::Light,
        SensorKind::Camera,
    ];

    /// Short label used in capability lines and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Audio => "AUDIO",
            SensorKind::Magnetometer => "MAG",
            SensorKind::Motion => "MOTION",
            SensorKind::Light => "LIGHT",
            SensorKind::Camera => "CAMERA",
        }
    }

    /// Message logged when the sensor comes online.
    pub fn online_message(&self) -> &'static str {
        match self {
            SensorKind::Audio => "Audio spectrum analyzer active.",
            SensorKind::Magnetometer => "Magnetometer online. Monitoring EM field fluctuations.",
            SensorKind::Motion => "Accelerometer online. Monitoring vibration patterns.",
            SensorKind::Light => "Ambient light sensor online.",
            SensorKind::Camera => "Camera online. Watching for cosmic ray strikes.",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of a sensor within a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Inactive,
    Active,
    /// Denied, unsupported or failed at acquisition
    Unavailable,
}

impl SensorStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SensorStatus::Inactive => "INACTIVE",
            SensorStatus::Active => "ACTIVE",
            SensorStatus::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Byte magnitudes, one per frequency bin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpectrumSample(Vec<u8>);

impl SpectrumSample {
    pub fn new(bins: Vec<u8>) -> Self {
        Self(bins)
    }

    /// A sample of `len` bins, all zero.
    pub fn silent(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn bins(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean bin magnitude.
    pub fn mean_level(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.iter().map(|&b| b as f64).sum::<f64>() / self.0.len() as f64
    }
}

impl From<Vec<u8>> for SpectrumSample {
    fn from(bins: Vec<u8>) -> Self {
        Self(bins)
    }
}

/// A three-axis vector reading (magnetometer in μT, accelerometer in m/s²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean magnitude.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// An RGBA video frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes, four per pixel
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }

    /// A frame where every pixel has the same grey level.
    pub fn uniform(width: u32, height: u32, level: u8) -> Self {
        let pixels = (width * height) as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[level, level, level, 255]);
        }
        Self::new(width, height, rgba)
    }

    pub fn pixel_count(&self) -> usize {
        self.rgba.len() / 4
    }

    /// Per-pixel brightness as the mean of the colour channels.
    pub fn brightness(&self) -> impl Iterator<Item = u8> + '_ {
        self.rgba
            .chunks_exact(4)
            .map(|px| ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8)
    }
}

/// A single pushed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    Spectrum { bins: SpectrumSample },
    Magnetometer(Vector3),
    Motion(Vector3),
    Light { lux: f64 },
    Frame(VideoFrame),
}

impl Reading {
    /// The sensor this reading belongs to.
    pub fn kind(&self) -> SensorKind {
        match self {
            Reading::Spectrum { .. } => SensorKind::Audio,
            Reading::Magnetometer(_) => SensorKind::Magnetometer,
            Reading::Motion(_) => SensorKind::Motion,
            Reading::Light { .. } => SensorKind::Light,
            Reading::Frame(_) => SensorKind::Camera,
        }
    }

    /// Scalar magnitude for scalar and vector sensors.
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            Reading::Magnetometer(v) | Reading::Motion(v) => Some(v.magnitude()),
            Reading::Light { lux } => Some(*lux),
            Reading::Spectrum { .. } | Reading::Frame(_) => None,
        }
    }

    /// Display level in `0.0..=1.0`.
    pub fn level(&self) -> f64 {
        let level = match self {
            Reading::Spectrum { bins } => bins.mean_level() / 255.0,
            Reading::Magnetometer(v) => v.magnitude() / 100.0,
            Reading::Motion(v) => v.magnitude() / 20.0,
            Reading::Light { lux } => lux / 1000.0,
            Reading::Frame(frame) => {
                let count = frame.pixel_count().max(1) as f64;
                frame.brightness().map(|b| b as f64).sum::<f64>() / count / 255.0
            }
        };
        level.clamp(0.0, 1.0)
    }

    /// Human readable value with unit.
    pub fn display_value(&self) -> String {
        match self {
            Reading::Spectrum { bins } => format!("{:.0} avg", bins.mean_level()),
            Reading::Magnetometer(v) => format!("{:.2} μT", v.magnitude()),
            Reading::Motion(v) => format!("{:.2} m/s²", v.magnitude()),
            Reading::Light { lux } => format!("{lux:.0} lux"),
            Reading::Frame(f) => format!("{}x{} frame", f.width, f.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_magnitude() {
        let v = Vector3::new(3.0, 4.0, 0.0);
        assert!((v.magnitude() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_reading_kind_and_magnitude() {
        let mag = Reading::Magnetometer(Vector3::new(0.0, 0.0, 48.0));
        assert_eq!(mag.kind(), SensorKind::Magnetometer);
        assert_eq!(mag.magnitude(), Some(48.0));

        let spectrum = Reading::Spectrum {
            bins: SpectrumSample::silent(8),
        };
        assert_eq!(spectrum.kind(), SensorKind::Audio);
        assert_eq!(spectrum.magnitude(), None);
    }

    #[test]
    fn test_levels_are_clamped() {
        assert_eq!(Reading::Light { lux: 5000.0 }.level(), 1.0);
        assert!((Reading::Motion(Vector3::new(10.0, 0.0, 0.0)).level() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_frame_brightness() {
        let frame = VideoFrame::new(2, 1, vec![30, 60, 90, 255, 255, 255, 255, 255]);
        let levels: Vec<u8> = frame.brightness().collect();
        assert_eq!(levels, vec![60, 255]);
    }

    #[test]
    fn test_reading_json_shape() {
        let json = serde_json::json!({ "kind": "spectrum", "bins": [0, 10, 20] });
        let reading: Reading = serde_json::from_value(json).unwrap();
        assert_eq!(
            reading,
            Reading::Spectrum {
                bins: SpectrumSample::new(vec![0, 10, 20])
            }
        );

        let json = serde_json::json!({ "kind": "magnetometer", "x": 1.0, "y": 2.0, "z": 2.0 });
        let reading: Reading = serde_json::from_value(json).unwrap();
        assert_eq!(reading.magnitude(), Some(3.0));
    }
}
