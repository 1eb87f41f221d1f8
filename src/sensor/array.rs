//! The set of sensor sources a scan draws on.

use crate::config::SensorConfig;
use crate::sensor::source::{
    ChannelSource, SensorError, SensorFeed, SensorSource, UnavailableSource, DRAIN_BACKLOG,
};
use crate::sensor::types::{Reading, SensorKind, SensorStatus};
use std::collections::BTreeMap;

struct Slot {
    source: Box<dyn SensorSource>,
    status: SensorStatus,
}

/// Owns one source per sensor kind and tracks its status.
#[derive(Default)]
pub struct SensorArray {
    slots: BTreeMap<SensorKind, Slot>,
}

/// Feeds for a channel-backed array, keyed by sensor kind.
pub type SensorFeeds = BTreeMap<SensorKind, SensorFeed>;

impl SensorArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an array of channel sources for the enabled sensors.
    ///
    /// Disabled sensors are installed as unavailable so they show up in the
    /// status report. The camera keeps a backlog so every frame is compared
    /// with its predecessor.
    pub fn channel_backed(config: &SensorConfig) -> (Self, SensorFeeds) {
        let mut array = Self::new();
        let mut feeds = SensorFeeds::new();

        for kind in SensorKind::ALL {
            let enabled = match kind {
                SensorKind::Audio => config.audio,
                SensorKind::Magnetometer => config.magnetometer,
                SensorKind::Motion => config.motion,
                SensorKind::Light => config.light,
                SensorKind::Camera => config.camera,
            };
            if enabled {
                let (source, feed) = match kind {
                    SensorKind::Camera => ChannelSource::buffered(kind, DRAIN_BACKLOG),
                    _ => ChannelSource::new(kind),
                };
                array.install(Box::new(source));
                feeds.insert(kind, feed);
            } else {
                array.install(Box::new(UnavailableSource::new(
                    kind,
                    "disabled in configuration",
                )));
            }
        }

        (array, feeds)
    }

    /// Install a source, replacing any previous source of the same kind.
    pub fn install(&mut self, source: Box<dyn SensorSource>) {
        self.slots.insert(
            source.kind(),
            Slot {
                source,
                status: SensorStatus::Inactive,
            },
        );
    }

    /// Start every installed source.
    ///
    /// A failure marks that sensor unavailable; the others still start.
    pub fn start_all(&mut self) -> Vec<(SensorKind, Result<(), SensorError>)> {
        self.slots
            .iter_mut()
            .map(|(kind, slot)| {
                let result = slot.source.start();
                slot.status = match &result {
                    Ok(()) => SensorStatus::Active,
                    Err(SensorError::AlreadyRunning(_)) => SensorStatus::Active,
                    Err(_) => SensorStatus::Unavailable,
                };
                (*kind, result)
            })
            .collect()
    }

    /// Stop every active source.
    pub fn stop_all(&mut self) {
        for slot in self.slots.values_mut() {
            if slot.status == SensorStatus::Active {
                slot.source.stop();
                slot.status = SensorStatus::Inactive;
            }
        }
    }

    /// Status of a sensor; uninstalled sensors are unavailable.
    pub fn status(&self, kind: SensorKind) -> SensorStatus {
        self.slots
            .get(&kind)
            .map(|s| s.status)
            .unwrap_or(SensorStatus::Unavailable)
    }

    pub fn is_active(&self, kind: SensorKind) -> bool {
        self.slots
            .get(&kind)
            .map(|s| s.status == SensorStatus::Active && s.source.is_active())
            .unwrap_or(false)
    }

    /// Last known reading of an active sensor.
    pub fn latest(&mut self, kind: SensorKind) -> Option<Reading> {
        let slot = self.slots.get_mut(&kind)?;
        if slot.status != SensorStatus::Active {
            return None;
        }
        slot.source.latest()
    }

    /// Readings of an active sensor since the last drain, oldest first.
    pub fn drain(&mut self, kind: SensorKind) -> Vec<Reading> {
        match self.slots.get_mut(&kind) {
            Some(slot) if slot.status == SensorStatus::Active => slot.source.drain(),
            _ => Vec::new(),
        }
    }

    /// Status of every installed sensor.
    pub fn statuses(&self) -> Vec<(SensorKind, SensorStatus)> {
        self.slots.iter().map(|(k, s)| (*k, s.status)).collect()
    }

    /// Capability line listing sensors that can be acquired.
    pub fn capabilities(&self) -> String {
        let available: Vec<&str> = self
            .slots
            .iter()
            .filter(|(_, s)| s.status != SensorStatus::Unavailable)
            .map(|(k, _)| k.label())
            .collect();

        if available.is_empty() {
            "LIMITED SENSOR ACCESS".to_string()
        } else {
            format!("SENSORS: {}", available.join(" | "))
        }
    }
}
