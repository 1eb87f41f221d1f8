//! Sensor sources: the seam between platform adapters and the scan core.

use crate::sensor::types::{Reading, SensorKind};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A sensor the scan controller can poll.
///
/// Adapters push readings in whatever way the platform delivers them; the
/// core asks for the last known value, or for every reading in arrival
/// order where consecutive readings matter.
pub trait SensorSource: Send {
    /// Which sensor this source provides.
    fn kind(&self) -> SensorKind;

    /// Acquire the sensor.
    fn start(&mut self) -> Result<(), SensorError>;

    /// Release the sensor.
    fn stop(&mut self);

    /// Whether the sensor is currently acquired.
    fn is_active(&self) -> bool;

    /// The last known reading, if any arrived since the sensor started.
    fn latest(&mut self) -> Option<Reading>;

    /// Readings that arrived since the last drain, oldest first.
    ///
    /// Sources that keep only the last value return it alone.
    fn drain(&mut self) -> Vec<Reading> {
        self.latest().into_iter().collect()
    }
}

/// Errors that can occur while acquiring or feeding a sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    AlreadyRunning(SensorKind),
    /// Permission denied or not supported on this device
    Unavailable { kind: SensorKind, reason: String },
    /// The source behind a feed was dropped
    Disconnected(SensorKind),
    /// The feed buffer is full; the reading was dropped
    FeedFull(SensorKind),
    WrongKind {
        expected: SensorKind,
        got: SensorKind,
    },
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::AlreadyRunning(kind) => write!(f, "{kind} sensor is already running"),
            SensorError::Unavailable { kind, reason } => {
                write!(f, "{kind} sensor unavailable: {reason}")
            }
            SensorError::Disconnected(kind) => write!(f, "{kind} sensor feed disconnected"),
            SensorError::FeedFull(kind) => write!(f, "{kind} sensor feed is full"),
            SensorError::WrongKind { expected, got } => {
                write!(f, "Expected a {expected} reading, got {got}")
            }
        }
    }
}

impl std::error::Error for SensorError {}

/// Default buffer size between an adapter and its source.
pub const FEED_CAPACITY: usize = 1_024;

/// Readings a buffered source holds for [`SensorSource::drain`].
pub const DRAIN_BACKLOG: usize = 64;

/// A source fed over a channel by a [`SensorFeed`].
pub struct ChannelSource {
    kind: SensorKind,
    receiver: Receiver<Reading>,
    running: Arc<AtomicBool>,
    last: Option<Reading>,
    /// Undrained readings; empty unless `backlog_limit > 0`
    backlog: VecDeque<Reading>,
    backlog_limit: usize,
}

/// The push side of a [`ChannelSource`], handed to a platform adapter.
#[derive(Clone)]
pub struct SensorFeed {
    kind: SensorKind,
    sender: Sender<Reading>,
    running: Arc<AtomicBool>,
}

impl ChannelSource {
    /// Create a source and the feed that pushes into it.
    pub fn new(kind: SensorKind) -> (Self, SensorFeed) {
        Self::with_capacity(kind, FEED_CAPACITY)
    }

    pub fn with_capacity(kind: SensorKind, capacity: usize) -> (Self, SensorFeed) {
        let (sender, receiver) = bounded(capacity);
        let running = Arc::new(AtomicBool::new(false));
        let source = Self {
            kind,
            receiver,
            running: running.clone(),
            last: None,
            backlog: VecDeque::new(),
            backlog_limit: 0,
        };
        let feed = SensorFeed {
            kind,
            sender,
            running,
        };
        (source, feed)
    }

    /// Create a source that keeps up to `backlog` readings for draining.
    ///
    /// When the backlog is full the oldest reading is dropped.
    pub fn buffered(kind: SensorKind, backlog: usize) -> (Self, SensorFeed) {
        let (mut source, feed) = Self::new(kind);
        source.backlog_limit = backlog;
        (source, feed)
    }

    /// Move queued readings out of the channel.
    fn pull(&mut self) {
        for reading in self.receiver.try_iter() {
            if self.backlog_limit > 0 {
                if self.backlog.len() >= self.backlog_limit {
                    self.backlog.pop_front();
                }
                self.backlog.push_back(reading.clone());
            }
            self.last = Some(reading);
        }
    }
}

impl SensorSource for ChannelSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn start(&mut self) -> Result<(), SensorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SensorError::AlreadyRunning(self.kind));
        }
        // Readings from a previous scan must not leak into this one.
        while self.receiver.try_recv().is_ok() {}
        self.last = None;
        self.backlog.clear();
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn latest(&mut self) -> Option<Reading> {
        self.pull();
        if self.is_active() {
            self.last.clone()
        } else {
            None
        }
    }

    fn drain(&mut self) -> Vec<Reading> {
        self.pull();
        if !self.is_active() {
            self.backlog.clear();
            return Vec::new();
        }
        if self.backlog_limit == 0 {
            return self.last.clone().into_iter().collect();
        }
        self.backlog.drain(..).collect()
    }
}

impl SensorFeed {
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Push a reading.
    ///
    /// Returns `Ok(false)` when the source is not running and the reading
    /// was discarded.
    pub fn push(&self, reading: Reading) -> Result<bool, SensorError> {
        if reading.kind() != self.kind {
            return Err(SensorError::WrongKind {
                expected: self.kind,
                got: reading.kind(),
            });
        }
        if !self.running.load(Ordering::SeqCst) {
            return Ok(false);
        }
        match self.sender.try_send(reading) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Err(SensorError::FeedFull(self.kind)),
            Err(TrySendError::Disconnected(_)) => Err(SensorError::Disconnected(self.kind)),
        }
    }

}

/// A sensor that could not be acquired on this device.
pub struct UnavailableSource {
    kind: SensorKind,
    reason: String,
}

impl UnavailableSource {
    pub fn new(kind: SensorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl SensorSource for UnavailableSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn start(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Unavailable {
            kind: self.kind,
            reason: self.reason.clone(),
        })
    }

    fn stop(&mut self) {}

    fn is_active(&self) -> bool {
        false
    }

    fn latest(&mut self) -> Option<Reading> {
        None
    }
}
