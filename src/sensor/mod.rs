//! Sensor acquisition for the CosmicLink array.
//!
//! Platform adapters push readings into [`SensorSource`] implementations;
//! the scan core only polls the last known value.

pub mod array;
pub mod replay;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use array::{SensorArray, SensorFeeds};
pub use replay::{ReplayError, ReplayRecord, ReplayScript};
pub use source::{ChannelSource, SensorError, SensorFeed, SensorSource, UnavailableSource};
pub use types::{Reading, SensorKind, SensorStatus, SpectrumSample, Vector3, VideoFrame};
