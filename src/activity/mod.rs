//! Activity reporting for the signal array.
//!
//! This module provides the activity log, toast notifications and the
//! session counters shown by every front end.

pub mod log;
pub mod stats;
pub mod toast;

// Re-export commonly used types
pub use log::{format_clock, ActivityEntry, ActivityLog, EntryKind};
pub use stats::{format_duration, SessionStats, SharedSessionStats, StatsSnapshot};
pub use toast::{Toast, ToastCenter, ToastKind};
