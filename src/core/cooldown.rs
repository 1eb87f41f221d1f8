//! Time-window rate limiting.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

/// Allows an action at most once per window.
#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    last: Option<DateTime<Utc>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether the window has elapsed since the last firing.
    ///
    /// A clock that went backwards counts as not elapsed.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.last {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|elapsed| elapsed >= self.window)
                .unwrap_or(false),
        }
    }

    /// Fire if ready. Returns whether the action may proceed.
    pub fn try_fire(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_ready(now) {
            self.last = Some(now);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Independent cooldown windows keyed by category.
#[derive(Debug, Clone)]
pub struct CooldownGate<K> {
    gates: HashMap<K, Cooldown>,
}

impl<K: Eq + Hash + Copy> CooldownGate<K> {
    pub fn new(windows: impl IntoIterator<Item = (K, Duration)>) -> Self {
        Self {
            gates: windows
                .into_iter()
                .map(|(k, window)| (k, Cooldown::new(window)))
                .collect(),
        }
    }

    /// Fire the gate for `key`. Keys without a configured window always pass.
    pub fn try_fire(&mut self, key: K, now: DateTime<Utc>) -> bool {
        match self.gates.get_mut(&key) {
            Some(gate) => gate.try_fire(now),
            None => true,
        }
    }

    pub fn reset(&mut self) {
        for gate in self.gates.values_mut() {
            gate.reset();
        }
    }
}
