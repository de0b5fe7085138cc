use std::collections::BTreeMap;

use foundation::time::Millis;

/// Minimum-interval gate for repeated work.
#[derive(Debug, Clone, PartialEq)]
pub struct Throttle {
    min_interval_ms: f64,
    last: Option<Millis>,
}

impl Throttle {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            min_interval_ms: min_interval_ms.max(0.0),
            last: None,
        }
    }

    pub fn last(&self) -> Option<Millis> {
        self.last
    }

    /// Returns `true` (and records `now`) when at least the minimum interval
    /// has passed since the last permitted call.
    pub fn try_pass(&mut self, now: Millis) -> bool {
        if !self.would_pass(now) {
            return false;
        }
        self.last = Some(now);
        true
    }

    /// Like [`Throttle::try_pass`] without recording the call.
    pub fn would_pass(&self, now: Millis) -> bool {
        self.last
            .is_none_or(|last| now.since(last) >= self.min_interval_ms)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Per-key debounce: at most one accepted request per key per window.
///
/// Only accepted requests move the window; dropped duplicates do not extend
/// it. Different keys never block each other.
#[derive(Debug, Clone)]
pub struct Debouncer<K: Ord> {
    window_ms: f64,
    last_accepted: BTreeMap<K, Millis>,
}

impl<K: Ord> Debouncer<K> {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(0.0),
            last_accepted: BTreeMap::new(),
        }
    }

    pub fn accept(&mut self, key: K, now: Millis) -> bool {
        if let Some(last) = self.last_accepted.get(&key)
            && now.since(*last) < self.window_ms
        {
            return false;
        }
        self.last_accepted.insert(key, now);
        true
    }

    pub fn last_accepted(&self, key: &K) -> Option<Millis> {
        self.last_accepted.get(key).copied()
    }

    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }
}
