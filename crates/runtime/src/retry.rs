//! Retry policies for transient failures.
//!
//! [`Backoff`] computes exponential delays for network retries.
//! [`BoundedRetry`] turns "wait until something exists" polling into a
//! terminating operation with a fixed attempt budget.

use crate::sleep::Sleeper;

/// Exponential backoff: `base_delay_ms * multiplier^(attempt - 1)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Backoff {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl Backoff {
    pub fn new(base_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            ..Self::default()
        }
    }

    /// Set backoff multiplier (never below 1.0).
    pub fn multiplier(mut self, mult: f64) -> Self {
        self.multiplier = if mult.is_finite() { mult.max(1.0) } else { 1.0 };
        self
    }

    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Delay to wait after the failed `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(62) as i32;
        let delay = self.base_delay_ms as f64 * self.multiplier.powi(exp);
        delay.min(self.max_delay_ms as f64) as u64
    }
}

/// The check never produced a value within the attempt budget.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryTimeout {
    pub attempts: u32,
}

/// Fixed-budget polling.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundedRetry {
    pub attempts: u32,
    pub interval_ms: u64,
    /// Interval growth per attempt; `1.0` keeps the interval fixed.
    pub growth: f64,
}

impl BoundedRetry {
    pub fn new(attempts: u32, interval_ms: u64) -> Self {
        Self {
            attempts,
            interval_ms,
            growth: 1.0,
        }
    }

    pub fn with_growth(mut self, growth: f64) -> Self {
        self.growth = if growth.is_finite() { growth.max(1.0) } else { 1.0 };
        self
    }

    fn interval_after(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(62) as i32;
        (self.interval_ms as f64 * self.growth.powi(exp)) as u64
    }

    /// Calls `check` with the 1-based attempt number until it returns a
    /// value or the budget runs out. Sleeps between attempts, never after
    /// the last one. A zero budget still checks once.
    pub async fn poll<T, S, F>(&self, sleeper: &S, mut check: F) -> Result<T, RetryTimeout>
    where
        S: Sleeper,
        F: FnMut(u32) -> Option<T>,
    {
        let attempts = self.attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(found) = check(attempt) {
                return Ok(found);
            }
            if attempt < attempts {
                sleeper.sleep(self.interval_after(attempt)).await;
            }
        }
        log::debug!("bounded retry gave up after {attempts} attempts");
        Err(RetryTimeout { attempts })
    }
}
