//! Capped exponential reconnect backoff.

use dutyboard_core::config::ReconnectConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    multiplier: f64,
    jitter: f64,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 { multiplier } else { 1.0 };
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            multiplier,
            jitter: 0.0,
            current: floor,
            attempts: 0,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.floor_ms),
            Duration::from_millis(config.ceiling_ms),
            config.multiplier,
        )
        .with_jitter(config.jitter)
    }

    /// Random fraction (0..=1) of the next step added to each delay.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() { jitter.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Back to the floor; called when a connection opens.
    pub fn reset(&mut self) {
        self.current = self.floor;
        self.attempts = 0;
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay to wait before the next attempt, then grow the base delay.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        let next = scale(base, self.multiplier).min(self.ceiling);
        let delay = if self.jitter > 0.0 && next > base {
            base + (next - base).mul_f64(self.jitter * rand::random::<f64>())
        } else {
            base
        };
        self.current = next;
        self.attempts += 1;
        delay
    }
}

/// `d * factor`, rounded to the nearest nanosecond.
fn scale(d: Duration, factor: f64) -> Duration {
    let nanos = (d.as_nanos() as f64 * factor).round();
    Duration::from_nanos(nanos.min(u64::MAX as f64) as u64)
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}
