//! Reconnect delay policy: exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base_delay_ms: u64,
    max_delay_ms: u64,
    factor: f64,
    jitter: f64,
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(cfg: &ReconnectConfig) -> Self {
        Self {
            base_delay_ms: cfg.base_delay_ms,
            max_delay_ms: cfg.max_delay_ms,
            factor: cfg.backoff_factor,
            jitter: cfg.jitter_ratio,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based):
    /// `min(base * factor^(attempt-1), max) * (1 + U(-jitter, +jitter))`,
    /// rounded to milliseconds and floored at zero. Attempt 0 maps to an
    /// immediate reconnect.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self.base_delay_ms as f64 * self.factor.powi(attempt as i32 - 1);
        let capped = exp.min(self.max_delay_ms as f64);
        let jitter = if self.jitter > 0.0 {
            rand::rng().random_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        let ms = (capped * (1.0 + jitter)).round().max(0.0) as u64;
        Duration::from_millis(ms)
    }

    /// Upper bound of any delay this policy can produce.
    pub fn max_delay(&self) -> Duration {
        let ms = (self.max_delay_ms as f64 * (1.0 + self.jitter)).round() as u64;
        Duration::from_millis(ms)
    }
}
