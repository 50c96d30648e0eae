//! Capped exponential backoff for retrying failed receive calls.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    next: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        let next = config.initial_delay.min(config.max_delay);
        ExponentialBackoff {
            config,
            next,
            attempt: 0,
        }
    }

    /// Returns the delay to wait now and advances to the next one.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        let delay = self.next;
        self.next = delay
            .mul_f64(self.config.multiplier.max(1.0))
            .min(self.config.max_delay);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.config.initial_delay.min(self.config.max_delay);
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
