use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u64,
    pub jitter: bool,
    /// Ceiling for a server supplied `Retry-After` hint.
    pub max_retry_after_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2,
            jitter: true,
            max_retry_after_ms: 300_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `retry` (1-based), capped at `max_delay_ms`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = self
            .backoff_multiplier
            .max(1)
            .checked_pow(exponent)
            .unwrap_or(u64::MAX);
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);

        if !self.jitter {
            return Duration::from_millis(delay_ms);
        }

        let jitter = rand::random_range(-0.1..=0.1);
        let jittered_delay = (delay_ms as f64 * (1.0 + jitter)) as u64;

        Duration::from_millis(jittered_delay)
    }

    /// Delay actually waited: the larger of the backoff and the server hint,
    /// with the hint capped at `max_retry_after_ms`.
    pub fn next_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.delay_for_retry(retry);

        match retry_after {
            Some(hint) => backoff.max(hint.min(Duration::from_millis(self.max_retry_after_ms))),
            None => backoff,
        }
    }
}
