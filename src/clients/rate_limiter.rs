use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{error::DeliveryError, models::endpoint::RateLimitConfig};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);

        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_second)
            .min(self.capacity);
        self.last_refill = now;
    }

    /// Takes a token, or returns how long until one is available.
    fn take(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }

        let tokens_needed = 1.0 - self.tokens;
        Err(Duration::from_secs_f64(tokens_needed / self.refill_per_second))
    }
}

/// Token bucket guarding one endpoint. Starts full, so a burst of
/// `capacity` sends goes out immediately.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = config.capacity.max(1) as f64;

        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                capacity,
                refill_per_second: Self::refill_rate(&config),
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill_rate(config: &RateLimitConfig) -> f64 {
        let rate = config.refill_per_second();
        if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            config.capacity.max(1) as f64
        }
    }

    /// Applies a new budget without resetting the tokens already earned.
    pub async fn reconfigure(&self, config: RateLimitConfig) {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.capacity = config.capacity.max(1) as f64;
        bucket.refill_per_second = Self::refill_rate(&config);
        bucket.tokens = bucket.tokens.min(bucket.capacity);
    }

    pub async fn try_acquire(&self) -> bool {
        self.bucket.lock().await.take().is_ok()
    }

    /// Waits for a token. Returns the time spent waiting.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<Duration, DeliveryError> {
        let mut total_wait = Duration::ZERO;

        loop {
            let wait = match self.bucket.lock().await.take() {
                Ok(()) => {
                    trace!(waited_ms = total_wait.as_millis() as u64, "Rate limit token acquired");
                    return Ok(total_wait);
                }
                Err(wait) => wait,
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate limited, waiting for token");

            tokio::select! {
                _ = token.cancelled() => return Err(DeliveryError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            total_wait += wait;
        }
    }

    pub async fn available_tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.tokens
    }
}
