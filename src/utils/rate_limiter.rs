//! Minimum spacing between paged history requests

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Rate limiter enforcing a minimum delay between calls
pub struct RateLimiter {
    last_call: Mutex<Option<Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    /// Create new rate limiter
    pub fn new(min_delay: Duration) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_delay,
        }
    }

    /// Wait until at least `min_delay` has passed since the previous call
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                sleep(self.min_delay - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Forget the previous call so the next one does not wait
    pub async fn reset(&self) {
        *self.last_call.lock().await = None;
    }
}
