//! Per-adapter request pacing
//!
//! One call in flight at a time. Waiters queue on a fair mutex (FIFO), and the next call
//! may not start until `min_interval` after the previous call started, which is the same as
//! pausing `max(0, min_interval - elapsed)` after each call completes.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// FIFO rate limiter enforcing a requests-per-second ceiling
#[derive(Debug)]
pub struct RateLimiter {
    /// Earliest instant at which the next call may start
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// `requests_per_second` of zero is treated as one
    pub fn per_second(requests_per_second: u32) -> Self {
        let rps = u64::from(requests_per_second.max(1));
        Self {
            next_slot: Mutex::new(None),
            min_interval: Duration::from_micros(1_000_000 / rps),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `call` once the limiter admits it
    ///
    /// The lock is held for the whole call so concurrent callers are serialized in arrival
    /// order.
    pub async fn execute<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut next_slot = self.next_slot.lock().await;

        if let Some(at) = *next_slot {
            let now = Instant::now();
            if at > now {
                tracing::debug!("Rate limiting: waiting {:?}", at - now);
                sleep_until(at).await;
            }
        }

        let started = Instant::now();
        let output = call().await;
        *next_slot = Some(started + self.min_interval);

        output
    }
}
