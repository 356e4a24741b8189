//! Process-wide minimum-interval gate for outbound catalog fetches.
//!
//! Every fetch to the scraped site goes through one shared `RateLimiter`.
//! The gate is held for the whole fetch, so requests from every session are
//! serialized and spaced by at least `min_interval`, measured from the moment
//! the previous fetch completed.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default spacing between two fetches to the catalog site
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Shared gate enforcing a minimum interval between fetches.
///
/// Share it with `Arc<RateLimiter>`; cloning the limiter itself would create
/// an independent gate.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// When the last gated operation finished (`None` before the first one)
    last_completed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_completed: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `operation` once the interval since the previous one has elapsed.
    ///
    /// Callers queue on the gate in FIFO order (tokio's mutex is fair).
    pub async fn run<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_completed = self.last_completed.lock().await;

        if let Some(previous) = *last_completed {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                debug!("Rate limiter waiting {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let output = operation().await;
        *last_completed = Some(Instant::now());
        output
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
