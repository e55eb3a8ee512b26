//! Sliding-window request throttling
//!
//! Keeps the timestamps of recent requests in two windows (one minute, one
//! hour). An admission request prunes both windows and, when either is at
//! its ceiling, sleeps until the oldest entry ages out. This bounds the
//! number of requests in any trailing window rather than smoothing them
//! like a token bucket would.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

struct Windows {
    minute: VecDeque<Instant>,
    hour: VecDeque<Instant>,
}

/// Per-client request throttle
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(Windows {
                minute: VecDeque::new(),
                hour: VecDeque::new(),
            }),
        }
    }

    /// Wait until a request may be sent, then record it.
    ///
    /// Returns how long the caller was held back. Concurrent callers are
    /// admitted one at a time so the ceilings hold under contention.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        let mut windows = self.windows.lock().await;

        loop {
            let now = Instant::now();
            prune(&mut windows.minute, now, MINUTE);
            prune(&mut windows.hour, now, HOUR);

            let wait = wait_for(&windows.minute, self.config.requests_per_minute, now, MINUTE)
                .max(wait_for(&windows.hour, self.config.requests_per_hour, now, HOUR));

            if wait.is_zero() {
                break;
            }

            tracing::info!("Rate limiting: waiting {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }

        let now = Instant::now();
        windows.minute.push_back(now);
        windows.hour.push_back(now);

        started.elapsed()
    }

    /// Requests recorded in the trailing minute and hour
    pub async fn in_flight(&self) -> (usize, usize) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        prune(&mut windows.minute, now, MINUTE);
        prune(&mut windows.hour, now, HOUR);
        (windows.minute.len(), windows.hour.len())
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(&oldest) = window.front() {
        if now.duration_since(oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

fn wait_for(window: &VecDeque<Instant>, ceiling: usize, now: Instant, span: Duration) -> Duration {
    // Configured ceilings are at least 1; zero only reaches here from a
    // directly built limiter and disables that window.
    if ceiling == 0 || window.len() < ceiling {
        return Duration::ZERO;
    }
    // The window holds at least `ceiling` entries, so admitting one more
    // requires the entry `ceiling` places from the back to expire.
    let blocking = window[window.len() - ceiling];
    span.saturating_sub(now.duration_since(blocking))
}
