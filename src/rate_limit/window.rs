//! In-process fixed-window limiter.
//!
//! All counters live behind one `std::sync::Mutex`. The lock is only held
//! for the arithmetic; waiting happens after it is released.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::config::{WindowStats, DEFAULT_MAX_PER_WINDOW, DEFAULT_WINDOW_SECS};
use super::{RateLimitResult, RequestGate};

/// Counters for the current window.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub window_start: Instant,
    pub request_count: u32,
    pub max_per_window: u32,
    pub window_duration: Duration,
}

impl RateLimitState {
    fn new(max_per_window: u32, window_duration: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_window,
            window_duration,
        }
    }

    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.window_start) >= self.window_duration {
            self.window_start = now;
            self.request_count = 0;
        }
    }

    /// Take one slot, or report how long until the window rolls over.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        self.roll(now);
        if self.request_count < self.max_per_window {
            self.request_count += 1;
            Ok(())
        } else {
            let elapsed = now.duration_since(self.window_start);
            Err(self.window_duration.saturating_sub(elapsed))
        }
    }
}

/// Fixed-window request limiter shared by all workers via `Arc`.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    state: Mutex<RateLimitState>,
}

impl FixedWindowLimiter {
    /// Create a limiter. A zero allowance is raised to one request.
    pub fn new(max_per_window: u32, window_duration: Duration) -> Self {
        Self {
            state: Mutex::new(RateLimitState::new(
                max_per_window.max(1),
                window_duration,
            )),
        }
    }

    /// Non-blocking: true if a slot in the current window was taken.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.take(Instant::now()).is_ok()
    }

    /// Wait until a slot is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                match state.take(Instant::now()) {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            debug!("Rate limit reached, waiting {:?} for next window", wait);
            tokio::time::sleep(wait).await;
        }
    }

    pub fn stats(&self) -> WindowStats {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        state.roll(now);
        WindowStats {
            request_count: state.request_count,
            max_per_window: state.max_per_window,
            window_duration: state.window_duration,
            resets_in: state
                .window_duration
                .saturating_sub(now.duration_since(state.window_start)),
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_PER_WINDOW,
            Duration::from_secs(DEFAULT_WINDOW_SECS),
        )
    }
}

#[async_trait]
impl RequestGate for FixedWindowLimiter {
    async fn acquire(&self) -> RateLimitResult<()> {
        FixedWindowLimiter::acquire(self).await;
        Ok(())
    }

    fn describe(&self) -> String {
        let stats = self.stats();
        format!(
            "memory ({} requests / {}s)",
            stats.max_per_window,
            stats.window_duration.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn five_per_minute_scenario() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_until_window_elapses() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(10));
        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_blocks_until_rollover() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(limiter.stats().request_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_report_remaining() {
        let limiter = FixedWindowLimiter::new(4, Duration::from_secs(25));
        limiter.try_acquire();
        tokio::time::advance(Duration::from_secs(5)).await;

        let stats = limiter.stats();
        assert_eq!(stats.remaining(), 3);
        assert_eq!(stats.resets_in, Duration::from_secs(20));
    }

    #[test]
    fn zero_allowance_is_raised_to_one() {
        let limiter = FixedWindowLimiter::new(0, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
