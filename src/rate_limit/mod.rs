//! Rate limiting for outbound stats API requests.
//!
//! A single fixed-window allowance is shared by every worker of a run:
//! - In-memory (default): [`FixedWindowLimiter`] behind an `Arc`
//! - Redis (`redis-backend` feature): [`RedisWindowLimiter`], shared across processes
//!
//! Both sit behind the [`RequestGate`] trait so the ingestion driver does not
//! care which one it got.

mod config;
mod window;

#[cfg(feature = "redis-backend")]
mod redis_window;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use config::{RateLimitConfig, WindowStats};
pub use window::{FixedWindowLimiter, RateLimitState};

#[cfg(feature = "redis-backend")]
pub use redis_window::RedisWindowLimiter;

/// Result type for rate limit operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Errors from rate limit backends.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Admission gate consulted before every outbound request.
#[async_trait]
pub trait RequestGate: Send + Sync {
    /// Wait until a request may be sent, consuming one slot.
    async fn acquire(&self) -> RateLimitResult<()>;

    /// Human readable description for logs.
    fn describe(&self) -> String;
}

pub type SharedGate = Arc<dyn RequestGate>;

/// Build the gate selected by `config.backend`.
pub async fn build_gate(config: &RateLimitConfig) -> RateLimitResult<SharedGate> {
    if config.is_redis() {
        #[cfg(feature = "redis-backend")]
        {
            let limiter = RedisWindowLimiter::new(
                &config.backend,
                "stats-api",
                config.max_per_window,
                config.window(),
            )
            .await?;
            return Ok(Arc::new(limiter));
        }

        #[cfg(not(feature = "redis-backend"))]
        return Err(RateLimitError::Unavailable(
            "Redis rate limiting requires the redis-backend feature".to_string(),
        ));
    }

    if config.backend != "memory" {
        return Err(RateLimitError::Unavailable(format!(
            "unknown rate limit backend '{}' (expected 'memory' or a redis:// URL)",
            config.backend
        )));
    }

    Ok(Arc::new(FixedWindowLimiter::new(
        config.max_per_window,
        config.window(),
    )))
}

/// Parse Retry-After header value (seconds).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(60)))
}

/// Calculate exponential backoff delay for a given attempt, capped at 60s.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(factor);
    Duration::from_millis(delay_ms.min(60_000))
}
