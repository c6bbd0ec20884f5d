//! Rate limiter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upstream allowance: requests per fixed window.
pub const DEFAULT_MAX_PER_WINDOW: u32 = 30;
pub const DEFAULT_WINDOW_SECS: u64 = 25;

/// `[rate_limit]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window, shared by every worker.
    pub max_per_window: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// `memory` or a `redis://` URL (`RATE_LIMIT_BACKEND`).
    pub backend: String,
    /// Retries after the first attempt of a unit.
    pub retry_budget: u32,
    /// Base for exponential backoff between retries.
    pub backoff_base_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            window_secs: DEFAULT_WINDOW_SECS,
            backend: "memory".to_string(),
            retry_budget: 3,
            backoff_base_ms: 2000,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(backend) = std::env::var("RATE_LIMIT_BACKEND") {
            if !backend.is_empty() {
                self.backend = backend;
            }
        }
        self
    }

    pub fn is_redis(&self) -> bool {
        self.backend.starts_with("redis://") || self.backend.starts_with("rediss://")
    }
}

/// Snapshot of the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
    pub request_count: u32,
    pub max_per_window: u32,
    pub window_duration: Duration,
    /// Time until the window rolls over.
    pub resets_in: Duration,
}

impl WindowStats {
    pub fn remaining(&self) -> u32 {
        self.max_per_window.saturating_sub(self.request_count)
    }
}
