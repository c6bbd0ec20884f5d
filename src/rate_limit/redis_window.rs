//! Redis-backed fixed window for coordinating several ingest processes.
//!
//! The window is one counter key with a millisecond expiry. Increment and
//! expiry are applied atomically by a Lua script.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use tracing::debug;

use super::{RateLimitError, RateLimitResult, RequestGate};

/// Key prefix for rate limit data in Redis.
const KEY_PREFIX: &str = "hoopsync:ratelimit:";

const WINDOW_SCRIPT: &str = r#"
    local key = KEYS[1]
    local window_ms = tonumber(ARGV[1])
    local max = tonumber(ARGV[2])

    local count = redis.call('INCR', key)
    local ttl = redis.call('PTTL', key)
    if count == 1 or ttl < 0 then
        redis.call('PEXPIRE', key, window_ms)
        ttl = window_ms
    end

    if count > max then
        return {0, math.max(ttl, 1)}
    end
    return {1, 0}
"#;

/// Fixed-window limiter whose counter lives in Redis.
#[derive(Clone)]
pub struct RedisWindowLimiter {
    conn: ConnectionManager,
    key: String,
    max_per_window: u32,
    window: Duration,
}

impl RedisWindowLimiter {
    /// Connect and create a limiter for the named window.
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `name` - window name; processes sharing it share the allowance
    pub async fn new(
        redis_url: &str,
        name: &str,
        max_per_window: u32,
        window: Duration,
    ) -> RateLimitResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| RateLimitError::Database(format!("Redis connection error: {}", e)))?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            RateLimitError::Database(format!("Redis connection manager error: {}", e))
        })?;

        Ok(Self {
            conn,
            key: format!("{}{}", KEY_PREFIX, name),
            max_per_window: max_per_window.max(1),
            window,
        })
    }

    /// Take a slot, or return how long until the window expires.
    async fn try_take(&self) -> RateLimitResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        let (granted, ttl_ms): (i64, i64) = Script::new(WINDOW_SCRIPT)
            .key(&self.key)
            .arg(self.window.as_millis() as i64)
            .arg(self.max_per_window as i64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Database(e.to_string()))?;

        Ok(wait_from_reply(granted, ttl_ms))
    }
}

/// `None` when the slot was granted, otherwise the time left in the window.
/// A denied slot always waits at least a millisecond.
fn wait_from_reply(granted: i64, ttl_ms: i64) -> Option<Duration> {
    if granted == 1 {
        return None;
    }
    Some(Duration::from_millis(ttl_ms.max(1) as u64))
}

#[async_trait]
impl RequestGate for RedisWindowLimiter {
    async fn acquire(&self) -> RateLimitResult<()> {
        loop {
            let Some(wait) = self.try_take().await? else {
                return Ok(());
            };
            debug!("Shared rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn describe(&self) -> String {
        format!(
            "redis ({} requests / {}s, key {})",
            self.max_per_window,
            self.window.as_secs(),
            self.key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_reply_does_not_wait() {
        assert_eq!(wait_from_reply(1, 0), None);
    }

    #[test]
    fn test_denied_reply_waits_for_window() {
        assert_eq!(wait_from_reply(0, 1500), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_denied_reply_with_expiring_window_still_waits() {
        // PTTL of 0 or -1 at the window edge must not grant an extra slot
        assert_eq!(wait_from_reply(0, 0), Some(Duration::from_millis(1)));
        assert_eq!(wait_from_reply(0, -1), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_script_clamps_denied_wait() {
        assert!(WINDOW_SCRIPT.contains("return {0, math.max(ttl, 1)}"));
    }
}
