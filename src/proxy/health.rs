//! Per-endpoint health bookkeeping for proxy rotation.
//!
//! The pool itself is read-only; this tracker keeps counters keyed by the
//! endpoint label (`host:port`) behind a short-lived mutex. It is consulted
//! by [`HealthWeightedStrategy`](super::selection::HealthWeightedStrategy)
//! and fed by the ingestion driver after every proxied attempt.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::pool::ProxyPool;

/// Thresholds deciding when an endpoint is taken out of rotation.
#[derive(Debug, Clone)]
pub struct HealthPolicy {
    /// Total failures today before an endpoint is benched.
    pub max_fails: u32,
    /// Back-to-back failures before an endpoint is benched.
    pub max_consecutive_fails: u32,
    /// Requests per UTC day per endpoint.
    pub max_daily_requests: u32,
    /// Minimum gap between two uses of the same endpoint.
    pub cooldown: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_fails: 5,
            max_consecutive_fails: 3,
            max_daily_requests: 1000,
            cooldown: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
struct EndpointStats {
    fails: u32,
    consecutive_fails: u32,
    requests_today: u32,
    total_requests: u64,
    last_used: Option<Instant>,
    day: NaiveDate,
}

impl EndpointStats {
    fn new(day: NaiveDate) -> Self {
        Self {
            fails: 0,
            consecutive_fails: 0,
            requests_today: 0,
            total_requests: 0,
            last_used: None,
            day,
        }
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if self.day != today {
            self.fails = 0;
            self.consecutive_fails = 0;
            self.requests_today = 0;
            self.day = today;
        }
    }

    fn success_rate(&self) -> f64 {
        let total = self.total_requests.max(1) as f64;
        let successes = (self.total_requests as f64 - self.fails as f64).max(0.0);
        (successes / total) * 100.0
    }
}

/// Snapshot of one endpoint's counters, for display.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointHealth {
    pub label: String,
    pub healthy: bool,
    pub fails: u32,
    pub consecutive_fails: u32,
    pub requests_today: u32,
    pub total_requests: u64,
    pub success_rate: f64,
}

/// Tracks failures and usage per proxy endpoint.
pub struct ProxyHealthTracker {
    policy: HealthPolicy,
    stats: Mutex<HashMap<String, EndpointStats>>,
}

impl ProxyHealthTracker {
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            policy,
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn with_entry<R>(&self, label: &str, f: impl FnOnce(&mut EndpointStats) -> R) -> R {
        let today = Self::today();
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        let entry = stats
            .entry(label.to_string())
            .or_insert_with(|| EndpointStats::new(today));
        entry.roll_day(today);
        f(entry)
    }

    /// Note that an endpoint was handed out for a request.
    pub fn record_use(&self, label: &str) {
        self.with_entry(label, |s| {
            s.requests_today += 1;
            s.total_requests += 1;
            s.last_used = Some(Instant::now());
        });
    }

    pub fn mark_success(&self, label: &str) {
        self.with_entry(label, |s| {
            s.consecutive_fails = 0;
        });
    }

    pub fn mark_failed(&self, label: &str) {
        let (fails, consecutive) = self.with_entry(label, |s| {
            s.fails += 1;
            s.consecutive_fails += 1;
            (s.fails, s.consecutive_fails)
        });
        debug!(
            "Proxy {} failed ({} today, {} in a row)",
            label, fails, consecutive
        );
    }

    fn is_healthy(&self, s: &EndpointStats, now: Instant) -> bool {
        if s.fails >= self.policy.max_fails
            || s.consecutive_fails >= self.policy.max_consecutive_fails
            || s.requests_today >= self.policy.max_daily_requests
        {
            return false;
        }
        match s.last_used {
            Some(last) => now.duration_since(last) >= self.policy.cooldown,
            None => true,
        }
    }

    fn score(&self, s: &EndpointStats) -> f64 {
        let usage = s.requests_today as f64 / self.policy.max_daily_requests.max(1) as f64;
        (s.success_rate() * (1.0 - usage)).max(1.0)
    }

    /// Selection weight per pool index; zero for benched endpoints.
    ///
    /// When every endpoint is benched all counters are cleared and each
    /// endpoint gets an equal weight.
    pub fn weights(&self, pool: &ProxyPool) -> Vec<f64> {
        let today = Self::today();
        let now = Instant::now();
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());

        let weights: Vec<f64> = pool
            .endpoints()
            .iter()
            .map(|endpoint| {
                let entry = stats
                    .entry(endpoint.label())
                    .or_insert_with(|| EndpointStats::new(today));
                entry.roll_day(today);
                if self.is_healthy(entry, now) {
                    self.score(entry)
                } else {
                    0.0
                }
            })
            .collect();

        if !weights.is_empty() && weights.iter().all(|w| *w <= 0.0) {
            warn!("No healthy proxies left; resetting proxy statistics");
            stats.clear();
            return vec![1.0; pool.len()];
        }

        weights
    }

    /// Counters for every endpoint in the pool, in pool order.
    pub fn snapshot(&self, pool: &ProxyPool) -> Vec<EndpointHealth> {
        let today = Self::today();
        let now = Instant::now();
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());

        pool.endpoints()
            .iter()
            .map(|endpoint| {
                let label = endpoint.label();
                let mut entry = stats
                    .get(&label)
                    .cloned()
                    .unwrap_or_else(|| EndpointStats::new(today));
                entry.roll_day(today);
                EndpointHealth {
                    healthy: self.is_healthy(&entry, now),
                    fails: entry.fails,
                    consecutive_fails: entry.consecutive_fails,
                    requests_today: entry.requests_today,
                    total_requests: entry.total_requests,
                    success_rate: entry.success_rate(),
                    label,
                }
            })
            .collect()
    }

    /// Forget all counters.
    pub fn reset(&self) {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for ProxyHealthTracker {
    fn default() -> Self {
        Self::new(HealthPolicy::default())
    }
}
