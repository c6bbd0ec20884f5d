//! Proxy selection strategies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::health::ProxyHealthTracker;
use super::pool::ProxyPool;

/// Strategy for choosing which endpoint serves the next request.
pub trait ProxySelectionStrategy: Send + Sync {
    /// Return the index of the chosen endpoint, or None if nothing is usable.
    fn select(&self, pool: &ProxyPool) -> Option<usize>;
}

/// Uniform random choice with no memory of earlier picks.
pub struct RandomStrategy;

impl ProxySelectionStrategy for RandomStrategy {
    fn select(&self, pool: &ProxyPool) -> Option<usize> {
        if pool.is_empty() {
            return None;
        }
        Some(rand::rng().random_range(0..pool.len()))
    }
}

/// Rotates through endpoints in insertion order.
pub struct RoundRobinStrategy {
    counter: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxySelectionStrategy for RoundRobinStrategy {
    fn select(&self, pool: &ProxyPool) -> Option<usize> {
        if pool.is_empty() {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % pool.len())
    }
}

/// Weighted random choice over endpoints the health tracker considers usable.
pub struct HealthWeightedStrategy {
    tracker: Arc<ProxyHealthTracker>,
}

impl HealthWeightedStrategy {
    pub fn new(tracker: Arc<ProxyHealthTracker>) -> Self {
        Self { tracker }
    }
}

impl ProxySelectionStrategy for HealthWeightedStrategy {
    fn select(&self, pool: &ProxyPool) -> Option<usize> {
        if pool.is_empty() {
            return None;
        }

        let weights = self.tracker.weights(pool);
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return None;
        }

        let mut target = rand::rng().random::<f64>() * total;
        let mut chosen = weights.iter().rposition(|w| *w > 0.0)?;
        for (idx, weight) in weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            if target < *weight {
                chosen = idx;
                break;
            }
            target -= weight;
        }

        let endpoint = pool.get(chosen)?;
        self.tracker.record_use(&endpoint.label());
        Some(chosen)
    }
}

/// Selection strategy type for config/CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategyType {
    /// Uniform random selection each request
    #[default]
    Random,
    /// Rotate through endpoints consecutively
    RoundRobin,
    /// Weighted by recent success, skipping failing endpoints
    HealthWeighted,
}

impl SelectionStrategyType {
    /// Create a boxed strategy instance.
    pub fn create_strategy(
        &self,
        tracker: Arc<ProxyHealthTracker>,
    ) -> Box<dyn ProxySelectionStrategy> {
        match self {
            Self::Random => Box::new(RandomStrategy),
            Self::RoundRobin => Box::new(RoundRobinStrategy::new()),
            Self::HealthWeighted => Box::new(HealthWeightedStrategy::new(tracker)),
        }
    }

    /// Parse from string (for CLI/env var).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "random" => Some(Self::Random),
            "roundrobin" => Some(Self::RoundRobin),
            "healthweighted" | "weighted" | "health" => Some(Self::HealthWeighted),
            _ => None,
        }
    }
}

impl std::fmt::Display for SelectionStrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::RoundRobin => write!(f, "round-robin"),
            Self::HealthWeighted => write!(f, "health-weighted"),
        }
    }
}

impl std::str::FromStr for SelectionStrategyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or_else(|| {
            format!(
                "Invalid selection strategy '{}'. Valid options: random, round-robin, health-weighted",
                s
            )
        })
    }
}
