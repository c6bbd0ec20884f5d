//! Daily and full ingestion drivers.
//!
//! A run first fetches the player index, derives the list of work units
//! from it, then works through those units with a small number of concurrent
//! workers. Every unit follows the same procedure:
//!
//! 1. build a [`RequestConfig`](crate::http_client::RequestConfig) (fresh proxy per attempt)
//! 2. wait on the shared rate limit gate
//! 3. fetch, transform, upsert
//!
//! Blocked and transient failures are retried up to the retry budget with
//! exponential backoff. Shape and storage failures are recorded and skipped.
//! Configuration failures abort the run.

mod fetcher;
pub mod plan;
mod report;
pub mod transform;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

pub use fetcher::StatsFetcher;
pub use plan::{IngestMode, PlayerRef, WorkUnit};
pub use report::{IngestionReport, UnitFailure};

use crate::error::{ErrorCategory, IngestError, IngestResult};
use crate::http_client::RequestConfigBuilder;
use crate::models::{Season, StatRow};
use crate::proxy::ProxyHealthTracker;
use crate::rate_limit::{backoff_delay, SharedGate};
use crate::repository::StatStore;

/// Knobs for a run; see `[ingest]` and `[rate_limit]` in the config file.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Units fetched concurrently after the player index.
    pub workers: usize,
    /// Retries after the first attempt for blocked or transient failures.
    pub retry_budget: u32,
    pub backoff_base_ms: u64,
    /// Seasons covered by a full run, ending at the current one.
    pub history_seasons: usize,
    /// Cap on players per run, 0 for no cap.
    pub max_players: usize,
    /// Defaults to the season in progress today.
    pub current_season: Option<Season>,
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            workers: 2,
            retry_budget: 3,
            backoff_base_ms: 2000,
            history_seasons: 10,
            max_players: 0,
            current_season: None,
            show_progress: false,
        }
    }
}

struct UnitOutcome {
    attempts: u32,
    /// Category of each error that led to another attempt.
    retried: Vec<ErrorCategory>,
    result: IngestResult<(Vec<StatRow>, usize)>,
}

/// Runs fetch, transform and store cycles against the stats API.
pub struct IngestionDriver {
    requests: RequestConfigBuilder,
    gate: SharedGate,
    fetcher: Arc<dyn StatsFetcher>,
    store: Arc<dyn StatStore>,
    health: Option<Arc<ProxyHealthTracker>>,
    options: IngestOptions,
}

impl IngestionDriver {
    pub fn new(
        requests: RequestConfigBuilder,
        gate: SharedGate,
        fetcher: Arc<dyn StatsFetcher>,
        store: Arc<dyn StatStore>,
        options: IngestOptions,
    ) -> Self {
        Self {
            requests,
            gate,
            fetcher,
            store,
            health: None,
            options,
        }
    }

    /// Report proxied attempt outcomes to `tracker`.
    pub fn with_health_tracker(mut self, tracker: Arc<ProxyHealthTracker>) -> Self {
        self.health = Some(tracker);
        self
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Plan the units of a run from already-fetched player index rows.
    pub fn plan(&self, mode: IngestMode, index_rows: &[StatRow]) -> Vec<WorkUnit> {
        let current = self.current_season();
        let seasons = plan::seasons(mode, current, self.options.history_seasons);
        let players = plan::select_players(mode, index_rows, &seasons, self.options.max_players);
        info!(
            "Planning {} ingestion: {} seasons, {} players",
            mode,
            seasons.len(),
            players.len()
        );
        plan::expand_units(mode, &seasons, current, &players)
    }

    fn current_season(&self) -> Season {
        self.options.current_season.unwrap_or_else(Season::current)
    }

    /// Run a daily or full ingestion.
    ///
    /// Returns `Err` only for configuration failures; every other failure is
    /// recorded in the report.
    pub async fn run_ingestion(&self, mode: IngestMode) -> IngestResult<IngestionReport> {
        let start = Instant::now();
        let mut report = IngestionReport::new(mode);

        info!(
            "Starting {} ingestion (route: {}, gate: {}, store: {})",
            mode,
            self.requests.mode(),
            self.gate.describe(),
            self.store.describe()
        );

        let index = plan::index_unit(mode, self.current_season());
        let index_outcome = self.run_unit(&index).await;
        let index_rows = match index_outcome.result {
            Ok((rows, written)) => {
                report.record_success(rows.len(), written, &index_outcome.retried);
                rows
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Player index failed, continuing without players: {}", e);
                report.record_failure(
                    &index,
                    &e,
                    index_outcome.attempts,
                    &index_outcome.retried,
                );
                Vec::new()
            }
        };

        let units = self.plan(mode, &index_rows);
        report.units_planned = units.len() + 1;

        let pb = if self.options.show_progress {
            let pb = ProgressBar::new(units.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcomes = stream::iter(units)
            .map(|unit| async move {
                let outcome = self.run_unit(&unit).await;
                (unit, outcome)
            })
            .buffer_unordered(self.options.workers.max(1));

        while let Some((unit, outcome)) = outcomes.next().await {
            pb.set_message(unit.label());
            pb.inc(1);
            match outcome.result {
                Ok((rows, written)) => {
                    report.record_success(rows.len(), written, &outcome.retried);
                }
                Err(e) if e.is_fatal() => {
                    pb.abandon_with_message("aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!("{} failed after {} attempts: {}", unit.label(), outcome.attempts, e);
                    report.record_failure(&unit, &e, outcome.attempts, &outcome.retried);
                }
            }
        }
        pb.finish_and_clear();

        report.elapsed = start.elapsed();
        info!(
            "{} ingestion finished: {} ok, {} failed, {} rows written",
            mode, report.units_succeeded, report.units_failed, report.rows_written
        );
        Ok(report)
    }

    /// One unit with retries. Attempts are bounded by `retry_budget + 1`.
    async fn run_unit(&self, unit: &WorkUnit) -> UnitOutcome {
        let mut attempts = 0u32;
        let mut retried = Vec::new();
        loop {
            attempts += 1;
            match self.attempt(unit).await {
                Ok(done) => {
                    return UnitOutcome {
                        attempts,
                        retried,
                        result: Ok(done),
                    }
                }
                Err(e) if e.is_retryable() && attempts <= self.options.retry_budget => {
                    let delay = backoff_delay(attempts - 1, self.options.backoff_base_ms);
                    debug!(
                        "{} attempt {} failed ({}), retrying in {:?}",
                        unit.label(),
                        attempts,
                        e,
                        delay
                    );
                    retried.push(e.category());
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return UnitOutcome {
                        attempts,
                        retried,
                        result: Err(e),
                    }
                }
            }
        }
    }

    async fn attempt(&self, unit: &WorkUnit) -> IngestResult<(Vec<StatRow>, usize)> {
        let config = self.requests.get_api_config(None, None)?;
        self.gate.acquire().await?;

        let fetched = self
            .fetcher
            .fetch(unit.dataset.endpoint(), &unit.params(), &config)
            .await;

        if let (Some(tracker), Some(label)) = (&self.health, &config.proxy_label) {
            match &fetched {
                Ok(_) => tracker.mark_success(label),
                Err(e) if e.is_retryable() => tracker.mark_failed(label),
                Err(_) => {}
            }
        }

        let body = fetched?;
        let rows = transform::transform(unit.dataset, unit.season, &body)?;
        let written = self
            .store
            .upsert_rows(&rows)
            .await
            .map_err(IngestError::Storage)?;
        debug!("{}: {} rows via {}", unit.label(), rows.len(), config.route());
        Ok((rows, written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::RequestConfig;
    use crate::models::Dataset;
    use crate::proxy::{ProxyPool, RandomStrategy, RuntimeContext};
    use crate::rate_limit::FixedWindowLimiter;
    use crate::repository::MemoryStatStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct IndexOnly {
        calls: AtomicU32,
    }

    #[async_trait]
    impl StatsFetcher for IndexOnly {
        async fn fetch(
            &self,
            endpoint: &str,
            _params: &[(String, String)],
            _config: &RequestConfig,
        ) -> IngestResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if endpoint == Dataset::Players.endpoint() {
                return Ok(json!({"resultSets": [{
                    "name": "CommonAllPlayers",
                    "headers": ["PERSON_ID", "ROSTERSTATUS", "FROM_YEAR", "TO_YEAR"],
                    "rowSet": [[2544, 1, "2003", "2024"]]
                }]}));
            }
            Err(IngestError::data_shape("not stubbed"))
        }
    }

    fn driver(fetcher: Arc<dyn StatsFetcher>, store: Arc<MemoryStatStore>) -> IngestionDriver {
        let requests = RequestConfigBuilder::new(
            Arc::new(ProxyPool::empty()),
            Arc::new(RandomStrategy),
            RuntimeContext::local(),
        );
        IngestionDriver::new(
            requests,
            Arc::new(FixedWindowLimiter::new(1000, std::time::Duration::from_secs(1))),
            fetcher,
            store,
            IngestOptions {
                current_season: Some(Season::new(2024)),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_shape_failures_do_not_abort_run() {
        let fetcher = Arc::new(IndexOnly {
            calls: AtomicU32::new(0),
        });
        let store = Arc::new(MemoryStatStore::new());
        let report = driver(fetcher.clone(), store.clone())
            .run_ingestion(IngestMode::Daily)
            .await
            .unwrap();

        // index + 3 seasonal + 30 rosters + 1 player log
        assert_eq!(report.units_planned, 35);
        assert_eq!(report.units_succeeded, 1);
        assert_eq!(report.units_failed, 34);
        assert_eq!(report.retries, 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 35);
        assert_eq!(store.count_rows(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_forced_proxy_with_empty_pool_is_fatal() {
        let fetcher = Arc::new(IndexOnly {
            calls: AtomicU32::new(0),
        });
        let mut driver = driver(fetcher.clone(), Arc::new(MemoryStatStore::new()));
        driver.requests = driver.requests.with_mode(crate::proxy::ProxyMode::ForceProxy);

        let err = driver.run_ingestion(IngestMode::Daily).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
