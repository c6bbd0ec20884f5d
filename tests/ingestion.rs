//! End-to-end ingestion runs against a scripted stats API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use hoopsync::error::{ErrorCategory, IngestError, IngestResult};
use hoopsync::http_client::{RequestConfig, RequestConfigBuilder};
use hoopsync::ingest::{IngestMode, IngestOptions, IngestionDriver, StatsFetcher};
use hoopsync::models::{Dataset, Season};
use hoopsync::proxy::{
    build_proxy_list, HealthPolicy, HealthWeightedStrategy, PoolSpec, ProxyCredentials,
    ProxyHealthTracker, ProxyMode, ProxyPool, RandomStrategy, RuntimeContext,
};
use hoopsync::rate_limit::FixedWindowLimiter;
use hoopsync::repository::{MemoryStatStore, StatStore};

const PROXY_PASSWORD: &str = "s3cret-pass";

/// What the fake API does for a request.
#[derive(Clone, Copy)]
enum Behavior {
    Ok,
    AlwaysBlocked,
    /// Fail with a transient error this many times per unit, then succeed.
    FlakyThenOk(u32),
    MalformedRosters,
}

struct FakeApi {
    behavior: Behavior,
    calls: AtomicU32,
    attempts: Mutex<HashMap<String, u32>>,
    routes: Mutex<Vec<Option<String>>>,
}

impl FakeApi {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicU32::new(0),
            attempts: Mutex::new(HashMap::new()),
            routes: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn player_index() -> Value {
    json!({"resultSets": [{
        "name": "CommonAllPlayers",
        "headers": ["PERSON_ID", "DISPLAY_FIRST_LAST", "ROSTERSTATUS", "FROM_YEAR", "TO_YEAR"],
        "rowSet": [
            [2544, "LeBron James", 1, "2003", "2024"],
            [201939, "Stephen Curry", 1, "2009", "2024"],
            [76003, "Kareem Abdul-Jabbar", 0, "1969", "1988"]
        ]
    }]})
}

/// One row carrying every key column of `dataset`.
fn dataset_body(dataset: Dataset, params: &[(String, String)]) -> Value {
    let entity = param(params, "PlayerID")
        .or_else(|| param(params, "TeamID"))
        .unwrap_or("1")
        .to_string();

    let mut headers = Vec::new();
    let mut row = Vec::new();
    for column in dataset.key_columns() {
        headers.push(json!(column));
        row.push(if column.contains("SEASON") {
            json!("2023-24")
        } else if column.contains("GAME") {
            json!("0022400001")
        } else {
            json!(entity.parse::<i64>().unwrap_or(1))
        });
    }
    headers.push(json!("PTS"));
    row.push(json!(25));

    json!({"resultSets": [{
        "name": dataset.result_set(),
        "headers": headers,
        "rowSet": [row]
    }]})
}

#[async_trait]
impl StatsFetcher for FakeApi {
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        config: &RequestConfig,
    ) -> IngestResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.routes.lock().unwrap().push(config.proxy_url.clone());

        let key = format!("{}?{:?}", endpoint, params);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(key).or_insert(0);
            *n += 1;
            *n
        };

        let dataset: Dataset = endpoint.parse().unwrap();
        match self.behavior {
            Behavior::AlwaysBlocked => return Err(IngestError::UpstreamBlocked { status: 403 }),
            Behavior::FlakyThenOk(failures) if attempt <= failures => {
                return Err(IngestError::TransientNetwork("connection reset".into()))
            }
            Behavior::MalformedRosters if dataset == Dataset::TeamRoster => {
                return Ok(json!({"resultSets": [{"name": "CommonTeamRoster"}]}))
            }
            _ => {}
        }

        if dataset == Dataset::Players {
            return Ok(player_index());
        }
        Ok(dataset_body(dataset, params))
    }
}

fn proxy_pool() -> Arc<ProxyPool> {
    let spec = PoolSpec {
        scheme: "http".into(),
        host: "gate.example.net".into(),
        credentials: ProxyCredentials {
            username: "user".into(),
            password: PROXY_PASSWORD.into(),
        },
        port_start: 10001,
        port_end: 10004,
    };
    Arc::new(build_proxy_list(&spec).unwrap())
}

fn options() -> IngestOptions {
    IngestOptions {
        workers: 3,
        retry_budget: 3,
        backoff_base_ms: 500,
        history_seasons: 3,
        current_season: Some(Season::new(2024)),
        ..Default::default()
    }
}

fn local_driver(api: Arc<FakeApi>, store: Arc<MemoryStatStore>, options: IngestOptions) -> IngestionDriver {
    let requests = RequestConfigBuilder::new(
        Arc::new(ProxyPool::empty()),
        Arc::new(RandomStrategy),
        RuntimeContext::local(),
    );
    IngestionDriver::new(
        requests,
        Arc::new(FixedWindowLimiter::new(10_000, Duration::from_secs(1))),
        api,
        store,
        options,
    )
}

#[tokio::test]
async fn daily_run_stores_every_unit() {
    let api = FakeApi::new(Behavior::Ok);
    let store = Arc::new(MemoryStatStore::new());

    let report = local_driver(api.clone(), store.clone(), options())
        .run_ingestion(IngestMode::Daily)
        .await
        .unwrap();

    // index + 3 seasonal + 30 rosters + 2 active players
    assert_eq!(report.units_planned, 36);
    assert!(report.is_clean());
    assert_eq!(report.units_succeeded, 36);
    assert_eq!(api.calls(), 36);
    assert_eq!(report.rows_written, 3 + 3 + 30 + 2);

    assert_eq!(store.rows(Dataset::TeamRoster).await.len(), 30);
    assert_eq!(store.rows(Dataset::PlayerGameLog).await.len(), 2);
    assert!(store.rows(Dataset::PlayerCareer).await.is_empty());
    assert!(api.routes.lock().unwrap().iter().all(Option::is_none));
}

#[tokio::test]
async fn full_run_covers_history_and_careers() {
    let api = FakeApi::new(Behavior::Ok);
    let store = Arc::new(MemoryStatStore::new());

    let report = local_driver(api, store.clone(), options())
        .run_ingestion(IngestMode::Full)
        .await
        .unwrap();

    assert!(report.is_clean());
    // 3 seasons x 3 seasonal datasets, 30 rosters, 2 players x 3 seasons, 2 careers
    assert_eq!(report.units_planned, 1 + 9 + 30 + 6 + 2);
    assert_eq!(store.rows(Dataset::PlayerCareer).await.len(), 2);
}

#[tokio::test]
async fn player_limit_caps_per_player_units() {
    let api = FakeApi::new(Behavior::Ok);
    let store = Arc::new(MemoryStatStore::new());

    let report = local_driver(
        api,
        store.clone(),
        IngestOptions {
            max_players: 1,
            ..options()
        },
    )
    .run_ingestion(IngestMode::Daily)
    .await
    .unwrap();

    assert_eq!(report.units_planned, 1 + 3 + 30 + 1);
    assert_eq!(store.rows(Dataset::PlayerGameLog).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn permanently_blocked_units_stop_after_retry_budget() {
    let api = FakeApi::new(Behavior::AlwaysBlocked);
    let store = Arc::new(MemoryStatStore::new());

    let report = local_driver(api.clone(), store.clone(), options())
        .run_ingestion(IngestMode::Daily)
        .await
        .unwrap();

    // The index fails, so only season and roster units remain
    let units = 1 + 3 + 30;
    assert_eq!(report.units_planned, units);
    assert_eq!(report.units_failed, units);
    assert_eq!(api.calls(), (units * 4) as u32);
    assert_eq!(report.retries, (units * 3) as u32);
    assert_eq!(
        report.retries_by_category[&ErrorCategory::UpstreamBlocked],
        (units * 3) as u32
    );
    assert!(!report
        .retries_by_category
        .contains_key(&ErrorCategory::TransientNetwork));
    assert!(report.failures.iter().all(|f| f.attempts == 4));
    assert_eq!(
        report.failures_by_category[&ErrorCategory::UpstreamBlocked],
        units
    );
    assert_eq!(store.count_rows(None).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_to_success() {
    let api = FakeApi::new(Behavior::FlakyThenOk(2));
    let store = Arc::new(MemoryStatStore::new());

    let report = local_driver(api.clone(), store, options())
        .run_ingestion(IngestMode::Daily)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.retries, 2 * report.units_planned as u32);
    assert_eq!(
        report.retries_by_category[&ErrorCategory::TransientNetwork],
        2 * report.units_planned as u32
    );
    assert_eq!(report.retries_by_category.len(), 1);
    assert_eq!(api.calls(), 3 * report.units_planned as u32);

    let rendered = serde_json::to_value(&report).unwrap();
    assert_eq!(
        rendered["retries_by_category"]["transient-network"],
        json!(2 * report.units_planned)
    );
}

#[tokio::test]
async fn malformed_units_are_skipped_not_retried() {
    let api = FakeApi::new(Behavior::MalformedRosters);
    let store = Arc::new(MemoryStatStore::new());

    let report = local_driver(api.clone(), store.clone(), options())
        .run_ingestion(IngestMode::Daily)
        .await
        .unwrap();

    assert_eq!(report.units_failed, 30);
    assert_eq!(report.failures_by_category[&ErrorCategory::DataShape], 30);
    assert_eq!(report.retries, 0);
    assert_eq!(report.units_succeeded, 6);
    assert_eq!(api.calls(), 36);
    assert_eq!(store.rows(Dataset::LeagueTeamStats).await.len(), 1);
}

#[tokio::test]
async fn cloud_runs_rotate_through_the_pool() {
    let api = FakeApi::new(Behavior::Ok);
    let pool = proxy_pool();
    let tracker = Arc::new(ProxyHealthTracker::new(HealthPolicy {
        cooldown: Duration::ZERO,
        ..Default::default()
    }));
    let requests = RequestConfigBuilder::new(
        pool.clone(),
        Arc::new(HealthWeightedStrategy::new(tracker.clone())),
        RuntimeContext::cloud(),
    );

    let driver = IngestionDriver::new(
        requests,
        Arc::new(FixedWindowLimiter::new(10_000, Duration::from_secs(1))),
        api.clone(),
        Arc::new(MemoryStatStore::new()),
        options(),
    )
    .with_health_tracker(tracker.clone());

    let report = driver.run_ingestion(IngestMode::Daily).await.unwrap();
    assert!(report.is_clean());

    let urls: Vec<String> = pool.endpoints().iter().map(|e| e.url()).collect();
    for route in api.routes.lock().unwrap().iter() {
        let route = route.as_ref().expect("cloud requests use a proxy");
        assert!(urls.contains(route));
    }

    let health = tracker.snapshot(&pool);
    let uses: u64 = health.iter().map(|h| h.total_requests).sum();
    assert_eq!(uses, report.units_succeeded as u64);
    assert!(health.iter().all(|h| h.fails == 0));

    let rendered = serde_json::to_string(&report).unwrap();
    assert!(!rendered.contains(PROXY_PASSWORD));
}

#[tokio::test]
async fn forced_proxy_without_credentials_aborts() {
    let api = FakeApi::new(Behavior::Ok);
    let requests = RequestConfigBuilder::new(
        Arc::new(ProxyPool::empty()),
        Arc::new(RandomStrategy),
        RuntimeContext::local(),
    )
    .with_mode(ProxyMode::ForceProxy);

    let driver = IngestionDriver::new(
        requests,
        Arc::new(FixedWindowLimiter::default()),
        api.clone(),
        Arc::new(MemoryStatStore::new()),
        options(),
    );

    let err = driver.run_ingestion(IngestMode::Daily).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(api.calls(), 0);
}
