//! Shared helper functions for CLI commands.

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::http_client::RequestConfigBuilder;
use crate::proxy::{ProxyHealthTracker, ProxyMode, ProxyPool, ProxySelectionStrategy, RuntimeContext};
use crate::repository::DieselStatStore;

/// Everything needed to route requests, built once per command.
pub struct Routing {
    pub context: RuntimeContext,
    pub pool: Arc<ProxyPool>,
    pub health: Arc<ProxyHealthTracker>,
    pub requests: RequestConfigBuilder,
}

pub fn build_routing(config: &Config) -> anyhow::Result<Routing> {
    let context = RuntimeContext::detect();
    let mode = config.proxy.mode();
    let pool = Arc::new(config.proxy.build_pool()?);
    let health = Arc::new(ProxyHealthTracker::new(config.proxy.health_policy()));
    let strategy: Arc<dyn ProxySelectionStrategy> =
        Arc::from(config.proxy.strategy.create_strategy(health.clone()));

    let wants_proxy = match mode {
        ProxyMode::ForceProxy => true,
        ProxyMode::ForceLocal => false,
        ProxyMode::Auto => context.is_cloud || config.proxy.enabled,
    };
    if wants_proxy && pool.is_empty() {
        warn!("Proxy routing selected but no proxy credentials are configured");
    }

    let requests = RequestConfigBuilder::new(pool.clone(), strategy, context)
        .with_mode(mode)
        .with_proxy_enabled(config.proxy.enabled)
        .with_timeouts(config.request.timeouts());

    Ok(Routing {
        context,
        pool,
        health,
        requests,
    })
}

/// Open the configured database and make sure the table exists.
pub async fn open_store(config: &Config) -> anyhow::Result<DieselStatStore> {
    config.ensure_database_dir()?;
    let store = DieselStatStore::from_url(&config.database_url())?;
    store.init_schema().await?;
    Ok(store)
}
