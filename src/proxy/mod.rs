//! Proxy pool management for outbound stats API requests.
//!
//! Requests either go straight to the API or through one endpoint of a
//! rotating pool of authenticated forward proxies. The decision is made per
//! call from the startup [`ProxyMode`] and the injected [`RuntimeContext`].
//!
//! # Configuration
//!
//! - `PROXY_USERNAME` / `PROXY_PASSWORD` / `PROXY_HOST` - pool credentials
//! - `PROXY_PORT_START` / `PROXY_PORT_END` - inclusive port range, one endpoint per port
//! - `PROXY_ENABLED=1` - use the pool even when running locally
//! - `FORCE_LOCAL=1` / `--local` - never use the pool
//! - `FORCE_PROXY=1` / `--proxy` - always use the pool (wins over `FORCE_LOCAL`)
//! - `PROXY_STRATEGY` - `random` (default), `round-robin` or `health-weighted`

mod config;
pub mod health;
mod mode;
pub mod pool;
pub mod selection;

pub use config::ProxyConfig;
pub use health::{EndpointHealth, HealthPolicy, ProxyHealthTracker};
pub use mode::{is_cloud_environment, parse_flag, ProxyMode, RuntimeContext};
pub use pool::{
    build_proxy_list, select_proxy, PoolSpec, ProxyCredentials, ProxyEndpoint, ProxyPool,
};
pub use selection::{
    HealthWeightedStrategy, ProxySelectionStrategy, RandomStrategy, RoundRobinStrategy,
    SelectionStrategyType,
};
