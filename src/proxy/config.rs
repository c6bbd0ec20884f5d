//! Proxy settings: credentials, port range, routing flags and health policy.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::health::HealthPolicy;
use super::mode::{parse_flag, ProxyMode};
use super::pool::{build_proxy_list, PoolSpec, ProxyCredentials, ProxyPool};
use super::selection::SelectionStrategyType;
use crate::error::IngestResult;

const DEFAULT_HOST: &str = "gate.smartproxy.com";
const DEFAULT_PORT_START: u16 = 10001;
const DEFAULT_PORT_END: u16 = 10010;

/// `[proxy]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Route through the pool even outside the cloud (`PROXY_ENABLED`).
    pub enabled: bool,

    /// Startup override: always connect directly (`FORCE_LOCAL`, `--local`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_local: Option<bool>,

    /// Startup override: always use the pool (`FORCE_PROXY`, `--proxy`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_proxy: Option<bool>,

    pub scheme: String,
    pub host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    pub port_start: u16,
    pub port_end: u16,

    pub strategy: SelectionStrategyType,

    // Health thresholds (used by the health-weighted strategy)
    pub max_fails: u32,
    pub max_consecutive_fails: u32,
    pub max_daily_requests: u32,
    pub cooldown_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let policy = HealthPolicy::default();
        Self {
            enabled: false,
            force_local: None,
            force_proxy: None,
            scheme: "https".to_string(),
            host: DEFAULT_HOST.to_string(),
            username: None,
            password: None,
            port_start: DEFAULT_PORT_START,
            port_end: DEFAULT_PORT_END,
            strategy: SelectionStrategyType::default(),
            max_fails: policy.max_fails,
            max_consecutive_fails: policy.max_consecutive_fails,
            max_daily_requests: policy.max_daily_requests,
            cooldown_secs: policy.cooldown.as_secs(),
        }
    }
}

impl ProxyConfig {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(enabled) = parse_flag(env::var("PROXY_ENABLED").ok().as_deref()) {
            self.enabled = enabled;
        }
        if let Some(local) = parse_flag(env::var("FORCE_LOCAL").ok().as_deref()) {
            self.force_local = Some(local);
        }
        if let Some(proxy) = parse_flag(env::var("FORCE_PROXY").ok().as_deref()) {
            self.force_proxy = Some(proxy);
        }

        if let Ok(username) = env::var("PROXY_USERNAME") {
            if !username.is_empty() {
                self.username = Some(username);
            }
        }
        if let Ok(password) = env::var("PROXY_PASSWORD") {
            if !password.is_empty() {
                self.password = Some(password);
            }
        }
        if let Ok(host) = env::var("PROXY_HOST") {
            if !host.is_empty() {
                self.host = host;
            }
        }

        if let Some(port) = env::var("PROXY_PORT_START")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.port_start = port;
        }
        if let Some(port) = env::var("PROXY_PORT_END").ok().and_then(|v| v.parse().ok()) {
            self.port_end = port;
        }

        if let Some(strategy) = env::var("PROXY_STRATEGY")
            .ok()
            .and_then(|v| SelectionStrategyType::from_str(&v))
        {
            self.strategy = strategy;
        }

        self
    }

    /// Apply CLI flag overrides (`--proxy`, `--local`).
    ///
    /// A single flag also clears the opposite environment flag.
    pub fn with_cli_overrides(mut self, proxy: bool, local: bool) -> Self {
        match (proxy, local) {
            (true, true) => {
                self.force_proxy = Some(true);
                self.force_local = Some(true);
            }
            (true, false) => {
                self.force_proxy = Some(true);
                self.force_local = Some(false);
            }
            (false, true) => {
                self.force_proxy = Some(false);
                self.force_local = Some(true);
            }
            (false, false) => {}
        }
        self
    }

    /// Routing mode resolved from the two force flags.
    pub fn mode(&self) -> ProxyMode {
        ProxyMode::from_flags(self.force_local, self.force_proxy)
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    pub fn pool_spec(&self) -> PoolSpec {
        PoolSpec {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            credentials: ProxyCredentials {
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
            },
            port_start: self.port_start,
            port_end: self.port_end,
        }
    }

    /// Build the pool, or an empty one when no credentials are configured.
    ///
    /// Partially configured credentials are a configuration error.
    pub fn build_pool(&self) -> IngestResult<ProxyPool> {
        if !self.has_credentials() {
            debug!("No proxy credentials configured; proxy pool is empty");
            return Ok(ProxyPool::empty());
        }
        build_proxy_list(&self.pool_spec())
    }

    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy {
            max_fails: self.max_fails,
            max_consecutive_fails: self.max_consecutive_fails,
            max_daily_requests: self.max_daily_requests,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }

    /// Copy safe to print: the password is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.password.is_some() {
            copy.password = Some("********".to_string());
        }
        copy
    }
}
