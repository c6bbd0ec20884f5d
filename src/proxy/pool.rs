//! Proxy endpoints and the read-only pool built from credentials.

use crate::error::{IngestError, IngestResult};

use super::selection::ProxySelectionStrategy;

/// Username/password pair for an authenticated forward proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to build a pool: credentials plus a port range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSpec {
    pub scheme: String,
    pub host: String,
    pub credentials: ProxyCredentials,
    /// Inclusive.
    pub port_start: u16,
    /// Inclusive.
    pub port_end: u16,
}

/// One authenticated proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    scheme: String,
    host: String,
    port: u16,
    credentials: ProxyCredentials,
}

impl ProxyEndpoint {
    pub fn new(scheme: &str, host: &str, port: u16, credentials: ProxyCredentials) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            credentials,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Full proxy URL including credentials. Never log this.
    pub fn url(&self) -> String {
        let base = format!("{}://{}:{}", self.scheme, self.host, self.port);
        let Ok(mut url) = url::Url::parse(&base) else {
            return base;
        };
        // Userinfo setters percent-encode reserved characters
        if url.set_username(&self.credentials.username).is_err()
            || url.set_password(Some(&self.credentials.password)).is_err()
        {
            return base;
        }
        url.as_str().trim_end_matches('/').to_string()
    }

    /// `host:port`, safe for logs and health bookkeeping.
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ordered, immutable set of proxy endpoints. Insertion order is rotation order.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
}

impl ProxyPool {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_endpoints(endpoints: Vec<ProxyEndpoint>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }

    pub fn get(&self, idx: usize) -> Option<&ProxyEndpoint> {
        self.endpoints.get(idx)
    }
}

/// Build one endpoint per port in the inclusive range.
pub fn build_proxy_list(spec: &PoolSpec) -> IngestResult<ProxyPool> {
    if spec.host.trim().is_empty() {
        return Err(IngestError::configuration("proxy host is empty"));
    }
    if spec.credentials.username.is_empty() || spec.credentials.password.is_empty() {
        return Err(IngestError::configuration(
            "proxy username and password are required",
        ));
    }
    if spec.port_start > spec.port_end {
        return Err(IngestError::configuration(format!(
            "proxy port range is inverted ({} > {})",
            spec.port_start, spec.port_end
        )));
    }

    let endpoints = (spec.port_start..=spec.port_end)
        .map(|port| ProxyEndpoint::new(&spec.scheme, &spec.host, port, spec.credentials.clone()))
        .collect();

    Ok(ProxyPool::from_endpoints(endpoints))
}

/// Pick one endpoint from the pool using the given strategy.
pub fn select_proxy<'a>(
    pool: &'a ProxyPool,
    strategy: &dyn ProxySelectionStrategy,
) -> IngestResult<&'a ProxyEndpoint> {
    if pool.is_empty() {
        return Err(IngestError::configuration(
            "proxy pool is empty (are proxy credentials configured?)",
        ));
    }

    let idx = strategy.select(pool).ok_or_else(|| {
        IngestError::configuration("proxy selection strategy returned no endpoint")
    })?;

    pool.get(idx)
        .ok_or_else(|| IngestError::configuration(format!("proxy index {} out of range", idx)))
}
