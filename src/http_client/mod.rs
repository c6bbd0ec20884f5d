//! HTTP client for the stats API.
//!
//! One `reqwest::Client` is kept per route (direct, or one per proxy URL)
//! so connection pools are reused across calls through the same endpoint.

mod headers;
mod request_config;

pub use headers::{browser_headers, minimal_headers, random_user_agent, IMPERSONATE_USER_AGENTS};
pub use request_config::{RequestConfig, RequestConfigBuilder, Timeouts};

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::{Client, Proxy};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{IngestError, IngestResult};
use crate::rate_limit::parse_retry_after;

/// Public stats API root.
pub const STATS_BASE_URL: &str = "https://stats.nba.com/stats";

/// Outcome of a connectivity probe.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub elapsed_ms: u128,
    pub body: String,
}

/// Thin wrapper over reqwest that applies a [`RequestConfig`] per call.
pub struct StatsClient {
    base_url: String,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl StatsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client_for(&self, config: &RequestConfig) -> IngestResult<Client> {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(&config.proxy_url) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder().gzip(true).brotli(true).cookie_store(true);
        if let Some(url) = &config.proxy_url {
            let proxy = Proxy::all(url)
                .map_err(|e| IngestError::configuration(format!("invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| IngestError::configuration(format!("failed to build HTTP client: {}", e)))?;

        clients.insert(config.proxy_url.clone(), client.clone());
        Ok(client)
    }

    fn request(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> IngestResult<reqwest::RequestBuilder> {
        let client = self.client_for(config)?;
        let mut request = client.get(url).timeout(config.timeout);
        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        Ok(request)
    }

    /// GET `{base}/{endpoint}` with query parameters and decode the JSON body.
    pub async fn fetch_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        config: &RequestConfig,
    ) -> IngestResult<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} via {}", url, config.route());

        let response = self.request(&url, config)?.query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            if let Some(wait) = parse_retry_after(
                response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok()),
            ) {
                warn!(
                    "{} returned {} with Retry-After {}s",
                    endpoint,
                    status.as_u16(),
                    wait.as_secs()
                );
            }
            return Err(IngestError::from_status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }

    /// GET an arbitrary URL and return status and body; used to test proxies.
    pub async fn probe(&self, url: &str, config: &RequestConfig) -> IngestResult<ProbeResponse> {
        let start = std::time::Instant::now();
        let response = self.request(url, config)?.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ProbeResponse {
            status,
            elapsed_ms: start.elapsed().as_millis(),
            body,
        })
    }
}

impl Default for StatsClient {
    fn default() -> Self {
        Self::new(STATS_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn direct() -> RequestConfig {
        RequestConfig {
            headers: minimal_headers(),
            proxy_url: None,
            proxy_label: None,
            timeout: Duration::from_secs(5),
            force_local: true,
            force_proxy: false,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = StatsClient::new("https://example.test/stats/");
        assert_eq!(client.base_url(), "https://example.test/stats");
    }

    #[test]
    fn test_clients_cached_per_route() {
        let client = StatsClient::default();
        client.client_for(&direct()).unwrap();
        client.client_for(&direct()).unwrap();

        let mut proxied = direct();
        proxied.proxy_url = Some("http://u:p@127.0.0.1:10001".into());
        client.client_for(&proxied).unwrap();

        assert_eq!(client.clients.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_bad_proxy_url_is_configuration_error() {
        let client = StatsClient::default();
        let mut config = direct();
        config.proxy_url = Some("::not a url::".into());
        let err = client.client_for(&config).unwrap_err();
        assert!(err.is_fatal());
    }
}
