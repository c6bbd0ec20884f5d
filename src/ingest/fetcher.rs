use async_trait::async_trait;
use serde_json::Value;

use crate::error::IngestResult;
use crate::http_client::{RequestConfig, StatsClient};

/// Source of raw stats API responses.
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        config: &RequestConfig,
    ) -> IngestResult<Value>;
}

#[async_trait]
impl StatsFetcher for StatsClient {
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        config: &RequestConfig,
    ) -> IngestResult<Value> {
        self.fetch_json(endpoint, params, config).await
    }
}
