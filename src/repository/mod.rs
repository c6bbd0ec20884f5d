//! Persistence for ingested stats rows.
//!
//! [`DieselStatStore`] writes to SQLite (default) or PostgreSQL through
//! diesel-async; [`MemoryStatStore`] backs dry runs.

mod diesel_models;
pub mod maintenance;
mod memory;
pub mod pool;
mod stats;
pub mod util;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::models::{Dataset, StatRow};

pub use maintenance::MaintenanceReport;
pub use memory::MemoryStatStore;
pub use pool::{DbError, DbPool};
pub use stats::DieselStatStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the stats store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Upsert-capable sink for normalized rows.
#[async_trait]
pub trait StatStore: Send + Sync {
    /// Insert or overwrite rows by `(dataset, natural_key)`. Returns rows written.
    async fn upsert_rows(&self, rows: &[StatRow]) -> StoreResult<usize>;

    async fn count_rows(&self, dataset: Option<Dataset>) -> StoreResult<u64>;

    async fn get_payload(
        &self,
        dataset: Dataset,
        natural_key: &str,
    ) -> StoreResult<Option<Map<String, Value>>>;

    /// Backend description for logs.
    fn describe(&self) -> String;
}
