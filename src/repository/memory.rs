//! In-memory stats store for dry runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{StatStore, StoreResult};
use crate::models::{Dataset, StatRow};

/// Keeps the latest row per `(dataset, natural_key)`; nothing is persisted.
#[derive(Default)]
pub struct MemoryStatStore {
    rows: RwLock<BTreeMap<(Dataset, String), StatRow>>,
}

impl MemoryStatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored rows of one dataset, ordered by key.
    pub async fn rows(&self, dataset: Dataset) -> Vec<StatRow> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|((d, _), _)| *d == dataset)
            .map(|(_, row)| row.clone())
            .collect()
    }
}

#[async_trait]
impl StatStore for MemoryStatStore {
    async fn upsert_rows(&self, rows: &[StatRow]) -> StoreResult<usize> {
        let mut stored = self.rows.write().await;
        for row in rows {
            stored.insert((row.dataset, row.natural_key.clone()), row.clone());
        }
        Ok(rows.len())
    }

    async fn count_rows(&self, dataset: Option<Dataset>) -> StoreResult<u64> {
        let stored = self.rows.read().await;
        let count = match dataset {
            Some(dataset) => stored.keys().filter(|(d, _)| *d == dataset).count(),
            None => stored.len(),
        };
        Ok(count as u64)
    }

    async fn get_payload(
        &self,
        dataset: Dataset,
        natural_key: &str,
    ) -> StoreResult<Option<Map<String, Value>>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(dataset, natural_key.to_string()))
            .map(|row| row.payload.clone()))
    }

    fn describe(&self) -> String {
        "memory (dry run)".to_string()
    }
}
