//! Post-ingest cleanup: duplicates, old seasons, indexes, planner stats.

use std::time::{Duration, Instant};

use diesel::prelude::*;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use serde::Serialize;
use tracing::{info, warn};

use super::stats::DieselStatStore;
use super::{StatStore, StoreResult};
use crate::models::Season;
use crate::schema::stat_rows;
use crate::with_conn;

const INDEX_STATEMENTS: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_stat_rows_key ON stat_rows(dataset, natural_key);
    CREATE INDEX IF NOT EXISTS idx_stat_rows_season ON stat_rows(dataset, season);
    CREATE INDEX IF NOT EXISTS idx_stat_rows_fetched_at ON stat_rows(fetched_at);
"#;

/// What a maintenance pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub duplicates_removed: usize,
    pub rows_pruned: usize,
    pub seasons_kept: Vec<Season>,
    pub rows_remaining: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl DieselStatStore {
    /// Delete all but the newest row per `(dataset, natural_key)`.
    pub async fn remove_duplicates(&self) -> StoreResult<usize> {
        with_conn!(self.pool(), conn => {
            let removed = diesel::sql_query(
                "DELETE FROM stat_rows WHERE id NOT IN \
                 (SELECT MAX(id) FROM stat_rows GROUP BY dataset, natural_key)",
            )
            .execute(&mut conn)
            .await?;
            Ok(removed)
        })
    }

    /// Delete seasonal rows whose season is not in `keep`.
    ///
    /// Rows without a season (player index, career totals) are never pruned.
    /// An empty keep list is a no-op.
    pub async fn prune_seasons(&self, keep: &[Season]) -> StoreResult<usize> {
        if keep.is_empty() {
            warn!("Refusing to prune with an empty season list");
            return Ok(0);
        }
        let keep: Vec<String> = keep.iter().map(|s| s.to_string()).collect();

        with_conn!(self.pool(), conn => {
            let pruned = diesel::delete(
                stat_rows::table
                    .filter(stat_rows::season.is_not_null())
                    .filter(stat_rows::season.ne_all(keep)),
            )
            .execute(&mut conn)
            .await?;
            Ok(pruned)
        })
    }

    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        with_conn!(self.pool(), conn => {
            conn.batch_execute(INDEX_STATEMENTS).await?;
            Ok(())
        })
    }

    /// Refresh query planner statistics.
    pub async fn analyze(&self) -> StoreResult<()> {
        with_conn!(self.pool(), conn => {
            conn.batch_execute("ANALYZE stat_rows").await?;
            Ok(())
        })
    }

    /// Full pass, keeping the `keep_seasons` seasons ending at `current`.
    pub async fn run_maintenance(
        &self,
        keep_seasons: usize,
        current: Season,
    ) -> StoreResult<MaintenanceReport> {
        let start = Instant::now();
        let seasons_kept = current.recent(keep_seasons);

        let duplicates_removed = self.remove_duplicates().await?;
        info!("Removed {} duplicate rows", duplicates_removed);

        let rows_pruned = self.prune_seasons(&seasons_kept).await?;
        info!(
            "Pruned {} rows outside {} kept seasons",
            rows_pruned,
            seasons_kept.len()
        );

        self.ensure_indexes().await?;
        self.analyze().await?;

        let rows_remaining = self.count_rows(None).await?;

        Ok(MaintenanceReport {
            duplicates_removed,
            rows_pruned,
            seasons_kept,
            rows_remaining,
            elapsed: start.elapsed(),
        })
    }
}
