//! Diesel-backed stats store.
//!
//! Rows are upserted on `(dataset, natural_key)`, so re-running an ingestion
//! overwrites rather than duplicates.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use serde_json::{Map, Value};

use super::diesel_models::NewStatRow;
use super::pool::{DbError, DbPool, SqliteConn};
use super::{StatStore, StoreResult};
use crate::models::{Dataset, StatRow};
use crate::schema::stat_rows;
use crate::{with_conn, with_conn_split};

#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS stat_rows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        dataset TEXT NOT NULL,
        natural_key TEXT NOT NULL,
        season TEXT,
        payload TEXT NOT NULL,
        fetched_at TEXT NOT NULL,
        UNIQUE(dataset, natural_key)
    );
"#;

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS stat_rows (
        id SERIAL PRIMARY KEY,
        dataset TEXT NOT NULL,
        natural_key TEXT NOT NULL,
        season TEXT,
        payload TEXT NOT NULL,
        fetched_at TEXT NOT NULL,
        UNIQUE(dataset, natural_key)
    );
"#;

/// Stats store over SQLite or PostgreSQL.
#[derive(Clone)]
pub struct DieselStatStore {
    pool: DbPool,
}

impl DieselStatStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn from_url(database_url: &str) -> StoreResult<Self> {
        Ok(Self::new(DbPool::from_url(database_url)?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create the `stat_rows` table if it does not exist.
    pub async fn init_schema(&self) -> StoreResult<()> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                Self::init_sqlite_schema(&mut conn).await?;
                Ok(())
            },
            postgres: conn => {
                Self::init_postgres_schema(&mut conn).await?;
                Ok(())
            }
        )
    }

    async fn init_sqlite_schema(conn: &mut SqliteConn) -> Result<(), DbError> {
        conn.batch_execute(SQLITE_SCHEMA).await
    }

    #[cfg(feature = "postgres")]
    async fn init_postgres_schema(conn: &mut AsyncPgConnection) -> Result<(), DbError> {
        conn.batch_execute(POSTGRES_SCHEMA).await
    }

    /// Row count per dataset, ordered by dataset name.
    pub async fn dataset_counts(&self) -> StoreResult<Vec<(String, i64)>> {
        use diesel::dsl::count_star;

        with_conn!(self.pool, conn => {
            let counts = stat_rows::table
                .group_by(stat_rows::dataset)
                .select((stat_rows::dataset, count_star()))
                .order(stat_rows::dataset.asc())
                .load::<(String, i64)>(&mut conn)
                .await?;
            Ok(counts)
        })
    }
}

#[async_trait]
impl StatStore for DieselStatStore {
    async fn upsert_rows(&self, rows: &[StatRow]) -> StoreResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let fetched_at = Utc::now().to_rfc3339();
        let prepared = rows
            .iter()
            .map(|row| Ok((row.payload_json()?, row.season.map(|s| s.to_string()))))
            .collect::<Result<Vec<(String, Option<String>)>, serde_json::Error>>()?;

        with_conn!(self.pool, conn => {
            let mut written = 0;
            for (row, (payload, season)) in rows.iter().zip(&prepared) {
                written += diesel::insert_into(stat_rows::table)
                    .values(NewStatRow {
                        dataset: row.dataset.as_str(),
                        natural_key: &row.natural_key,
                        season: season.as_deref(),
                        payload,
                        fetched_at: &fetched_at,
                    })
                    .on_conflict((stat_rows::dataset, stat_rows::natural_key))
                    .do_update()
                    .set((
                        stat_rows::season.eq(excluded(stat_rows::season)),
                        stat_rows::payload.eq(excluded(stat_rows::payload)),
                        stat_rows::fetched_at.eq(excluded(stat_rows::fetched_at)),
                    ))
                    .execute(&mut conn)
                    .await?;
            }
            Ok(written)
        })
    }

    async fn count_rows(&self, dataset: Option<Dataset>) -> StoreResult<u64> {
        use diesel::dsl::count_star;

        with_conn!(self.pool, conn => {
            let count: i64 = match dataset {
                Some(dataset) => {
                    stat_rows::table
                        .filter(stat_rows::dataset.eq(dataset.as_str()))
                        .select(count_star())
                        .first(&mut conn)
                        .await?
                }
                None => stat_rows::table.select(count_star()).first(&mut conn).await?,
            };
            Ok(count.max(0) as u64)
        })
    }

    async fn get_payload(
        &self,
        dataset: Dataset,
        natural_key: &str,
    ) -> StoreResult<Option<Map<String, Value>>> {
        let payload: Option<String> = with_conn!(self.pool, conn => {
            stat_rows::table
                .filter(stat_rows::dataset.eq(dataset.as_str()))
                .filter(stat_rows::natural_key.eq(natural_key))
                .select(stat_rows::payload)
                .first::<String>(&mut conn)
                .await
                .optional()?
        });

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        self.pool.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Season;
    use serde_json::json;
    use tempfile::tempdir;

    async fn setup_store() -> (DieselStatStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("stats.db");
        let store = DieselStatStore::new(DbPool::sqlite_from_path(&db_path));
        store.init_schema().await.unwrap();
        (store, dir)
    }

    fn row(key: &str, pts: f64) -> StatRow {
        StatRow {
            dataset: Dataset::LeaguePlayerStats,
            natural_key: key.to_string(),
            season: Some(Season::new(2024)),
            payload: json!({"PLAYER_ID": 1, "PTS": pts})
                .as_object()
                .unwrap()
                .clone(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_on_natural_key() {
        let (store, _dir) = setup_store().await;

        store
            .upsert_rows(&[row("2024-25:1", 20.5), row("2024-25:2", 11.0)])
            .await
            .unwrap();
        store.upsert_rows(&[row("2024-25:1", 27.1)]).await.unwrap();

        assert_eq!(store.count_rows(None).await.unwrap(), 2);
        let payload = store
            .get_payload(Dataset::LeaguePlayerStats, "2024-25:1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload["PTS"], json!(27.1));
    }

    #[tokio::test]
    async fn test_counts_per_dataset() {
        let (store, _dir) = setup_store().await;
        let mut team = row("2024-25:1610612747", 0.0);
        team.dataset = Dataset::LeagueTeamStats;

        store
            .upsert_rows(&[row("2024-25:1", 1.0), team])
            .await
            .unwrap();

        assert_eq!(
            store
                .count_rows(Some(Dataset::LeagueTeamStats))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.count_rows(Some(Dataset::Players)).await.unwrap(), 0);

        let counts = store.dataset_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                ("league-player-stats".to_string(), 1),
                ("league-team-stats".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let (store, _dir) = setup_store().await;
        store.init_schema().await.unwrap();
        assert_eq!(store.count_rows(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_payload_is_none() {
        let (store, _dir) = setup_store().await;
        assert!(store
            .get_payload(Dataset::Players, "nobody")
            .await
            .unwrap()
            .is_none());
    }
}
