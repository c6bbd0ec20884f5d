//! Database connection pool supporting SQLite and PostgreSQL.
//!
//! The backend is picked from the database URL at runtime. SQLite is the
//! default; PostgreSQL needs the `postgres` feature.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Async PostgreSQL connection type.
#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Applied to every new SQLite connection. Workers write concurrently, so
/// writers wait on the lock instead of failing with SQLITE_BUSY.
const SQLITE_PRAGMAS: &str = "PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;";

/// SQLite "pool" that opens a connection per checkout.
#[derive(Clone)]
pub struct SqlitePool {
    database_url: String,
}

impl SqlitePool {
    pub fn new(database_url: &str) -> Self {
        // Strip sqlite: prefix if present
        let url = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(SQLITE_PRAGMAS).await?;
        Ok(conn)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// PostgreSQL connection pool.
#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgPool {
    pool: DeadPool<AsyncPgConnection>,
    database_url: String,
}

#[cfg(feature = "postgres")]
impl PgPool {
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, DbError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = DeadPool::builder(config)
            .max_size(max_size)
            .build()
            .map_err(to_diesel_error)?;
        Ok(Self {
            pool,
            database_url: database_url.to_string(),
        })
    }

    pub async fn get(&self) -> Result<PgConn, DbError> {
        self.pool.get().await.map_err(to_diesel_error)
    }
}

/// Database pool for whichever backend the URL names.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl DbPool {
    /// Create a pool from a database URL.
    ///
    /// - `postgres://` or `postgresql://` → PostgreSQL
    /// - Everything else → SQLite file path
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            #[cfg(feature = "postgres")]
            return Ok(DbPool::Postgres(PgPool::new(url, 10)?));

            #[cfg(not(feature = "postgres"))]
            return Err(to_diesel_error(
                "PostgreSQL URLs require building with the postgres feature",
            ));
        }

        Ok(DbPool::Sqlite(SqlitePool::new(url)))
    }

    pub fn sqlite_from_path(path: &Path) -> Self {
        DbPool::Sqlite(SqlitePool::from_path(path))
    }

    pub fn is_sqlite(&self) -> bool {
        matches!(self, DbPool::Sqlite(_))
    }

    #[cfg(feature = "postgres")]
    pub fn is_postgres(&self) -> bool {
        matches!(self, DbPool::Postgres(_))
    }

    /// Backend and location, with any password masked.
    pub fn describe(&self) -> String {
        match self {
            DbPool::Sqlite(pool) => format!("sqlite ({})", pool.database_url()),
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => format!(
                "postgres ({})",
                super::util::redact_url(&pool.database_url)
            ),
        }
    }
}

/// Run the same Diesel code on either backend.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn => {
///     stat_rows::table.count().get_result::<i64>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
        }
    }};
}

/// Run backend-specific code when the SQL differs between SQLite and PostgreSQL.
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $sqlite_conn = pool.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $pg_conn = pool.get().await?;
                $pg_body
            }
        }
    }};
}
