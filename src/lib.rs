//! hoopsync - NBA statistics ingestion.
//!
//! Fetches player and team statistics from the stats API, optionally through
//! a rotating pool of authenticated proxies, under a shared fixed-window rate
//! limit, and upserts the rows into SQLite or PostgreSQL.

pub mod cli;
pub mod config;
pub mod error;
pub mod http_client;
pub mod ingest;
pub mod models;
pub mod proxy;
pub mod rate_limit;
pub mod repository;
pub mod schema;

pub use error::{ErrorCategory, IngestError, IngestResult};
