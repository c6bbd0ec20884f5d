//! Outcome of an ingestion run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use super::plan::{IngestMode, WorkUnit};
use crate::error::{ErrorCategory, IngestError};

/// A unit that did not make it into the store.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    pub category: ErrorCategory,
    pub message: String,
    pub attempts: u32,
}

/// Counts and failures for one run. Failures are never dropped.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub mode: IngestMode,
    pub units_planned: usize,
    pub units_succeeded: usize,
    pub units_failed: usize,
    pub retries: u32,
    pub retries_by_category: BTreeMap<ErrorCategory, u32>,
    pub rows_fetched: usize,
    pub rows_written: usize,
    pub failures_by_category: BTreeMap<ErrorCategory, usize>,
    pub failures: Vec<UnitFailure>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl IngestionReport {
    pub fn new(mode: IngestMode) -> Self {
        Self {
            mode,
            units_planned: 0,
            units_succeeded: 0,
            units_failed: 0,
            retries: 0,
            retries_by_category: BTreeMap::new(),
            rows_fetched: 0,
            rows_written: 0,
            failures_by_category: BTreeMap::new(),
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// `retried` holds the category of every error that was retried.
    pub fn record_success(&mut self, fetched: usize, written: usize, retried: &[ErrorCategory]) {
        self.units_succeeded += 1;
        self.rows_fetched += fetched;
        self.rows_written += written;
        self.record_retries(retried);
    }

    pub fn record_failure(
        &mut self,
        unit: &WorkUnit,
        error: &IngestError,
        attempts: u32,
        retried: &[ErrorCategory],
    ) {
        let category = error.category();
        self.units_failed += 1;
        self.record_retries(retried);
        *self.failures_by_category.entry(category).or_default() += 1;
        self.failures.push(UnitFailure {
            unit: unit.label(),
            category,
            message: error.to_string(),
            attempts,
        });
    }

    fn record_retries(&mut self, retried: &[ErrorCategory]) {
        for category in retried {
            self.retries += 1;
            *self.retries_by_category.entry(*category).or_default() += 1;
        }
    }

    pub fn errors(&self) -> usize {
        self.units_failed
    }

    pub fn is_clean(&self) -> bool {
        self.units_failed == 0
    }
}

impl std::fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} ingestion: {}/{} units ok, {} failed, {} retries",
            self.mode, self.units_succeeded, self.units_planned, self.units_failed, self.retries
        )?;
        write!(
            f,
            "rows fetched {}, written {} in {:.1}s",
            self.rows_fetched,
            self.rows_written,
            self.elapsed.as_secs_f64()
        )?;
        for (category, count) in &self.failures_by_category {
            write!(f, "\n  {}: {}", category, count)?;
        }
        for (category, count) in &self.retries_by_category {
            write!(f, "\n  {} retried: {}", category, count)?;
        }
        Ok(())
    }
}
