//! Ingest command.

use std::sync::Arc;

use console::{style, Term};
use serde::Serialize;

use super::helpers::{build_routing, open_store};
use super::maintain::print_maintenance_report;
use crate::config::Config;
use crate::http_client::StatsClient;
use crate::ingest::{IngestMode, IngestionDriver, IngestionReport};
use crate::models::Season;
use crate::rate_limit::build_gate;
use crate::repository::{MaintenanceReport, MemoryStatStore, StatStore};

/// Failures listed individually before the rest are summarized.
const MAX_LISTED_FAILURES: usize = 20;

pub struct IngestArgs {
    pub dry_run: bool,
    pub maintain: bool,
    pub workers: Option<usize>,
    pub limit: Option<usize>,
    pub json: bool,
}

pub async fn cmd_ingest(config: &Config, mode: IngestMode, args: IngestArgs) -> anyhow::Result<()> {
    let routing = build_routing(config)?;
    let gate = build_gate(&config.rate_limit).await?;
    let client = Arc::new(StatsClient::new(config.request.base_url.clone()));

    let mut options = config.ingest_options();
    if let Some(workers) = args.workers {
        options.workers = workers;
    }
    if let Some(limit) = args.limit {
        options.max_players = limit;
    }
    options.show_progress = !args.json && Term::stderr().is_term();

    let diesel_store = if args.dry_run {
        None
    } else {
        Some(Arc::new(open_store(config).await?))
    };
    let store: Arc<dyn StatStore> = match &diesel_store {
        Some(store) => store.clone(),
        None => Arc::new(MemoryStatStore::new()),
    };

    if !args.json {
        println!(
            "{} {} ingestion via {} route, {} ({} proxies)",
            style("→").cyan(),
            mode,
            routing.requests.mode(),
            if routing.context.is_cloud { "cloud" } else { "local" },
            routing.pool.len()
        );
        if args.dry_run {
            println!("  {} dry run, nothing will be written", style("!").yellow());
        }
    }

    let driver = IngestionDriver::new(routing.requests, gate, client, store, options)
        .with_health_tracker(routing.health);
    let report = driver.run_ingestion(mode).await?;

    let maintenance = match (&diesel_store, args.maintain) {
        (Some(store), true) => Some(
            store
                .run_maintenance(config.maintenance.keep_seasons, Season::current())
                .await?,
        ),
        (None, true) => {
            eprintln!("{} Skipping maintenance on a dry run", style("!").yellow());
            None
        }
        _ => None,
    };

    if args.json {
        println!("{}", render_json(&report, maintenance.as_ref())?);
    } else {
        print_report(&report);
        if let Some(maintenance) = &maintenance {
            print_maintenance_report(maintenance);
        }
    }

    if report.units_succeeded == 0 && report.units_failed > 0 {
        anyhow::bail!("every unit of work failed");
    }
    Ok(())
}

/// `--json` output: the ingestion report, plus maintenance when it ran.
#[derive(Serialize)]
struct IngestOutput<'a> {
    #[serde(flatten)]
    report: &'a IngestionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    maintenance: Option<&'a MaintenanceReport>,
}

fn render_json(
    report: &IngestionReport,
    maintenance: Option<&MaintenanceReport>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&IngestOutput {
        report,
        maintenance,
    })
}

fn print_report(report: &IngestionReport) {
    let mark = if report.is_clean() {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    println!(
        "{} {}/{} units ok, {} failed, {} retries in {:.1}s",
        mark,
        report.units_succeeded,
        report.units_planned,
        report.units_failed,
        report.retries,
        report.elapsed.as_secs_f64()
    );
    println!(
        "  {} rows fetched {}, written {}",
        style("→").dim(),
        report.rows_fetched,
        report.rows_written
    );

    for (category, count) in &report.retries_by_category {
        println!("  {} {} retried: {}", style("↻").dim(), category, count);
    }
    for (category, count) in &report.failures_by_category {
        println!("  {} {}: {}", style("✗").red(), category, count);
    }
    for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
        println!(
            "    {} ({} attempts): {}",
            failure.unit,
            failure.attempts,
            style(&failure.message).dim()
        );
    }
    if report.failures.len() > MAX_LISTED_FAILURES {
        println!(
            "    ... and {} more",
            report.failures.len() - MAX_LISTED_FAILURES
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, IngestError};
    use crate::ingest::WorkUnit;
    use crate::models::Dataset;
    use serde_json::{json, Value};

    fn report() -> IngestionReport {
        let mut report = IngestionReport::new(IngestMode::Daily);
        report.units_planned = 2;
        report.record_success(3, 3, &[ErrorCategory::TransientNetwork]);
        let unit = WorkUnit::new(Dataset::Players, None, None);
        report.record_failure(&unit, &IngestError::data_shape("no rowSet"), 1, &[]);
        report
    }

    #[test]
    fn test_json_without_maintenance() {
        let rendered: Value = serde_json::from_str(&render_json(&report(), None).unwrap()).unwrap();
        assert_eq!(rendered["units_planned"], json!(2));
        assert_eq!(rendered["retries_by_category"]["transient-network"], json!(1));
        assert!(rendered.get("maintenance").is_none());
    }

    #[test]
    fn test_json_includes_maintenance() {
        let maintenance = MaintenanceReport {
            duplicates_removed: 4,
            rows_pruned: 10,
            rows_remaining: 90,
            ..Default::default()
        };
        let text = render_json(&report(), Some(&maintenance)).unwrap();
        let rendered: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(rendered["failures_by_category"]["data-shape"], json!(1));
        assert_eq!(rendered["maintenance"]["duplicates_removed"], json!(4));
        assert_eq!(rendered["maintenance"]["rows_remaining"], json!(90));
    }
}
