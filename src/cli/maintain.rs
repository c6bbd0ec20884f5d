//! Maintenance command.

use console::style;

use super::helpers::open_store;
use crate::config::Config;
use crate::models::Season;
use crate::repository::MaintenanceReport;

pub async fn cmd_maintain(config: &Config, keep_seasons: Option<usize>) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let keep = keep_seasons.unwrap_or(config.maintenance.keep_seasons);

    let report = store.run_maintenance(keep, Season::current()).await?;
    print_maintenance_report(&report);

    for (dataset, count) in store.dataset_counts().await? {
        println!("  {:<22} {:>10}", dataset, count);
    }
    Ok(())
}

pub fn print_maintenance_report(report: &MaintenanceReport) {
    let oldest = report
        .seasons_kept
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default();
    println!(
        "{} Maintenance done in {:.1}s",
        style("✓").green(),
        report.elapsed.as_secs_f64()
    );
    println!(
        "  {} {} duplicates removed, {} rows before {} pruned, {} rows remain",
        style("→").dim(),
        report.duplicates_removed,
        report.rows_pruned,
        oldest,
        report.rows_remaining
    );
}
