//! Initialize command.

use console::style;

use super::helpers::open_store;
use crate::config::Config;
use crate::repository::StatStore;

/// Create the database and its tables.
pub async fn cmd_init(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    store.ensure_indexes().await?;

    let rows = store.count_rows(None).await?;
    println!(
        "{} Initialized hoopsync database: {}",
        style("✓").green(),
        store.describe()
    );
    if rows > 0 {
        println!("  {} {} rows already stored", style("→").dim(), rows);
    }

    if config.source_path.is_none() {
        println!(
            "{} No config file found, using defaults",
            style("!").yellow()
        );
        println!("  Create hoopsync.toml to set proxy credentials and limits");
    }

    Ok(())
}
