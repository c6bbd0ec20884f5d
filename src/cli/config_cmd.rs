//! Configuration management commands.

use console::style;

use crate::config::Config;

/// Print the effective configuration with secrets masked.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (no config file found)".to_string());
    eprintln!("{} Source: {}", style("→").dim(), source);
    eprintln!(
        "{} Database: {}",
        style("→").dim(),
        crate::repository::util::redact_url(&config.database_url())
    );

    let toml = config.redacted().to_toml().map_err(|e| anyhow::anyhow!(e))?;
    println!("{}", toml);
    Ok(())
}
