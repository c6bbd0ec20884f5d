//! Proxy pool inspection and connectivity checks.

use console::style;

use super::helpers::build_routing;
use crate::config::Config;
use crate::http_client::{browser_headers, RequestConfig, StatsClient};
use crate::ingest::plan::LEAGUE_ID;

/// Print the routing decision and the pool endpoints (never credentials).
pub fn cmd_proxy_list(config: &Config) -> anyhow::Result<()> {
    let routing = build_routing(config)?;

    println!(
        "{} Mode: {}  Environment: {}  Strategy: {}",
        style("→").cyan(),
        routing.requests.mode(),
        if routing.context.is_cloud { "cloud" } else { "local" },
        config.proxy.strategy
    );

    if routing.pool.is_empty() {
        println!(
            "{} No proxy endpoints (set PROXY_USERNAME and PROXY_PASSWORD)",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("  {} endpoints:", routing.pool.len());
    for endpoint in routing.pool.endpoints() {
        println!("    {}", endpoint.label());
    }
    Ok(())
}

/// Send a test request the way an ingestion would.
///
/// Without `--url` this asks the stats API for today's scoreboard.
pub async fn cmd_proxy_check(config: &Config, url: Option<&str>, all: bool) -> anyhow::Result<()> {
    let routing = build_routing(config)?;
    let client = StatsClient::new(config.request.base_url.clone());

    let target = match url {
        Some(url) => url.to_string(),
        None => format!(
            "{}/scoreboardv2?DayOffset=0&GameDate={}&LeagueID={}",
            client.base_url(),
            chrono::Local::now().format("%Y-%m-%d"),
            LEAGUE_ID
        ),
    };

    let configs: Vec<RequestConfig> = if all {
        if routing.pool.is_empty() {
            anyhow::bail!("No proxy endpoints configured");
        }
        let timeout = config.request.timeouts().proxy;
        routing
            .pool
            .endpoints()
            .iter()
            .map(|endpoint| RequestConfig {
                headers: browser_headers(),
                proxy_url: Some(endpoint.url()),
                proxy_label: Some(endpoint.label()),
                timeout,
                force_local: false,
                force_proxy: true,
            })
            .collect()
    } else {
        vec![routing.requests.get_api_config(None, None)?]
    };

    println!("{} GET {}", style("→").cyan(), target);

    let mut failed = 0;
    for request in &configs {
        match client.probe(&target, request).await {
            Ok(response) if (200..300).contains(&response.status) => {
                println!(
                    "  {} {} HTTP {} in {}ms ({} bytes)",
                    style("✓").green(),
                    request.route(),
                    response.status,
                    response.elapsed_ms,
                    response.body.len()
                );
            }
            Ok(response) => {
                failed += 1;
                println!(
                    "  {} {} HTTP {} in {}ms",
                    style("✗").red(),
                    request.route(),
                    response.status,
                    response.elapsed_ms
                );
            }
            Err(e) => {
                failed += 1;
                println!("  {} {} {}", style("✗").red(), request.route(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} checks failed", failed, configs.len());
    }
    Ok(())
}
