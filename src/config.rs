//! Configuration management for hoopsync using the prefer crate.
//!
//! A config file (`hoopsync.toml`, `.yaml` or `.json`) is discovered with
//! `prefer`, or given explicitly with `--config`. Every section has defaults,
//! so an empty or missing file is valid. Environment variables are applied
//! on top, then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{Timeouts, STATS_BASE_URL};
use crate::ingest::IngestOptions;
use crate::proxy::ProxyConfig;
use crate::rate_limit::RateLimitConfig;
use crate::repository::util::redact_url;

/// Default database filename under the data directory.
const DEFAULT_DATABASE_FILENAME: &str = "hoopsync.db";

/// `[request]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSection {
    pub base_url: String,
    pub direct_timeout_secs: u64,
    pub proxy_timeout_secs: u64,
}

impl Default for RequestSection {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            base_url: STATS_BASE_URL.to_string(),
            direct_timeout_secs: timeouts.direct.as_secs(),
            proxy_timeout_secs: timeouts.proxy.as_secs(),
        }
    }
}

impl RequestSection {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            direct: Duration::from_secs(self.direct_timeout_secs),
            proxy: Duration::from_secs(self.proxy_timeout_secs),
        }
    }
}

/// `[ingest]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub workers: usize,
    pub history_seasons: usize,
    pub max_players: usize,
}

impl Default for IngestSection {
    fn default() -> Self {
        let options = IngestOptions::default();
        Self {
            workers: options.workers,
            history_seasons: options.history_seasons,
            max_players: options.max_players,
        }
    }
}

/// `[maintenance]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSection {
    /// Seasons kept by retention pruning, ending at the current one.
    pub keep_seasons: usize,
}

impl Default for MaintenanceSection {
    fn default() -> Self {
        Self { keep_seasons: 10 }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite path or `postgres://` URL. Defaults to the user data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub proxy: ProxyConfig,
    pub rate_limit: RateLimitConfig,
    pub request: RequestSection,
    pub ingest: IngestSection,
    pub maintenance: MaintenanceSection,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no file is found or it fails to parse.
    pub async fn load() -> Self {
        let config = match prefer::load("hoopsync").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}; using defaults", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "json" => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e)),
        }
    }

    /// Apply environment variable overrides to every section.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database_url = Some(url);
            }
        }
        self.proxy = self.proxy.with_env_overrides();
        self.rate_limit = self.rate_limit.with_env_overrides();
        self
    }

    /// Default data directory: `<data dir>/hoopsync`, or `./hoopsync`.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hoopsync")
    }

    /// Effective database URL.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!(
                "sqlite:{}",
                Self::default_data_dir()
                    .join(DEFAULT_DATABASE_FILENAME)
                    .display()
            ),
        }
    }

    /// Create the parent directory of a SQLite database file.
    pub fn ensure_database_dir(&self) -> std::io::Result<()> {
        let url = self.database_url();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(());
        }
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(&url);
        match Path::new(path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    /// Ingestion options from the `[ingest]` and `[rate_limit]` sections.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            workers: self.ingest.workers,
            retry_budget: self.rate_limit.retry_budget,
            backoff_base_ms: self.rate_limit.backoff_base_ms,
            history_seasons: self.ingest.history_seasons,
            max_players: self.ingest.max_players,
            ..Default::default()
        }
    }

    /// Copy safe to print: proxy password and database password masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.proxy = config.proxy.redacted();
        config.database_url = config.database_url.as_deref().map(redact_url);
        config
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rate_limit.max_per_window, 30);
        assert_eq!(config.rate_limit.window_secs, 25);
        assert_eq!(config.ingest.workers, 2);
        assert_eq!(config.maintenance.keep_seasons, 10);
        assert_eq!(config.request.timeouts(), Timeouts::default());
        assert!(config.database_url().starts_with("sqlite:"));
        assert!(config.database_url().ends_with("hoopsync.db"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::parse(
            r#"
            database_url = "/tmp/stats.db"

            [rate_limit]
            max_per_window = 10

            [ingest]
            workers = 4
            "#,
            "toml",
        )
        .unwrap();

        assert_eq!(config.database_url(), "/tmp/stats.db");
        assert_eq!(config.rate_limit.max_per_window, 10);
        assert_eq!(config.rate_limit.window_secs, 25);
        assert_eq!(config.ingest.workers, 4);
        assert_eq!(config.ingest_options().workers, 4);
        assert_eq!(config.ingest_options().retry_budget, 3);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse("ingest:\n  max_players: 25\n", "yaml").unwrap();
        assert_eq!(yaml.ingest.max_players, 25);

        let json = Config::parse(r#"{"maintenance": {"keep_seasons": 3}}"#, "json").unwrap();
        assert_eq!(json.maintenance.keep_seasons, 3);

        assert!(Config::parse("[ingest\nworkers = ", "toml").is_err());
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[maintenance]\nkeep_seasons = 5").unwrap();

        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.maintenance.keep_seasons, 5);
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_redacted_hides_passwords() {
        let config = Config {
            database_url: Some("postgres://app:hunter2@db/stats".into()),
            proxy: ProxyConfig {
                username: Some("user".into()),
                password: Some("secret".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let shown = config.redacted().to_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("secret"));
    }
}
