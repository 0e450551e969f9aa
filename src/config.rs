// src/config.rs
//! Command line, environment and config-file settings.
//!
//! Values are resolved once at startup into a [`Config`] that is passed to
//! the collector and sinks; precedence is CLI/env over file over defaults.

use crate::collector::{ProbeSettings, SmartRegistry, ThroughputUnit};
use crate::error::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CSV_PATH: &str = "data/disk_metrics.csv";
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Collect per-disk SMART and host performance metrics once.
#[derive(Parser, Debug, Default)]
#[command(name = "diskcollectd", about = "Per-disk SMART and host performance collector", version)]
pub struct Cli {
    /// Base URL of the metrics API; records are posted to <URL>/submit-metrics.
    #[arg(long, env = "API_URL")]
    pub api_url: Option<String>,

    /// Numeric identifier of this node, sent with every submission.
    #[arg(long, env = "NODE_ID")]
    pub node_id: Option<u64>,

    /// Network interface whose receive rate is recorded [default: eno1].
    #[arg(long, env = "METRICS_INTERFACE")]
    pub interface: Option<String>,

    /// Unit for read/write throughput [default: kb].
    #[arg(long, value_enum)]
    pub unit: Option<ThroughputUnit>,

    /// CSV file records are appended to [default: data/disk_metrics.csv].
    #[arg(long)]
    pub csv_path: Option<PathBuf>,

    /// Timeout for each external tool, in seconds [default: 30].
    #[arg(long)]
    pub probe_timeout: Option<u64>,

    /// Timeout for each API request, in seconds [default: 10].
    #[arg(long)]
    pub http_timeout: Option<u64>,

    /// Maximum number of disks processed at once [default: all].
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// TOML config file.
    #[arg(short, long, env = "DISKCOLLECTD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Contents of the optional config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub node_id: Option<u64>,
    pub interface: Option<String>,
    pub unit: Option<ThroughputUnit>,
    pub csv_path: Option<PathBuf>,
    pub probe_timeout_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub max_workers: Option<usize>,
    /// SMART id → label, e.g. `"5" = "Reallocated_Sectors_Count"`.
    pub smart_attributes: Option<BTreeMap<String, String>>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote submission is disabled when unset.
    pub api_url: Option<String>,
    pub node_id: Option<u64>,
    pub probe: ProbeSettings,
    pub csv_path: PathBuf,
    pub probe_timeout: Duration,
    pub http_timeout: Duration,
    pub max_workers: Option<usize>,
    pub registry: SmartRegistry,
}

impl Config {
    /// Read the config file named on the command line (if any) and merge.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let registry = match file.smart_attributes {
            Some(table) => parse_registry(table)?,
            None => SmartRegistry::default(),
        };

        let defaults = ProbeSettings::default();
        let probe = ProbeSettings {
            interface: cli
                .interface
                .clone()
                .or(file.interface)
                .unwrap_or(defaults.interface),
            unit: cli.unit.or(file.unit).unwrap_or(defaults.unit),
        };

        Ok(Self {
            api_url: cli
                .api_url
                .clone()
                .or(file.api_url)
                .filter(|url| !url.trim().is_empty()),
            node_id: cli.node_id.or(file.node_id),
            probe,
            csv_path: cli
                .csv_path
                .clone()
                .or(file.csv_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
            probe_timeout: Duration::from_secs(
                cli.probe_timeout
                    .or(file.probe_timeout_secs)
                    .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
            ),
            http_timeout: Duration::from_secs(
                cli.http_timeout
                    .or(file.http_timeout_secs)
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            max_workers: cli.max_workers.or(file.max_workers),
            registry,
        })
    }
}

fn parse_registry(table: BTreeMap<String, String>) -> Result<SmartRegistry, ConfigError> {
    let mut attributes = BTreeMap::new();
    for (id, label) in table {
        let parsed = id
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::BadAttributeId(id.clone()))?;
        attributes.insert(parsed, label);
    }
    Ok(SmartRegistry::new(attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::merge(&Cli::default(), FileConfig::default()).unwrap();

        assert_eq!(config.api_url, None);
        assert_eq!(config.probe.interface, "eno1");
        assert_eq!(config.probe.unit, ThroughputUnit::KiloBytes);
        assert_eq!(config.csv_path, PathBuf::from("data/disk_metrics.csv"));
        assert_eq!(config.probe_timeout, Duration::from_secs(30));
        assert_eq!(config.registry, SmartRegistry::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            api_url = "http://file.example/api/"
            interface = "eth0"
            unit = "MB/s"
            probe_timeout_secs = 5

            [smart_attributes]
            "5" = "Reallocated_Sectors_Count"
            "194" = "Temperature_Celsius"
            "#,
        )
        .unwrap();
        let cli = Cli {
            interface: Some("bond0".into()),
            node_id: Some(7),
            ..Default::default()
        };

        let config = Config::merge(&cli, file).unwrap();

        assert_eq!(config.api_url.as_deref(), Some("http://file.example/api/"));
        assert_eq!(config.probe.interface, "bond0");
        assert_eq!(config.probe.unit, ThroughputUnit::MegaBytes);
        assert_eq!(config.node_id, Some(7));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.registry.ids().collect::<Vec<_>>(), vec![5, 194]);
    }

    #[test]
    fn test_blank_api_url_disables_submission() {
        let cli = Cli {
            api_url: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(Config::merge(&cli, FileConfig::default()).unwrap().api_url, None);
    }

    #[test]
    fn test_bad_attribute_id() {
        let file: FileConfig = toml::from_str("[smart_attributes]\nabc = \"Nope\"\n").unwrap();
        assert!(matches!(
            Config::merge(&Cli::default(), file),
            Err(ConfigError::BadAttributeId(id)) if id == "abc"
        ));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "diskcollectd",
            "--unit",
            "b",
            "--max-workers",
            "2",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.unit, Some(ThroughputUnit::Bytes));
        assert_eq!(cli.max_workers, Some(2));
        assert_eq!(cli.verbose, 2);
    }
}
