use crate::config::{Config, ConfigError};
use clap::Parser;
use logging::LogFormat;
use std::net::IpAddr;
use std::path::PathBuf;

/// Flags override the values read from `--config`, which in turn override the defaults.
#[derive(Parser, Debug, Default)]
#[command(name = "pool_monitor")]
#[command(about = "Per-epoch performance of staking pools on the beacon chain")]
#[command(version)]
pub struct Cli {
    /// YAML config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Beacon node HTTP API endpoint
    #[arg(long, value_name = "URL")]
    pub beacon_node: Option<String>,

    /// Execution node endpoint, used to resolve deposit addresses
    #[arg(long, value_name = "URL")]
    pub execution_node: Option<String>,

    /// SQLite database of indexed deposits (sender address to public key)
    #[arg(long, value_name = "PATH")]
    pub deposit_db: Option<PathBuf>,

    /// Comma-separated pool identifiers: built-in names, names from the config file's
    /// `pool_addresses`, or paths to `.txt` key files
    #[arg(long, value_name = "POOLS", value_delimiter = ',')]
    pub pools: Vec<String>,

    /// Epochs to stay behind the head, from 1 to 3
    #[arg(long, value_name = "EPOCHS")]
    pub epoch_lag: Option<u64>,

    /// Seconds between checks for a new epoch
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Disable the Prometheus endpoint
    #[arg(long)]
    pub disable_metrics: bool,

    #[arg(long, value_name = "ADDRESS")]
    pub metrics_address: Option<IpAddr>,

    #[arg(long, value_name = "PORT")]
    pub metrics_port: Option<u16>,

    /// One of error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL")]
    pub debug_level: Option<String>,

    /// TEXT or JSON
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Load `--config` (if any) and apply the flags on top.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(self, config: &mut Config) {
        if let Some(beacon_node) = self.beacon_node {
            config.beacon_node = beacon_node;
        }
        if let Some(execution_node) = self.execution_node {
            config.execution_node = Some(execution_node);
        }
        if let Some(path) = self.deposit_db {
            config.deposit_database = Some(path);
        }
        if !self.pools.is_empty() {
            config.pools = self.pools;
        }
        if let Some(epoch_lag) = self.epoch_lag {
            config.epoch_lag = epoch_lag;
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs;
        }
        if self.disable_metrics {
            config.metrics.enabled = false;
        }
        if let Some(address) = self.metrics_address {
            config.metrics.listen_address = address;
        }
        if let Some(port) = self.metrics_port {
            config.metrics.listen_port = port;
        }
        if let Some(level) = self.debug_level {
            config.logging.debug_level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.log_format = format;
        }
    }
}
