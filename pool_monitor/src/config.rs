use crate::retry::RetryPolicy;
use logging::LoggerConfig;
use sensitive_url::{SensitiveError, SensitiveUrl};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BEACON_NODE: &str = "http://localhost:5052";
pub const DEFAULT_EPOCH_LAG: u64 = 3;
/// Allowed `epoch_lag` values. The head epoch itself is never processed.
pub const EPOCH_LAG_RANGE: std::ops::RangeInclusive<u64> = 1..=3;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 2;
pub const DEFAULT_INITIAL_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;
pub const DEFAULT_STATE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_METRICS_PORT: u16 = 8080;

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Yaml(serde_yaml::Error),
    InvalidUrl(String, SensitiveError),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
            ConfigError::Yaml(e) => write!(f, "invalid config file: {}", e),
            ConfigError::InvalidUrl(which, e) => write!(f, "invalid {} url: {}", which, e),
            ConfigError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: IpAddr,
    pub listen_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port: DEFAULT_METRICS_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub beacon_node: String,
    /// Only consumed by key directories that resolve deposits on the execution layer. The
    /// SQLite directory reads an indexed copy and does not need it.
    pub execution_node: Option<String>,
    pub deposit_database: Option<PathBuf>,
    /// Pool identifiers: a built-in pool name, a name in `pool_addresses`, or a path to a
    /// `.txt` key file.
    pub pools: Vec<String>,
    /// Deposit sender addresses of each named pool.
    pub pool_addresses: BTreeMap<String, Vec<String>>,
    /// Epochs to stay behind the head, so that the processed states are justified.
    pub epoch_lag: u64,
    pub poll_interval_secs: u64,
    pub fetch_attempts: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub state_timeout_secs: u64,
    pub metrics: MetricsConfig,
    pub logging: LoggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            beacon_node: DEFAULT_BEACON_NODE.to_string(),
            execution_node: None,
            deposit_database: None,
            pools: vec![],
            pool_addresses: BTreeMap::new(),
            epoch_lag: DEFAULT_EPOCH_LAG,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            initial_backoff_secs: DEFAULT_INITIAL_BACKOFF_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            state_timeout_secs: DEFAULT_STATE_TIMEOUT_SECS,
            metrics: MetricsConfig::default(),
            logging: LoggerConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_reader(file).map_err(ConfigError::Yaml)
    }

    pub fn beacon_node_url(&self) -> Result<SensitiveUrl, ConfigError> {
        SensitiveUrl::parse(&self.beacon_node)
            .map_err(|e| ConfigError::InvalidUrl("beacon node".to_string(), e))
    }

    pub fn execution_node_url(&self) -> Result<Option<SensitiveUrl>, ConfigError> {
        self.execution_node
            .as_deref()
            .map(|url| {
                SensitiveUrl::parse(url)
                    .map_err(|e| ConfigError::InvalidUrl("execution node".to_string(), e))
            })
            .transpose()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            idle_interval: Duration::from_secs(self.poll_interval_secs),
            fetch_attempts: self.fetch_attempts,
            initial_backoff: Duration::from_secs(self.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }

    /// Checks that do not need I/O. Pool definitions are checked when the pools are loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.beacon_node_url()?;
        self.execution_node_url()?;
        logging::parse_level(&self.logging.debug_level).map_err(ConfigError::Invalid)?;
        if self.pools.is_empty() {
            return Err(ConfigError::Invalid("no pools configured".to_string()));
        }
        if !EPOCH_LAG_RANGE.contains(&self.epoch_lag) {
            return Err(ConfigError::Invalid(format!(
                "epoch_lag must be between {} and {}, got {}",
                EPOCH_LAG_RANGE.start(),
                EPOCH_LAG_RANGE.end(),
                self.epoch_lag
            )));
        }
        if self.fetch_attempts == 0 {
            return Err(ConfigError::Invalid(
                "fetch_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_secs > self.max_backoff_secs {
            return Err(ConfigError::Invalid(format!(
                "initial backoff ({}s) exceeds max backoff ({}s)",
                self.initial_backoff_secs, self.max_backoff_secs
            )));
        }
        Ok(())
    }
}
