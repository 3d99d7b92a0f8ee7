use metrics::{IntCounter, Result as MetricsResult, try_create_int_counter};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod tracing_metrics_layer;

pub use tracing_metrics_layer::MetricsLayer;

/// The minimum interval between repeated log messages passed through a `TimeLatch`.
const LOG_DEBOUNCE_INTERVAL: Duration = Duration::from_secs(30);

pub static INFOS_TOTAL: LazyLock<MetricsResult<IntCounter>> =
    LazyLock::new(|| try_create_int_counter("info_total", "Count of infos logged"));
pub static WARNS_TOTAL: LazyLock<MetricsResult<IntCounter>> =
    LazyLock::new(|| try_create_int_counter("warn_total", "Count of warns logged"));
pub static ERRORS_TOTAL: LazyLock<MetricsResult<IntCounter>> =
    LazyLock::new(|| try_create_int_counter("error_total", "Count of errors logged"));

/// Provides de-bounce functionality for logging.
#[derive(Default)]
pub struct TimeLatch(Option<Instant>);

impl TimeLatch {
    /// Only returns true once every `LOG_DEBOUNCE_INTERVAL`.
    pub fn elapsed(&mut self) -> bool {
        let now = Instant::now();

        let is_elapsed = self.0.is_some_and(|elapse_time| now > elapse_time);

        if is_elapsed || self.0.is_none() {
            self.0 = Some(now + LOG_DEBOUNCE_INTERVAL);
        }

        is_elapsed
    }

    /// Forget the last emission, so the next call to `elapsed` starts a fresh interval.
    pub fn reset(&mut self) {
        self.0 = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TEXT" => Ok(LogFormat::Text),
            "JSON" => Ok(LogFormat::Json),
            other => Err(format!("unsupported log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub debug_level: String,
    pub log_format: LogFormat,
    pub log_color: bool,
    pub disable_log_timestamp: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            debug_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_color: true,
            disable_log_timestamp: false,
        }
    }
}

pub fn parse_level(level: &str) -> Result<LevelFilter, String> {
    match level.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::ERROR),
        "warn" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(format!("unsupported log level: {}", other)),
    }
}

/// Install the global subscriber: an `EnvFilter` (`RUST_LOG` wins over `debug_level`), the
/// `MetricsLayer`, and a non-blocking stdout writer.
///
/// The returned guard must be held for the lifetime of the process, dropping it flushes and
/// stops the writer thread.
pub fn init_tracing(config: &LoggerConfig) -> Result<WorkerGuard, String> {
    let level = parse_level(&config.debug_level)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_string().to_lowercase()))
        .map_err(|e| format!("invalid log filter: {:?}", e))?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(config.log_color && config.log_format == LogFormat::Text)
        .with_target(false);

    let stdout_layer = match (config.log_format, config.disable_log_timestamp) {
        (LogFormat::Json, _) => stdout_layer.json().boxed(),
        (LogFormat::Text, true) => stdout_layer.without_time().boxed(),
        (LogFormat::Text, false) => stdout_layer.boxed(),
    };

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(filter))
        .with(MetricsLayer)
        .try_init()
        .map_err(|e| format!("unable to install tracing subscriber: {:?}", e))?;

    Ok(guard)
}

/// Return a tracing subscriber suitable for test usage.
///
/// By default no logs will be printed, but they can be enabled via
/// the `test_logger` feature.  This feature can be enabled for any
/// dependent crate by passing `--features logging/test_logger`, e.g.
/// ```bash
/// cargo test -p pool_monitor --features logging/test_logger
/// ```
pub fn create_test_tracing_subscriber() {
    if cfg!(feature = "test_logger") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .try_init();
    }
}
