//! A wrapper around the `prometheus` crate that provides a global metrics registry and
//! functions to add and use the following components (more info at
//! [Prometheus docs](https://prometheus.io/docs/concepts/metric_types/)):
//!
//! - `Gauge`: used to represent a value that can go up or down, like the balance of a pool.
//! - `IntGauge`: the same as a `Gauge`, but restricted to integers.
//! - `IntCounter`: used to represent a value that only ever goes up, like a log count.
//!
//! Each component may also have a `*Vec` form, which is keyed by a set of labels.
//!
//! ## Important
//!
//! Metrics will fail if two items have the same `name`. All metrics must have a unique `name`.
//! Because we use a global registry there is no namespace per crate, it's one big global space.
//!
//! Metrics are declared as `LazyLock<Result<...>>` statics. A metric that failed to register
//! is silently ignored by every helper in this crate, so instrumentation never takes down the
//! caller.
//!
//! ## Example
//!
//! ```rust
//! use metrics::*;
//! use std::sync::LazyLock;
//!
//! pub static RUN_COUNT: LazyLock<Result<IntCounter>> =
//!     LazyLock::new(|| try_create_int_counter("runs_total", "Total number of runs"));
//!
//! fn main() {
//!     for _ in 0..4 {
//!         inc_counter(&RUN_COUNT);
//!     }
//!     assert_eq!(4, get_int_counter(&RUN_COUNT).map(|c| c.get()).unwrap_or(0));
//! }
//! ```

use prometheus::{Opts, TextEncoder};

pub use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Result,
    proto::MetricFamily,
};

/// Collect all the metrics for reporting.
pub fn gather() -> Vec<MetricFamily> {
    prometheus::gather()
}

/// Encode every registered metric in the Prometheus text exposition format.
pub fn gather_as_text() -> std::result::Result<String, String> {
    let mut buffer = vec![];
    TextEncoder::new()
        .encode(&gather(), &mut buffer)
        .map_err(|e| format!("unable to encode metrics: {:?}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("metrics are not utf-8: {:?}", e))
}

/// Attempts to create an `IntCounter`, returning `Err` if the registry does not accept the
/// counter (potentially due to naming conflict).
pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let opts = Opts::new(name, help);
    let counter = IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Attempts to create an `IntGauge`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let opts = Opts::new(name, help);
    let gauge = IntGauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Attempts to create a `Gauge`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_float_gauge(name: &str, help: &str) -> Result<Gauge> {
    let opts = Opts::new(name, help);
    let gauge = Gauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Attempts to create an `IntGaugeVec`, returning `Err` if the registry does not accept the
/// gauge (potentially due to naming conflict).
pub fn try_create_int_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntGaugeVec> {
    let opts = Opts::new(name, help);
    let gauge_vec = IntGaugeVec::new(opts, label_names)?;
    prometheus::register(Box::new(gauge_vec.clone()))?;
    Ok(gauge_vec)
}

/// Attempts to create a `GaugeVec`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_float_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<GaugeVec> {
    let opts = Opts::new(name, help);
    let gauge_vec = GaugeVec::new(opts, label_names)?;
    prometheus::register(Box::new(gauge_vec.clone()))?;
    Ok(gauge_vec)
}

/// Attempts to create an `IntCounterVec`, returning `Err` if the registry does not accept the
/// counter (potentially due to naming conflict).
pub fn try_create_int_counter_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let opts = Opts::new(name, help);
    let counter_vec = IntCounterVec::new(opts, label_names)?;
    prometheus::register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

pub fn get_int_counter(counter: &Result<IntCounter>) -> Option<&IntCounter> {
    counter.as_ref().ok()
}

pub fn inc_counter(counter: &Result<IntCounter>) {
    if let Ok(counter) = counter {
        counter.inc();
    }
}

pub fn inc_counter_vec(int_counter_vec: &Result<IntCounterVec>, name: &[&str]) {
    if let Some(counter) = get_int_counter_vec(int_counter_vec, name) {
        counter.inc()
    }
}

/// If `int_counter_vec.is_ok()`, returns a counter with the given `name`.
pub fn get_int_counter_vec(
    int_counter_vec: &Result<IntCounterVec>,
    name: &[&str],
) -> Option<IntCounter> {
    if let Ok(int_counter_vec) = int_counter_vec {
        Some(int_counter_vec.get_metric_with_label_values(name).ok()?)
    } else {
        None
    }
}

pub fn set_gauge(gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = gauge {
        gauge.set(value);
    }
}

pub fn set_float_gauge(gauge: &Result<Gauge>, value: f64) {
    if let Ok(gauge) = gauge {
        gauge.set(value);
    }
}

/// If `int_gauge_vec.is_ok()`, returns a gauge with the given `name`.
pub fn get_int_gauge(int_gauge_vec: &Result<IntGaugeVec>, name: &[&str]) -> Option<IntGauge> {
    if let Ok(int_gauge_vec) = int_gauge_vec {
        Some(int_gauge_vec.get_metric_with_label_values(name).ok()?)
    } else {
        None
    }
}

/// If `gauge_vec.is_ok()`, returns a gauge with the given `name`.
pub fn get_gauge(gauge_vec: &Result<GaugeVec>, name: &[&str]) -> Option<Gauge> {
    if let Ok(gauge_vec) = gauge_vec {
        Some(gauge_vec.get_metric_with_label_values(name).ok()?)
    } else {
        None
    }
}

pub fn set_gauge_vec(int_gauge_vec: &Result<IntGaugeVec>, name: &[&str], value: i64) {
    if let Some(gauge) = get_int_gauge(int_gauge_vec, name) {
        gauge.set(value);
    }
}

pub fn set_float_gauge_vec(gauge_vec: &Result<GaugeVec>, name: &[&str], value: f64) {
    if let Some(gauge) = get_gauge(gauge_vec, name) {
        gauge.set(value);
    }
}
