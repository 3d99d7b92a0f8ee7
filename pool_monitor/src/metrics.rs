pub use metrics::*;
use std::sync::LazyLock;

pub const POOL_LABEL: &str = "pool";
pub const OUTCOME_LABEL: &str = "outcome";

/*
 * Network
 */
pub static TOTAL_VALIDATORS: LazyLock<Result<IntGauge>> = LazyLock::new(|| {
    try_create_int_gauge(
        "pool_monitor_total_validators",
        "Validators in the registry of the last processed state",
    )
});
pub static TOTAL_SLASHED_VALIDATORS: LazyLock<Result<IntGauge>> = LazyLock::new(|| {
    try_create_int_gauge(
        "pool_monitor_total_slashed_validators",
        "Slashed validators in the registry of the last processed state",
    )
});

/*
 * Controller
 */
pub static LAST_PROCESSED_EPOCH: LazyLock<Result<IntGauge>> = LazyLock::new(|| {
    try_create_int_gauge(
        "pool_monitor_last_processed_epoch",
        "Most recent epoch for which every pool was computed",
    )
});
pub static CYCLE_OUTCOMES: LazyLock<Result<IntCounterVec>> = LazyLock::new(|| {
    try_create_int_counter_vec(
        "pool_monitor_cycle_outcomes_total",
        "Monitor cycles by outcome",
        &[OUTCOME_LABEL],
    )
});

/*
 * Per pool
 */
pub static POOL_LAST_REPORTED_EPOCH: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_pool_last_reported_epoch",
        "Epoch of the last report for the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_LAST_REPORTED_TIMESTAMP: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_pool_last_reported_timestamp_seconds",
        "Unix time of the last report for the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_VALIDATING_KEYS: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_validating_keys",
        "Active validators of the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_INCORRECT_SOURCE: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_incorrect_source",
        "Validators of the pool without a timely correct source vote",
        &[POOL_LABEL],
    )
});
pub static POOL_INCORRECT_TARGET: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_incorrect_target",
        "Validators of the pool without a timely correct target vote",
        &[POOL_LABEL],
    )
});
pub static POOL_INCORRECT_HEAD: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_incorrect_head",
        "Validators of the pool without a timely correct head vote",
        &[POOL_LABEL],
    )
});
pub static POOL_SYNC_COMMITTEE_VALIDATORS: LazyLock<Result<IntGaugeVec>> = LazyLock::new(|| {
    try_create_int_gauge_vec(
        "pool_monitor_sync_committee_validators",
        "Sync committee seats held by the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_TOTAL_BALANCE: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_total_balance_gwei",
        "Sum of the balances of the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_EFFECTIVE_BALANCE: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_effective_balance_gwei",
        "Sum of the effective balances of the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_EARNED_BALANCE: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_earned_balance_gwei",
        "Balance gained over the epoch by validators of the pool whose balance increased",
        &[POOL_LABEL],
    )
});
pub static POOL_LOST_BALANCE: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_lost_balance_gwei",
        "Balance lost over the epoch by validators of the pool whose balance decreased",
        &[POOL_LABEL],
    )
});
pub static POOL_DELTA_EPOCH_BALANCE: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_delta_epoch_balance_gwei",
        "Change of the pool's total balance over the epoch",
        &[POOL_LABEL],
    )
});
pub static POOL_TOTAL_REWARDS: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_total_rewards_gwei",
        "Total balance minus effective balance of the pool",
        &[POOL_LABEL],
    )
});
pub static POOL_DECREASED_BALANCE_PERCENT: LazyLock<Result<GaugeVec>> = LazyLock::new(|| {
    try_create_float_gauge_vec(
        "pool_monitor_decreased_balance_percent",
        "Share of the pool's validators whose balance decreased over the epoch",
        &[POOL_LABEL],
    )
});
