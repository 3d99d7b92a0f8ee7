//! Destinations for computed performance records.

use crate::metrics;
use pool_performance::PerformanceMetrics;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use types::Epoch;

/// One pool's performance for one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolReport {
    pub pool: String,
    /// Keys the pool is known to have deposited for.
    pub n_deposited_keys: usize,
    /// Of those, keys found in the registry.
    pub n_registered_keys: usize,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkStats {
    pub epoch: Epoch,
    pub total_validators: usize,
    pub total_slashed_validators: usize,
}

/// Receives every report. Delivering the same report twice must be harmless, as an epoch is
/// recomputed after an aborted cycle.
pub trait PerformanceSink: Send + Sync {
    fn report(&self, report: &PoolReport);

    fn report_network(&self, stats: &NetworkStats);
}

/// Exports reports as gauges labelled by pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl PerformanceSink for PrometheusSink {
    fn report(&self, report: &PoolReport) {
        let label = &[report.pool.as_str()];
        let m = &report.metrics;

        metrics::set_gauge_vec(
            &metrics::POOL_VALIDATING_KEYS,
            label,
            m.n_validating_keys as i64,
        );
        metrics::set_gauge_vec(
            &metrics::POOL_INCORRECT_SOURCE,
            label,
            m.n_incorrect_source as i64,
        );
        metrics::set_gauge_vec(
            &metrics::POOL_INCORRECT_TARGET,
            label,
            m.n_incorrect_target as i64,
        );
        metrics::set_gauge_vec(&metrics::POOL_INCORRECT_HEAD, label, m.n_incorrect_head as i64);
        metrics::set_gauge_vec(
            &metrics::POOL_SYNC_COMMITTEE_VALIDATORS,
            label,
            m.sync_committee_members.len() as i64,
        );

        metrics::set_float_gauge_vec(&metrics::POOL_TOTAL_BALANCE, label, m.total_balance as f64);
        metrics::set_float_gauge_vec(
            &metrics::POOL_EFFECTIVE_BALANCE,
            label,
            m.effective_balance as f64,
        );
        metrics::set_float_gauge_vec(
            &metrics::POOL_EARNED_BALANCE,
            label,
            m.earned_balance as f64,
        );
        metrics::set_float_gauge_vec(&metrics::POOL_LOST_BALANCE, label, m.lost_balance as f64);
        metrics::set_float_gauge_vec(
            &metrics::POOL_DELTA_EPOCH_BALANCE,
            label,
            m.delta_epoch_balance as f64,
        );
        metrics::set_float_gauge_vec(&metrics::POOL_TOTAL_REWARDS, label, m.total_rewards as f64);
        metrics::set_float_gauge_vec(
            &metrics::POOL_DECREASED_BALANCE_PERCENT,
            label,
            m.decreased_balance_percent(),
        );

        metrics::set_gauge_vec(
            &metrics::POOL_LAST_REPORTED_EPOCH,
            label,
            m.epoch.as_u64() as i64,
        );
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        metrics::set_gauge_vec(&metrics::POOL_LAST_REPORTED_TIMESTAMP, label, now as i64);
    }

    fn report_network(&self, stats: &NetworkStats) {
        metrics::set_gauge(&metrics::TOTAL_VALIDATORS, stats.total_validators as i64);
        metrics::set_gauge(
            &metrics::TOTAL_SLASHED_VALIDATORS,
            stats.total_slashed_validators as i64,
        );
    }
}

/// Emits one structured `info` event per report.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PerformanceSink for LogSink {
    fn report(&self, report: &PoolReport) {
        let m = &report.metrics;
        info!(
            pool = %report.pool,
            epoch = %m.epoch,
            deposited_keys = report.n_deposited_keys,
            registered_keys = report.n_registered_keys,
            validating_keys = m.n_validating_keys,
            total_votes = m.n_total_votes,
            incorrect_source = m.n_incorrect_source,
            incorrect_target = m.n_incorrect_target,
            incorrect_head = m.n_incorrect_head,
            incorrect_source_percent = m.incorrect_source_percent(),
            incorrect_target_percent = m.incorrect_target_percent(),
            incorrect_head_percent = m.incorrect_head_percent(),
            decreased_balance = m.indexes_less_balance.len(),
            decreased_balance_percent = m.decreased_balance_percent(),
            earned_balance = %m.earned_balance,
            lost_balance = %m.lost_balance,
            total_balance = %m.total_balance,
            effective_balance = %m.effective_balance,
            total_rewards = %m.total_rewards,
            delta_epoch_balance = %m.delta_epoch_balance,
            missed_attestations = ?m.indexes_missed_att,
            less_balance = ?m.indexes_less_balance,
            sync_committee = ?m.sync_committee_members,
            "Pool performance"
        );
    }

    fn report_network(&self, stats: &NetworkStats) {
        info!(
            epoch = %stats.epoch,
            total_validators = stats.total_validators,
            total_slashed_validators = stats.total_slashed_validators,
            "Network stats"
        );
    }
}
