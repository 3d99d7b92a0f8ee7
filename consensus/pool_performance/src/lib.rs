//! Per-pool validator performance, computed from two consecutive beacon states.
//!
//! Everything in this crate is a pure function of its inputs: no I/O, no clocks. Reporting the
//! resulting [`PerformanceMetrics`] is left to the caller.

pub mod balances;
mod errors;
pub mod index_resolver;
pub mod participation;
pub mod performance_metrics;
pub mod sync_committee;

pub use balances::{BalanceDelta, BalanceTotals, per_validator_delta, total_and_effective};
pub use errors::{EpochAlignmentError, Error};
pub use index_resolver::{PubkeyIndexMap, build_index, filter_active, resolve_indexes};
pub use participation::{ParticipationSummary, analyze};
pub use performance_metrics::{PerformanceMetrics, compute_pool_performance};
pub use sync_committee::{committee_indexes, members_of};
