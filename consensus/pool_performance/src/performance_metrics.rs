use crate::balances::{per_validator_delta, total_and_effective};
use crate::errors::Error;
use crate::participation::analyze;
use safe_arith::SafeArith;
use types::consts::altair::NUM_FLAG_INDICES;
use types::{Epoch, StateSnapshot, ValidatorIndex};

/// Performance of one pool over one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub epoch: Epoch,
    pub n_validating_keys: u64,
    /// One source, target and head vote per validating key.
    pub n_total_votes: u64,
    pub n_incorrect_source: u64,
    pub n_incorrect_target: u64,
    pub n_incorrect_head: u64,
    pub indexes_missed_att: Vec<ValidatorIndex>,
    pub indexes_less_balance: Vec<ValidatorIndex>,
    pub earned_balance: u128,
    pub lost_balance: u128,
    pub total_balance: u128,
    pub effective_balance: u128,
    /// `total_balance - effective_balance`.
    ///
    /// This approximates accrued rewards: effective balance moves in whole-ETH steps with
    /// hysteresis, so the difference also absorbs some principal.
    pub total_rewards: i128,
    /// Change of `total_balance` since the previous epoch.
    pub delta_epoch_balance: i128,
    /// Sync committee seats held by the pool, one entry per seat.
    pub sync_committee_members: Vec<ValidatorIndex>,
}

impl PerformanceMetrics {
    pub fn with_sync_committee_members(mut self, members: Vec<ValidatorIndex>) -> Self {
        self.sync_committee_members = members;
        self
    }

    pub fn incorrect_source_percent(&self) -> f64 {
        percent(self.n_incorrect_source, self.n_total_votes)
    }

    pub fn incorrect_target_percent(&self) -> f64 {
        percent(self.n_incorrect_target, self.n_total_votes)
    }

    pub fn incorrect_head_percent(&self) -> f64 {
        percent(self.n_incorrect_head, self.n_total_votes)
    }

    /// Share of validating keys whose balance decreased.
    pub fn decreased_balance_percent(&self) -> f64 {
        percent(
            self.indexes_less_balance.len() as u64,
            self.n_validating_keys,
        )
    }
}

fn percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

/// Compute the performance of the validators at `active_indexes` between two consecutive states.
///
/// Fails if the states are not one epoch apart, or if the set's effective balance differs between
/// them (a deposit or an effective balance update would otherwise be counted as reward).
pub fn compute_pool_performance<S: StateSnapshot + ?Sized>(
    active_indexes: &[ValidatorIndex],
    previous: &S,
    current: &S,
) -> Result<PerformanceMetrics, Error> {
    let participation = analyze(active_indexes, current);

    let current_totals = total_and_effective(active_indexes, current);
    let previous_totals = total_and_effective(active_indexes, previous);
    if current_totals.effective != previous_totals.effective {
        return Err(Error::EffectiveBalanceMismatch {
            previous: previous_totals.effective,
            current: current_totals.effective,
        });
    }

    let total_rewards = current_totals.total as i128 - current_totals.effective as i128;
    let delta_epoch_balance = current_totals.total as i128 - previous_totals.total as i128;

    let delta = per_validator_delta(active_indexes, previous, current)?;

    let n_validating_keys = active_indexes.len() as u64;
    let n_total_votes = n_validating_keys.safe_mul(NUM_FLAG_INDICES as u64)?;

    Ok(PerformanceMetrics {
        epoch: current.current_epoch(),
        n_validating_keys,
        n_total_votes,
        n_incorrect_source: participation.incorrect_source,
        n_incorrect_target: participation.incorrect_target,
        n_incorrect_head: participation.incorrect_head,
        indexes_missed_att: participation.missed_attestation,
        indexes_less_balance: delta.decreased,
        earned_balance: delta.earned,
        lost_balance: delta.lost,
        total_balance: current_totals.total,
        effective_balance: current_totals.effective,
        total_rewards,
        delta_epoch_balance,
        sync_committee_members: vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EpochAlignmentError;
    use crate::index_resolver::{build_index, filter_active, resolve_indexes};
    use crate::sync_committee::{committee_indexes, members_of};
    use types::test_utils::{StateBuilder, TestValidator, test_pubkey};

    const ETH: u64 = 1_000_000_000;

    // -- end to end --

    #[test]
    fn single_validator_earning() {
        let previous = StateBuilder::new(99)
            .validator(TestValidator::new(0).balance(32 * ETH))
            .build();
        let current = StateBuilder::new(100)
            .validator(TestValidator::new(0).balance(32 * ETH + ETH / 100))
            .sync_committee(vec![test_pubkey(0)])
            .build();

        let map = build_index(&current);
        let indexes = resolve_indexes(&[test_pubkey(0)], &map);
        let active = filter_active(&indexes, &current, current.current_epoch());
        let committee = committee_indexes(&current, &map);

        let metrics = compute_pool_performance(&active, &previous, &current)
            .unwrap()
            .with_sync_committee_members(members_of(&committee, &active));

        assert_eq!(metrics.epoch, Epoch::new(100));
        assert_eq!(metrics.n_validating_keys, 1);
        assert_eq!(metrics.n_total_votes, 3);
        assert_eq!(metrics.n_incorrect_source, 0);
        assert_eq!(metrics.n_incorrect_target, 0);
        assert_eq!(metrics.n_incorrect_head, 0);
        assert!(metrics.indexes_missed_att.is_empty());
        assert!(metrics.indexes_less_balance.is_empty());
        assert_eq!(metrics.earned_balance, 10_000_000);
        assert_eq!(metrics.lost_balance, 0);
        assert_eq!(metrics.total_balance, 32_010_000_000);
        assert_eq!(metrics.effective_balance, 32_000_000_000);
        assert_eq!(metrics.total_rewards, 10_000_000);
        assert_eq!(metrics.delta_epoch_balance, 10_000_000);
        assert_eq!(metrics.sync_committee_members, vec![0]);
        assert_eq!(metrics.decreased_balance_percent(), 0.0);
    }

    #[test]
    fn mixed_pool() {
        let previous = StateBuilder::new(9)
            .validator(TestValidator::new(0).balance(32 * ETH))
            .validator(TestValidator::new(1).balance(32 * ETH))
            .validator(TestValidator::new(2).balance(32 * ETH))
            .validator(TestValidator::new(3).balance(32 * ETH))
            .build();
        let current = StateBuilder::new(10)
            .validator(TestValidator::new(0).balance(32 * ETH + 100))
            .validator(TestValidator::new(1).balance(32 * ETH - 40).participation(0))
            .validator(TestValidator::new(2).balance(32 * ETH + 20).participation(0b011))
            .validator(TestValidator::new(3).balance(32 * ETH - 10).participation(0b101))
            .build();

        let metrics = compute_pool_performance(&[0, 1, 2, 3], &previous, &current).unwrap();
        assert_eq!(metrics.n_total_votes, 12);
        assert_eq!(metrics.n_incorrect_source, 1);
        assert_eq!(metrics.n_incorrect_target, 2);
        assert_eq!(metrics.n_incorrect_head, 2);
        assert_eq!(metrics.indexes_missed_att, vec![1]);
        assert_eq!(metrics.indexes_less_balance, vec![1, 3]);
        assert_eq!(metrics.earned_balance, 120);
        assert_eq!(metrics.lost_balance, 50);
        assert_eq!(metrics.delta_epoch_balance, 70);
        assert_eq!(metrics.total_rewards, 70);
        assert_eq!(metrics.decreased_balance_percent(), 50.0);
        assert!((metrics.incorrect_target_percent() - 100.0 * 2.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn losses_yield_negative_reward() {
        let previous = StateBuilder::new(9)
            .validator(TestValidator::new(0).balance(32 * ETH))
            .build();
        let current = StateBuilder::new(10)
            .validator(TestValidator::new(0).balance(32 * ETH - 5))
            .build();

        let metrics = compute_pool_performance(&[0], &previous, &current).unwrap();
        assert_eq!(metrics.total_rewards, -5);
        assert_eq!(metrics.delta_epoch_balance, -5);
        assert_eq!(metrics.lost_balance, 5);
    }

    // -- rejections --

    #[test]
    fn effective_balance_change_rejects_pool() {
        let previous = StateBuilder::new(9)
            .validator(TestValidator::new(0).effective_balance(31 * ETH))
            .build();
        let current = StateBuilder::new(10).validator(TestValidator::new(0)).build();

        assert_eq!(
            compute_pool_performance(&[0], &previous, &current),
            Err(Error::EffectiveBalanceMismatch {
                previous: 31 * ETH as u128,
                current: 32 * ETH as u128,
            })
        );
    }

    #[test]
    fn non_consecutive_states_reject_pool() {
        let previous = StateBuilder::new(8).default_validators(1).build();
        let current = StateBuilder::new(10).default_validators(1).build();

        assert_eq!(
            compute_pool_performance(&[0], &previous, &current),
            Err(Error::EpochAlignment(EpochAlignmentError {
                previous: Epoch::new(8),
                current: Epoch::new(10),
            }))
        );
    }

    #[test]
    fn empty_pool_has_zero_percentages() {
        let previous = StateBuilder::new(9).default_validators(1).build();
        let current = StateBuilder::new(10).default_validators(1).build();

        let metrics = compute_pool_performance(&[], &previous, &current).unwrap();
        assert_eq!(metrics.n_total_votes, 0);
        assert_eq!(metrics.incorrect_source_percent(), 0.0);
        assert_eq!(metrics.decreased_balance_percent(), 0.0);
    }
}
