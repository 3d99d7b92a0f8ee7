use crate::errors::EpochAlignmentError;
use tracing::warn;
use types::{StateSnapshot, ValidatorIndex};

/// Sums over a set of validators. A `u128` holds the sum of any number of `u64` Gwei
/// balances the registry can contain.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BalanceTotals {
    pub total: u128,
    pub effective: u128,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BalanceDelta {
    /// Validators whose balance went down between the two states.
    pub decreased: Vec<ValidatorIndex>,
    pub earned: u128,
    /// Magnitude of the summed decreases.
    pub lost: u128,
}

impl BalanceDelta {
    /// `earned - lost`, i.e. the net balance change of every validator present in both states.
    pub fn net(&self) -> i128 {
        self.earned as i128 - self.lost as i128
    }
}

/// Sum actual and effective balances of `indexes` in `state`.
///
/// Indexes past the end of the balance list are logged and skipped.
pub fn total_and_effective<S: StateSnapshot + ?Sized>(
    indexes: &[ValidatorIndex],
    state: &S,
) -> BalanceTotals {
    let balances = state.balances();
    let validators = state.validators();
    let mut totals = BalanceTotals::default();

    for &index in indexes {
        let (Some(balance), Some(validator)) = (
            balances.get(index as usize),
            validators.get(index as usize),
        ) else {
            warn!(
                index,
                balances_len = balances.len(),
                "Validator index beyond balances"
            );
            continue;
        };
        totals.total += *balance as u128;
        totals.effective += validator.effective_balance as u128;
    }

    totals
}

/// Per-validator balance change from `previous` to `current`.
///
/// The states must be exactly one epoch apart. Indexes unknown to `previous` (validators that
/// joined the registry in between) have nothing to compare against and are skipped.
pub fn per_validator_delta<S: StateSnapshot + ?Sized>(
    indexes: &[ValidatorIndex],
    previous: &S,
    current: &S,
) -> Result<BalanceDelta, EpochAlignmentError> {
    let previous_epoch = previous.current_epoch();
    let current_epoch = current.current_epoch();
    let alignment_error = EpochAlignmentError {
        previous: previous_epoch,
        current: current_epoch,
    };
    if previous_epoch.safe_add(1).map_err(|_| alignment_error)? != current_epoch {
        return Err(alignment_error);
    }

    let previous_balances = previous.balances();
    let current_balances = current.balances();
    let mut delta = BalanceDelta::default();

    for &index in indexes {
        let Some(&before) = previous_balances.get(index as usize) else {
            continue;
        };
        let Some(&after) = current_balances.get(index as usize) else {
            warn!(index, "Validator index beyond current balances");
            continue;
        };

        if after >= before {
            delta.earned += (after - before) as u128;
        } else {
            delta.decreased.push(index);
            delta.lost += (before - after) as u128;
        }
    }

    Ok(delta)
}
