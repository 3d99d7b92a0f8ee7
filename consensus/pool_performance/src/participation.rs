use tracing::warn;
use types::{StateSnapshot, ValidatorIndex};

/// Attestation outcome of a set of validators over the epoch preceding the state's epoch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParticipationSummary {
    pub incorrect_source: u64,
    pub incorrect_target: u64,
    pub incorrect_head: u64,
    /// Validators whose source vote was missing or wrong, which in practice means their
    /// attestation was not included at all.
    pub missed_attestation: Vec<ValidatorIndex>,
}

/// Count incorrect source, target and head votes of `active` in `state`'s
/// `previous_epoch_participation`.
///
/// Slashed validators and validators not yet active at the state's epoch are skipped, as they
/// are not expected to attest.
pub fn analyze<S: StateSnapshot + ?Sized>(
    active: &[ValidatorIndex],
    state: &S,
) -> ParticipationSummary {
    let epoch = state.current_epoch();
    let validators = state.validators();
    let participation = state.previous_epoch_participation();
    let mut summary = ParticipationSummary::default();

    for &index in active {
        let Some(validator) = validators.get(index as usize) else {
            warn!(index, "Validator index out of range");
            continue;
        };
        if validator.slashed || !validator.is_activated_at(epoch) {
            continue;
        }
        let Some(flags) = participation.get(index as usize) else {
            warn!(
                index,
                participation_len = participation.len(),
                "Participation entry missing"
            );
            continue;
        };

        if !flags.is_timely_source() {
            summary.incorrect_source += 1;
            summary.missed_attestation.push(index);
        }
        if !flags.is_timely_target() {
            summary.incorrect_target += 1;
        }
        if !flags.is_timely_head() {
            summary.incorrect_head += 1;
        }
    }

    summary
}
