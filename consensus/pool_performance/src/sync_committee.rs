use crate::index_resolver::{PubkeyIndexMap, resolve_indexes};
use std::collections::HashSet;
use types::{StateSnapshot, ValidatorIndex};

/// Registry indexes of the current sync committee, one entry per seat.
pub fn committee_indexes<S: StateSnapshot + ?Sized>(
    state: &S,
    map: &PubkeyIndexMap,
) -> Vec<ValidatorIndex> {
    resolve_indexes(state.current_sync_committee_pubkeys(), map)
}

/// The seats of `committee_indexes` held by a validator in `pool_indexes`, in committee order.
///
/// A validator can hold more than one seat, in which case it appears once per seat.
pub fn members_of(
    committee_indexes: &[ValidatorIndex],
    pool_indexes: &[ValidatorIndex],
) -> Vec<ValidatorIndex> {
    let pool: HashSet<ValidatorIndex> = pool_indexes.iter().copied().collect();
    committee_indexes
        .iter()
        .copied()
        .filter(|index| pool.contains(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_resolver::build_index;
    use types::test_utils::{StateBuilder, test_pubkey};

    #[test]
    fn intersection_in_committee_order() {
        assert_eq!(members_of(&[9, 3, 5, 1], &[1, 5, 7]), vec![5, 1]);
    }

    #[test]
    fn duplicate_seats_are_kept() {
        assert_eq!(members_of(&[4, 2, 4, 4], &[4]), vec![4, 4, 4]);
    }

    #[test]
    fn disjoint_sets() {
        assert!(members_of(&[1, 2, 3], &[4, 5]).is_empty());
        assert!(members_of(&[], &[4, 5]).is_empty());
    }

    #[test]
    fn committee_resolved_from_state() {
        let state = StateBuilder::new(10)
            .default_validators(4)
            .sync_committee(vec![test_pubkey(3), test_pubkey(1), test_pubkey(42), test_pubkey(3)])
            .build();
        let map = build_index(&state);
        assert_eq!(committee_indexes(&state, &map), vec![3, 1, 3]);
    }
}
