use std::collections::HashMap;
use tracing::warn;
use types::{Epoch, PublicKeyBytes, StateSnapshot, ValidatorIndex};

/// Public key to registry position, for a single state.
pub type PubkeyIndexMap = HashMap<PublicKeyBytes, ValidatorIndex>;

/// Index every validator in `state` by its public key.
///
/// The map is only valid for the state it was built from and is rebuilt every epoch.
pub fn build_index<S: StateSnapshot + ?Sized>(state: &S) -> PubkeyIndexMap {
    let validators = state.validators();
    let mut map = PubkeyIndexMap::with_capacity(validators.len());
    for (index, validator) in validators.iter().enumerate() {
        // The registry never holds a key twice; keep the first position if it somehow does.
        map.entry(validator.pubkey).or_insert(index as ValidatorIndex);
    }
    map
}

/// Map `keys` to registry indexes, in the order given.
///
/// Keys absent from the registry (e.g. deposits not yet processed) are logged and dropped.
pub fn resolve_indexes(keys: &[PublicKeyBytes], map: &PubkeyIndexMap) -> Vec<ValidatorIndex> {
    keys.iter()
        .filter_map(|key| {
            let index = map.get(key).copied();
            if index.is_none() {
                warn!(pubkey = %key, "Validator key not found in registry");
            }
            index
        })
        .collect()
}

/// Keep the indexes whose validator is activated at or before `epoch`.
pub fn filter_active<S: StateSnapshot + ?Sized>(
    indexes: &[ValidatorIndex],
    state: &S,
    epoch: Epoch,
) -> Vec<ValidatorIndex> {
    let validators = state.validators();
    indexes
        .iter()
        .copied()
        .filter(|&index| match validators.get(index as usize) {
            Some(validator) => validator.is_activated_at(epoch),
            None => {
                warn!(
                    index,
                    registry_len = validators.len(),
                    "Validator index out of range"
                );
                false
            }
        })
        .collect()
}
