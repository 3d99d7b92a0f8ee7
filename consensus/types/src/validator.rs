use crate::{Epoch, PublicKeyBytes};
use serde::{Deserialize, Serialize};

/// The fields of a registry entry that the performance engine reads.
///
/// Fields the beacon node returns but the engine has no use for (withdrawal credentials,
/// eligibility and withdrawable epochs) are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator has been activated at or before `epoch`.
    ///
    /// Exits are deliberately not considered: an exited validator still has a balance that
    /// moves between epochs.
    pub fn is_activated_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch
    }
}
