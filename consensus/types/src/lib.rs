//! Consensus-layer types as served by a beacon node's HTTP API, reduced to what pool
//! performance monitoring reads.

pub mod beacon_state;
pub mod consts;
pub mod fork_name;
pub mod participation_flags;
pub mod public_key_bytes;
pub mod slot_epoch;
pub mod sync_committee;
pub mod test_utils;
pub mod validator;

pub use crate::beacon_state::{BeaconState, Error as BeaconStateError, StateSnapshot};
pub use crate::consts::{FAR_FUTURE_EPOCH, SLOTS_PER_EPOCH};
pub use crate::fork_name::{ForkName, StateVersionError};
pub use crate::participation_flags::ParticipationFlags;
pub use crate::public_key_bytes::{PUBLIC_KEY_BYTES_LEN, PublicKeyBytes, PublicKeyBytesError};
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::sync_committee::SyncCommittee;
pub use crate::validator::Validator;

/// Position of a validator in the registry of one state.
pub type ValidatorIndex = u64;
pub type Gwei = u64;
