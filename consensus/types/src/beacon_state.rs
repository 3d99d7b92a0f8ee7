use crate::consts::SLOTS_PER_EPOCH;
use crate::fork_name::{ForkName, StateVersionError};
use crate::{Epoch, ParticipationFlags, PublicKeyBytes, Slot, SyncCommittee, Validator};
use serde::{Deserialize, Serialize};
use std::fmt;
use superstruct::superstruct;

#[derive(Debug, PartialEq)]
pub enum Error {
    IncorrectStateVariant,
    Version(StateVersionError),
    InvalidJson(String),
}

impl From<StateVersionError> for Error {
    fn from(e: StateVersionError) -> Self {
        Error::Version(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The subset of a beacon state that pool performance is computed from.
///
/// Fields the node returns but nothing reads (block roots, randao mixes, execution payload
/// headers and so on) are skipped during deserialization.
#[superstruct(
    variants(Altair, Bellatrix, Capella, Deneb, Electra, Fulu),
    variant_attributes(derive(Debug, PartialEq, Clone, Serialize, Deserialize)),
    cast_error(ty = "Error", expr = "Error::IncorrectStateVariant"),
    partial_getter_error(ty = "Error", expr = "Error::IncorrectStateVariant")
)]
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(untagged)]
pub struct BeaconState {
    #[superstruct(getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    #[superstruct(getter(copy))]
    pub slot: Slot,

    // Registry
    pub validators: Vec<Validator>,
    #[serde(with = "serde_utils::quoted_u64_vec")]
    pub balances: Vec<u64>,

    // Participation
    pub previous_epoch_participation: Vec<ParticipationFlags>,
    pub current_epoch_participation: Vec<ParticipationFlags>,

    // Light-client sync committees
    pub current_sync_committee: SyncCommittee,
    pub next_sync_committee: SyncCommittee,

    // Capella
    #[superstruct(only(Capella, Deneb, Electra, Fulu), partial_getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub next_withdrawal_index: u64,

    // Electra
    #[superstruct(only(Electra, Fulu), partial_getter(copy))]
    #[serde(with = "serde_utils::quoted_u64")]
    pub deposit_requests_start_index: u64,
}

impl BeaconState {
    pub fn fork_name(&self) -> ForkName {
        match self {
            BeaconState::Altair(_) => ForkName::Altair,
            BeaconState::Bellatrix(_) => ForkName::Bellatrix,
            BeaconState::Capella(_) => ForkName::Capella,
            BeaconState::Deneb(_) => ForkName::Deneb,
            BeaconState::Electra(_) => ForkName::Electra,
            BeaconState::Fulu(_) => ForkName::Fulu,
        }
    }

    /// Decode the `data` of a state response using the layout of `fork_name`.
    ///
    /// The JSON encodings of neighbouring forks overlap, so the fork must come from the
    /// response metadata rather than be guessed from the body.
    pub fn from_json_value(fork_name: ForkName, value: serde_json::Value) -> Result<Self, Error> {
        let convert = |e: serde_json::Error| Error::InvalidJson(e.to_string());
        Ok(match fork_name {
            ForkName::Phase0 => return Err(StateVersionError::UnsupportedFork(fork_name).into()),
            ForkName::Altair => BeaconState::Altair(serde_json::from_value(value).map_err(convert)?),
            ForkName::Bellatrix => {
                BeaconState::Bellatrix(serde_json::from_value(value).map_err(convert)?)
            }
            ForkName::Capella => {
                BeaconState::Capella(serde_json::from_value(value).map_err(convert)?)
            }
            ForkName::Deneb => BeaconState::Deneb(serde_json::from_value(value).map_err(convert)?),
            ForkName::Electra => {
                BeaconState::Electra(serde_json::from_value(value).map_err(convert)?)
            }
            ForkName::Fulu => BeaconState::Fulu(serde_json::from_value(value).map_err(convert)?),
        })
    }

    /// Decode a full `{"version": .., "data": ..}` response body.
    ///
    /// `version_header` (the `Eth-Consensus-Version` header) takes precedence over the body's
    /// `version` field.
    pub fn from_versioned_json(
        version_header: Option<&str>,
        body: serde_json::Value,
    ) -> Result<Self, Error> {
        #[derive(Deserialize)]
        struct Helper {
            version: Option<String>,
            data: serde_json::Value,
        }

        let helper: Helper =
            serde_json::from_value(body).map_err(|e| Error::InvalidJson(e.to_string()))?;
        let tag = version_header.or(helper.version.as_deref());
        let fork_name = ForkName::from_version_tag(tag)?;
        Self::from_json_value(fork_name, helper.data)
    }
}

/// Uniform read access to the fields pool performance depends on, whatever the fork.
pub trait StateSnapshot {
    fn slot(&self) -> Slot;

    fn validators(&self) -> &[Validator];

    fn balances(&self) -> &[u64];

    fn previous_epoch_participation(&self) -> &[ParticipationFlags];

    fn current_sync_committee_pubkeys(&self) -> &[PublicKeyBytes];

    fn current_epoch(&self) -> Epoch {
        self.slot().epoch(SLOTS_PER_EPOCH)
    }

    fn num_validators(&self) -> usize {
        self.validators().len()
    }

    fn num_slashed_validators(&self) -> usize {
        self.validators().iter().filter(|v| v.slashed).count()
    }
}

impl StateSnapshot for BeaconState {
    fn slot(&self) -> Slot {
        BeaconState::slot(self)
    }

    fn validators(&self) -> &[Validator] {
        BeaconState::validators(self).as_slice()
    }

    fn balances(&self) -> &[u64] {
        BeaconState::balances(self).as_slice()
    }

    fn previous_epoch_participation(&self) -> &[ParticipationFlags] {
        BeaconState::previous_epoch_participation(self).as_slice()
    }

    fn current_sync_committee_pubkeys(&self) -> &[PublicKeyBytes] {
        self.current_sync_committee().pubkeys.as_slice()
    }
}
