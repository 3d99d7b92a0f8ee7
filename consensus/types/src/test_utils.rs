//! Builders for synthetic states, shared by the unit tests of downstream crates.

use crate::beacon_state::{
    BeaconStateAltair, BeaconStateBellatrix, BeaconStateCapella, BeaconStateDeneb,
    BeaconStateElectra, BeaconStateFulu,
};
use crate::consts::SLOTS_PER_EPOCH;
use crate::{
    BeaconState, Epoch, FAR_FUTURE_EPOCH, ForkName, ParticipationFlags, PublicKeyBytes,
    PUBLIC_KEY_BYTES_LEN, Slot, SyncCommittee, Validator,
};

pub const DEFAULT_BALANCE: u64 = 32_000_000_000;

/// All three timely flags set.
pub const FULL_PARTICIPATION: u8 = 0b111;

/// A deterministic, distinct public key for `seed`.
pub fn test_pubkey(seed: u64) -> PublicKeyBytes {
    let mut bytes = [0u8; PUBLIC_KEY_BYTES_LEN];
    bytes[0] = 0xaa;
    bytes[PUBLIC_KEY_BYTES_LEN - 8..].copy_from_slice(&seed.to_be_bytes());
    PublicKeyBytes::from(bytes)
}

#[derive(Debug, Clone)]
pub struct TestValidator {
    pub pubkey: PublicKeyBytes,
    pub balance: u64,
    pub effective_balance: u64,
    pub activation_epoch: Epoch,
    pub slashed: bool,
    pub participation: u8,
}

impl TestValidator {
    pub fn new(seed: u64) -> Self {
        Self {
            pubkey: test_pubkey(seed),
            balance: DEFAULT_BALANCE,
            effective_balance: DEFAULT_BALANCE,
            activation_epoch: Epoch::new(0),
            slashed: false,
            participation: FULL_PARTICIPATION,
        }
    }

    pub fn balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    pub fn effective_balance(mut self, effective_balance: u64) -> Self {
        self.effective_balance = effective_balance;
        self
    }

    pub fn activation_epoch(mut self, epoch: u64) -> Self {
        self.activation_epoch = Epoch::new(epoch);
        self
    }

    pub fn slashed(mut self) -> Self {
        self.slashed = true;
        self
    }

    pub fn participation(mut self, bits: u8) -> Self {
        self.participation = bits;
        self
    }
}

pub struct StateBuilder {
    fork_name: ForkName,
    slot: Slot,
    validators: Vec<TestValidator>,
    sync_committee: Vec<PublicKeyBytes>,
}

impl StateBuilder {
    /// A Deneb state at the first slot of `epoch`.
    pub fn new(epoch: u64) -> Self {
        Self {
            fork_name: ForkName::Deneb,
            slot: Epoch::new(epoch).start_slot(SLOTS_PER_EPOCH),
            validators: vec![],
            sync_committee: vec![],
        }
    }

    pub fn fork(mut self, fork_name: ForkName) -> Self {
        self.fork_name = fork_name;
        self
    }

    pub fn slot(mut self, slot: u64) -> Self {
        self.slot = Slot::new(slot);
        self
    }

    pub fn validator(mut self, validator: TestValidator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Append `count` default validators seeded by their index.
    pub fn default_validators(mut self, count: u64) -> Self {
        let start = self.validators.len() as u64;
        self.validators
            .extend((start..start + count).map(TestValidator::new));
        self
    }

    pub fn sync_committee(mut self, pubkeys: Vec<PublicKeyBytes>) -> Self {
        self.sync_committee = pubkeys;
        self
    }

    pub fn build(self) -> BeaconState {
        let validators = self
            .validators
            .iter()
            .map(|v| Validator {
                pubkey: v.pubkey,
                effective_balance: v.effective_balance,
                slashed: v.slashed,
                activation_epoch: v.activation_epoch,
                exit_epoch: FAR_FUTURE_EPOCH.into(),
            })
            .collect::<Vec<_>>();
        let balances = self.validators.iter().map(|v| v.balance).collect::<Vec<_>>();
        let participation = self
            .validators
            .iter()
            .map(|v| ParticipationFlags::from_bits(v.participation))
            .collect::<Vec<_>>();
        let committee = SyncCommittee {
            pubkeys: self.sync_committee,
            aggregate_pubkey: PublicKeyBytes::empty(),
        };

        let genesis_time = 1_606_824_023;
        let slot = self.slot;
        let current_epoch_participation = vec![ParticipationFlags::default(); validators.len()];

        macro_rules! build_variant {
            ($variant:ident, $inner:ident { $($extra:tt)* }) => {
                BeaconState::$variant($inner {
                    genesis_time,
                    slot,
                    validators,
                    balances,
                    previous_epoch_participation: participation,
                    current_epoch_participation,
                    current_sync_committee: committee.clone(),
                    next_sync_committee: committee,
                    $($extra)*
                })
            };
        }

        match self.fork_name {
            ForkName::Phase0 | ForkName::Altair => build_variant!(Altair, BeaconStateAltair {}),
            ForkName::Bellatrix => build_variant!(Bellatrix, BeaconStateBellatrix {}),
            ForkName::Capella => {
                build_variant!(Capella, BeaconStateCapella { next_withdrawal_index: 0 })
            }
            ForkName::Deneb => build_variant!(Deneb, BeaconStateDeneb { next_withdrawal_index: 0 }),
            ForkName::Electra => build_variant!(
                Electra,
                BeaconStateElectra {
                    next_withdrawal_index: 0,
                    deposit_requests_start_index: u64::MAX,
                }
            ),
            ForkName::Fulu => build_variant!(
                Fulu,
                BeaconStateFulu {
                    next_withdrawal_index: 0,
                    deposit_requests_start_index: u64::MAX,
                }
            ),
        }
    }
}
