//! `Slot` and `Epoch` newtypes.
//!
//! Both serialize as quoted decimal strings, matching the beacon node API. Addition and
//! subtraction with `u64` saturate; use the `safe_*` methods where an underflow means a bug.

use crate::consts::SLOTS_PER_EPOCH;
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(#[serde(with = "serde_utils::quoted_u64")] u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(#[serde(with = "serde_utils::quoted_u64")] u64);

impl Slot {
    pub const fn new(slot: u64) -> Self {
        Slot(slot)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch(self.0.checked_div(slots_per_epoch).unwrap_or(0))
    }
}

impl Epoch {
    pub const fn new(epoch: u64) -> Self {
        Epoch(epoch)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot(self.0.saturating_mul(slots_per_epoch))
    }

    /// The first slot of this epoch on the canonical 32-slot schedule.
    pub fn start_slot_default(&self) -> Slot {
        self.start_slot(SLOTS_PER_EPOCH)
    }

    pub fn safe_add(&self, other: u64) -> Result<Epoch, ArithError> {
        self.0.safe_add(other).map(Epoch)
    }

    pub fn safe_sub(&self, other: u64) -> Result<Epoch, ArithError> {
        self.0.safe_sub(other).map(Epoch)
    }

    pub fn saturating_sub(&self, other: u64) -> Epoch {
        Epoch(self.0.saturating_sub(other))
    }
}

macro_rules! impl_u64_ops {
    ($type: ident) => {
        impl From<u64> for $type {
            fn from(value: u64) -> Self {
                $type(value)
            }
        }

        impl From<$type> for u64 {
            fn from(value: $type) -> u64 {
                value.0
            }
        }

        impl Add<u64> for $type {
            type Output = $type;

            fn add(self, other: u64) -> $type {
                $type(self.0.saturating_add(other))
            }
        }

        impl Sub<u64> for $type {
            type Output = $type;

            fn sub(self, other: u64) -> $type {
                $type(self.0.saturating_sub(other))
            }
        }

        impl PartialEq<u64> for $type {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $type {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_u64_ops!(Slot);
impl_u64_ops!(Epoch);
