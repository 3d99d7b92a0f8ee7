use crate::consts::altair::{
    TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
};
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};

/// Per-validator attestation participation for one epoch.
///
/// Bit `n` (counting from the least-significant bit) is set iff the validator's attestation
/// was timely and correct for flag `n`: 0 = source, 1 = target, 2 = head.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipationFlags {
    #[serde(with = "serde_utils::quoted_u8")]
    bits: u8,
}

impl ParticipationFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    pub fn into_u8(self) -> u8 {
        self.bits
    }

    pub fn has_flag(&self, flag_index: usize) -> Result<bool, ArithError> {
        let mask = 1u8.safe_shl(flag_index as u32)?;
        Ok(self.bits & mask == mask)
    }

    pub fn is_timely_source(&self) -> bool {
        self.has_flag(TIMELY_SOURCE_FLAG_INDEX).unwrap_or(false)
    }

    pub fn is_timely_target(&self) -> bool {
        self.has_flag(TIMELY_TARGET_FLAG_INDEX).unwrap_or(false)
    }

    pub fn is_timely_head(&self) -> bool {
        self.has_flag(TIMELY_HEAD_FLAG_INDEX).unwrap_or(false)
    }
}
