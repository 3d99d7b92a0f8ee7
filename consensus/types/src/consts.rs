/// Slots per epoch on every network this monitor targets.
pub const SLOTS_PER_EPOCH: u64 = 32;

/// `activation_epoch` of a validator that has been deposited but not yet activated.
pub const FAR_FUTURE_EPOCH: u64 = u64::MAX;

pub mod altair {
    pub const TIMELY_SOURCE_FLAG_INDEX: usize = 0;
    pub const TIMELY_TARGET_FLAG_INDEX: usize = 1;
    pub const TIMELY_HEAD_FLAG_INDEX: usize = 2;

    pub const NUM_FLAG_INDICES: usize = 3;
}
