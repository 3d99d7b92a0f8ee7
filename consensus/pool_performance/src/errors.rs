use safe_arith::ArithError;
use std::fmt;
use types::Epoch;

/// Balance deltas were requested between states that are not one epoch apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochAlignmentError {
    pub previous: Epoch,
    pub current: Epoch,
}

impl fmt::Display for EpochAlignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "states are not consecutive: previous epoch {}, current epoch {}",
            self.previous, self.current
        )
    }
}

/// Reasons the performance of a single pool could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    EpochAlignment(EpochAlignmentError),
    /// The pool's effective balance changed between the two states, so the balance delta would
    /// mix reward with deposits or effective balance updates.
    EffectiveBalanceMismatch {
        previous: u128,
        current: u128,
    },
    ArithError(ArithError),
}

impl From<EpochAlignmentError> for Error {
    fn from(e: EpochAlignmentError) -> Self {
        Error::EpochAlignment(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Error::ArithError(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EpochAlignment(e) => e.fmt(f),
            other => write!(f, "{:?}", other),
        }
    }
}
