use crate::PublicKeyBytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCommittee {
    pub pubkeys: Vec<PublicKeyBytes>,
    pub aggregate_pubkey: PublicKeyBytes,
}
