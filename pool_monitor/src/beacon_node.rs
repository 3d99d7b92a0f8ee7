use eth2::BeaconNodeHttpClient;
use eth2::types::StateId;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use types::{BeaconState, Epoch, SLOTS_PER_EPOCH, Slot, StateVersionError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub head_slot: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The node could not be reached or returned an error.
    Unavailable(String),
    /// The node does not have the requested state (e.g. it has been pruned).
    StateNotFound(Epoch),
    /// The node served a state this build cannot interpret.
    StateVersion(StateVersionError),
}

impl ProviderError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::StateVersion(_))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<eth2::Error> for ProviderError {
    fn from(e: eth2::Error) -> Self {
        match e {
            eth2::Error::StateVersion(e) => ProviderError::StateVersion(e),
            other => ProviderError::Unavailable(other.to_string()),
        }
    }
}

/// Source of node status and full beacon states.
pub trait StateProvider: Send + Sync {
    fn node_sync_status(&self) -> impl Future<Output = Result<SyncStatus, ProviderError>> + Send;

    /// The state at the first slot of `epoch`.
    fn fetch_state(
        &self,
        epoch: Epoch,
    ) -> impl Future<Output = Result<BeaconState, ProviderError>> + Send;
}

impl<T: StateProvider> StateProvider for Arc<T> {
    fn node_sync_status(&self) -> impl Future<Output = Result<SyncStatus, ProviderError>> + Send {
        (**self).node_sync_status()
    }

    fn fetch_state(
        &self,
        epoch: Epoch,
    ) -> impl Future<Output = Result<BeaconState, ProviderError>> + Send {
        (**self).fetch_state(epoch)
    }
}

impl StateProvider for BeaconNodeHttpClient {
    async fn node_sync_status(&self) -> Result<SyncStatus, ProviderError> {
        let syncing = self.get_node_syncing().await?.data;
        Ok(SyncStatus {
            is_syncing: syncing.is_syncing,
            head_slot: syncing.head_slot,
        })
    }

    async fn fetch_state(&self, epoch: Epoch) -> Result<BeaconState, ProviderError> {
        let slot = epoch.start_slot(SLOTS_PER_EPOCH);
        self.get_debug_beacon_states(StateId::Slot(slot))
            .await?
            .ok_or(ProviderError::StateNotFound(epoch))
    }
}
