//! The epoch cycle: wait for a new justified-enough epoch, fetch the states on either side of
//! it, compute every pool and hand the records to the sinks.

use crate::beacon_node::{ProviderError, StateProvider};
use crate::key_directory::KeyDirectory;
use crate::metrics;
use crate::pools::{Pool, PoolKeys};
use crate::retry::RetryPolicy;
use crate::sinks::{NetworkStats, PerformanceSink, PoolReport};
use logging::TimeLatch;
use pool_performance::{
    build_index, committee_indexes, compute_pool_performance, filter_active, members_of,
    resolve_indexes,
};
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use types::{BeaconState, Epoch, SLOTS_PER_EPOCH, Slot, StateSnapshot, StateVersionError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// The node is still syncing; nothing was fetched.
    Syncing { head_slot: Slot },
    /// No epoch newer than the last processed one is available yet.
    Idle { epoch: Epoch },
    Processed {
        epoch: Epoch,
        pools_reported: usize,
        pools_skipped: usize,
    },
}

impl CycleOutcome {
    pub fn metric_label(&self) -> &'static str {
        match self {
            CycleOutcome::Syncing { .. } => "syncing",
            CycleOutcome::Idle { .. } => "idle",
            CycleOutcome::Processed { .. } => "processed",
        }
    }
}

/// A cycle that ended before every pool was reported. The epoch is retried on the next cycle.
#[derive(Debug)]
pub enum CycleError {
    SyncStatus(ProviderError),
    CurrentState(Epoch, ProviderError),
    PreviousState(Epoch, ProviderError),
    Cancelled,
}

impl CycleError {
    /// Errors that retrying will not fix.
    pub fn fatal(&self) -> Option<FatalError> {
        match self {
            CycleError::CurrentState(_, ProviderError::StateVersion(e))
            | CycleError::PreviousState(_, ProviderError::StateVersion(e)) => {
                Some(FatalError::StateVersion(e.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FatalError {
    StateVersion(StateVersionError),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::StateVersion(e) => {
                write!(f, "beacon node served an unsupported state: {}", e)
            }
        }
    }
}

pub struct EpochCycleController<P, K> {
    provider: P,
    key_directory: K,
    pools: Vec<Pool>,
    sinks: Vec<Arc<dyn PerformanceSink>>,
    epoch_lag: u64,
    retry: RetryPolicy,
    cancel: CancellationToken,
    last_processed_epoch: Option<Epoch>,
    /// The current state of the last processed epoch, kept to serve as the previous state of
    /// the next one.
    previous_state: Option<BeaconState>,
    node_syncing: bool,
    syncing_log_latch: TimeLatch,
    consecutive_failures: u32,
}

impl<P: StateProvider, K: KeyDirectory> EpochCycleController<P, K> {
    pub fn new(
        provider: P,
        key_directory: K,
        pools: Vec<Pool>,
        sinks: Vec<Arc<dyn PerformanceSink>>,
        epoch_lag: u64,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            key_directory,
            pools,
            sinks,
            epoch_lag,
            retry,
            cancel,
            last_processed_epoch: None,
            previous_state: None,
            node_syncing: false,
            syncing_log_latch: TimeLatch::default(),
            consecutive_failures: 0,
        }
    }

    pub fn last_processed_epoch(&self) -> Option<Epoch> {
        self.last_processed_epoch
    }

    pub fn retained_state_epoch(&self) -> Option<Epoch> {
        self.previous_state.as_ref().map(|state| state.current_epoch())
    }

    /// Run cycles until cancelled. Only returns an error for conditions retrying cannot fix.
    pub async fn run(mut self) -> Result<(), FatalError> {
        info!(
            pools = self.pools.len(),
            epoch_lag = self.epoch_lag,
            "Starting pool monitor"
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let delay = match self.run_cycle().await {
                Ok(outcome) => {
                    metrics::inc_counter_vec(&metrics::CYCLE_OUTCOMES, &[outcome.metric_label()]);
                    self.consecutive_failures = 0;
                    match outcome {
                        CycleOutcome::Processed { .. } => Duration::ZERO,
                        CycleOutcome::Idle { .. } | CycleOutcome::Syncing { .. } => {
                            self.retry.idle_interval
                        }
                    }
                }
                Err(CycleError::Cancelled) => break,
                Err(e) => {
                    if let Some(fatal) = e.fatal() {
                        error!(error = %fatal, "Unable to continue");
                        return Err(fatal);
                    }
                    metrics::inc_counter_vec(&metrics::CYCLE_OUTCOMES, &["failed"]);
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    let delay = self.retry.backoff(self.consecutive_failures);
                    warn!(
                        error = %e,
                        consecutive_failures = self.consecutive_failures,
                        retry_in = ?delay,
                        "Monitor cycle failed"
                    );
                    delay
                }
            };

            if !delay.is_zero() && self.sleep(delay).await.is_err() {
                break;
            }
        }

        info!("Pool monitor stopped");
        Ok(())
    }

    /// One pass of the state machine.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let status = self
            .cancellable(self.provider.node_sync_status())
            .await?
            .map_err(CycleError::SyncStatus)?;

        if status.is_syncing {
            if !self.node_syncing || self.syncing_log_latch.elapsed() {
                info!(head_slot = %status.head_slot, "Waiting for beacon node to sync");
            }
            self.node_syncing = true;
            return Ok(CycleOutcome::Syncing {
                head_slot: status.head_slot,
            });
        }
        if self.node_syncing {
            info!(head_slot = %status.head_slot, "Beacon node synced");
            self.node_syncing = false;
            self.syncing_log_latch.reset();
        }

        let current_epoch = status
            .head_slot
            .epoch(SLOTS_PER_EPOCH)
            .saturating_sub(self.epoch_lag);
        let already_processed = self
            .last_processed_epoch
            .is_some_and(|last| current_epoch <= last);
        let Ok(previous_epoch) = current_epoch.safe_sub(1) else {
            return Ok(CycleOutcome::Idle {
                epoch: current_epoch,
            });
        };
        if already_processed {
            return Ok(CycleOutcome::Idle {
                epoch: current_epoch,
            });
        }

        debug!(%current_epoch, head_slot = %status.head_slot, "Fetching state");
        let current = match self.fetch_state(current_epoch).await {
            Ok(state) => state,
            Err(e) => {
                // The retained state can no longer be trusted to be the predecessor of
                // whatever is fetched next.
                self.previous_state = None;
                return Err(match e {
                    FetchError::Cancelled => CycleError::Cancelled,
                    FetchError::Provider(e) => CycleError::CurrentState(current_epoch, e),
                });
            }
        };

        let previous = match self.previous_state.take() {
            Some(state) if state.current_epoch() == previous_epoch => state,
            retained => {
                if let Some(stale) = retained {
                    debug!(
                        retained_epoch = %stale.current_epoch(),
                        %previous_epoch,
                        "Discarding retained state"
                    );
                }
                debug!(%previous_epoch, "Fetching previous state");
                self.fetch_state(previous_epoch)
                    .await
                    .map_err(|e| match e {
                        FetchError::Cancelled => CycleError::Cancelled,
                        FetchError::Provider(e) => CycleError::PreviousState(previous_epoch, e),
                    })?
            }
        };

        match self.process_epoch(current_epoch, &previous, &current).await {
            Ok((pools_reported, pools_skipped)) => {
                self.previous_state = Some(current);
                self.last_processed_epoch = Some(current_epoch);
                metrics::set_gauge(&metrics::LAST_PROCESSED_EPOCH, current_epoch.as_u64() as i64);
                info!(
                    epoch = %current_epoch,
                    pools_reported,
                    pools_skipped,
                    "Processed epoch"
                );
                Ok(CycleOutcome::Processed {
                    epoch: current_epoch,
                    pools_reported,
                    pools_skipped,
                })
            }
            Err(e) => {
                // `previous` is still the predecessor of `current_epoch`, which is retried.
                self.previous_state = Some(previous);
                Err(e)
            }
        }
    }

    /// Compute and report every pool. Returns the number of reported and skipped pools.
    async fn process_epoch(
        &self,
        epoch: Epoch,
        previous: &BeaconState,
        current: &BeaconState,
    ) -> Result<(usize, usize), CycleError> {
        let network = NetworkStats {
            epoch,
            total_validators: current.num_validators(),
            total_slashed_validators: current.num_slashed_validators(),
        };
        for sink in &self.sinks {
            sink.report_network(&network);
        }

        let pubkey_map = build_index(current);
        let committee = committee_indexes(current, &pubkey_map);
        let mut reported = 0;
        let mut skipped = 0;

        for pool in &self.pools {
            let keys = match &pool.keys {
                PoolKeys::Static(keys) => Cow::Borrowed(keys.as_slice()),
                PoolKeys::DepositAddresses(addresses) => {
                    debug!(pool = %pool.name, ?addresses, "Looking up deposited keys");
                    let lookup = self
                        .cancellable(self.key_directory.keys_for_addresses(addresses))
                        .await?;
                    match lookup {
                        Ok(keys) => Cow::Owned(keys),
                        Err(e) => {
                            warn!(
                                pool = %pool.name,
                                %epoch,
                                error = %e,
                                "Unable to look up deposited keys, skipping"
                            );
                            skipped += 1;
                            continue;
                        }
                    }
                }
            };

            if keys.is_empty() {
                warn!(pool = %pool.name, %epoch, "No deposited keys for pool, skipping");
                skipped += 1;
                continue;
            }

            let indexes = resolve_indexes(&keys, &pubkey_map);
            if indexes.is_empty() {
                warn!(
                    pool = %pool.name,
                    %epoch,
                    keys = keys.len(),
                    "No pool keys found in the registry, skipping"
                );
                skipped += 1;
                continue;
            }
            let active = filter_active(&indexes, current, epoch);
            debug!(
                pool = %pool.name,
                keys = keys.len(),
                registered = indexes.len(),
                active = active.len(),
                "Resolved pool validators"
            );

            let performance = match compute_pool_performance(&active, previous, current) {
                Ok(performance) => {
                    performance.with_sync_committee_members(members_of(&committee, &active))
                }
                Err(e) => {
                    warn!(
                        pool = %pool.name,
                        %epoch,
                        error = %e,
                        "Unable to compute pool performance, skipping"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let report = PoolReport {
                pool: pool.name.clone(),
                n_deposited_keys: keys.len(),
                n_registered_keys: indexes.len(),
                metrics: performance,
            };
            for sink in &self.sinks {
                sink.report(&report);
            }
            reported += 1;
        }

        Ok((reported, skipped))
    }

    /// Fetch a state, retrying transient failures up to the policy's attempt limit.
    async fn fetch_state(&self, epoch: Epoch) -> Result<BeaconState, FetchError> {
        let attempts = self.retry.fetch_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = self
                .cancellable(self.provider.fetch_state(epoch))
                .await
                .map_err(|_| FetchError::Cancelled)?;
            match result {
                Ok(state) => return Ok(state),
                Err(e) if e.is_fatal() || attempt >= attempts => {
                    return Err(FetchError::Provider(e));
                }
                Err(e) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(%epoch, attempt, error = %e, retry_in = ?delay, "State fetch failed");
                    self.sleep(delay).await.map_err(|_| FetchError::Cancelled)?;
                    attempt += 1;
                }
            }
        }
    }

    async fn cancellable<F: Future>(&self, future: F) -> Result<F::Output, CycleError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CycleError::Cancelled),
            output = future => Ok(output),
        }
    }

    async fn sleep(&self, duration: Duration) -> Result<(), CycleError> {
        self.cancellable(tokio::time::sleep(duration)).await
    }
}

enum FetchError {
    Cancelled,
    Provider(ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon_node::SyncStatus;
    use crate::key_directory::KeyDirectoryError;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use types::test_utils::{StateBuilder, TestValidator, test_pubkey};
    use types::{ForkName, PublicKeyBytes};

    const LAG: u64 = 3;
    const GWEI_PER_EPOCH: u64 = 10_000_000;

    // -- mocks --

    #[derive(Default)]
    struct MockNode {
        inner: Mutex<MockNodeState>,
    }

    #[derive(Default)]
    struct MockNodeState {
        head_slot: u64,
        syncing: bool,
        status_error: bool,
        unsupported_fork: bool,
        failing: HashSet<Epoch>,
        fetched: Vec<Epoch>,
    }

    impl MockNode {
        fn at_epoch(epoch: u64) -> Arc<Self> {
            let node = Arc::new(Self::default());
            node.set_processable_epoch(epoch);
            node
        }

        /// Move the head so that `epoch` is the newest epoch the controller processes.
        fn set_processable_epoch(&self, epoch: u64) {
            self.inner.lock().head_slot = (epoch + LAG) * SLOTS_PER_EPOCH + 5;
        }

        fn fetched(&self) -> Vec<u64> {
            self.inner.lock().fetched.iter().map(|e| e.as_u64()).collect()
        }
    }

    /// Validators 0 and 1 earn `GWEI_PER_EPOCH` every epoch from 32 ETH at epoch 99. Validator 2
    /// has its effective balance raised at epoch 100.
    fn mock_state(epoch: Epoch) -> BeaconState {
        let e = epoch.as_u64();
        let balance = 32_000_000_000 + e.saturating_sub(99) * GWEI_PER_EPOCH;
        let effective_2 = if e < 100 { 31_000_000_000 } else { 32_000_000_000 };
        StateBuilder::new(e)
            .validator(TestValidator::new(0).balance(balance))
            .validator(TestValidator::new(1).balance(balance).participation(0b001))
            .validator(TestValidator::new(2).effective_balance(effective_2).slashed())
            .sync_committee(vec![test_pubkey(1), test_pubkey(0), test_pubkey(1)])
            .build()
    }

    impl StateProvider for MockNode {
        async fn node_sync_status(&self) -> Result<SyncStatus, ProviderError> {
            let inner = self.inner.lock();
            if inner.status_error {
                return Err(ProviderError::Unavailable("connection refused".to_string()));
            }
            Ok(SyncStatus {
                is_syncing: inner.syncing,
                head_slot: Slot::new(inner.head_slot),
            })
        }

        async fn fetch_state(&self, epoch: Epoch) -> Result<BeaconState, ProviderError> {
            let mut inner = self.inner.lock();
            inner.fetched.push(epoch);
            if inner.unsupported_fork {
                return Err(ProviderError::StateVersion(
                    StateVersionError::UnsupportedFork(ForkName::Phase0),
                ));
            }
            if inner.failing.contains(&epoch) {
                return Err(ProviderError::Unavailable("timeout".to_string()));
            }
            Ok(mock_state(epoch))
        }
    }

    #[derive(Default)]
    struct MockDirectory {
        keys: HashMap<String, Vec<PublicKeyBytes>>,
        failing: AtomicBool,
    }

    impl KeyDirectory for MockDirectory {
        async fn keys_for_addresses(
            &self,
            addresses: &[String],
        ) -> Result<Vec<PublicKeyBytes>, KeyDirectoryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(KeyDirectoryError::SQLError("database is locked".to_string()));
            }
            Ok(addresses
                .iter()
                .flat_map(|a| self.keys.get(a).cloned().unwrap_or_default())
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<PoolReport>>,
        network: Mutex<Vec<NetworkStats>>,
    }

    impl PerformanceSink for RecordingSink {
        fn report(&self, report: &PoolReport) {
            self.reports.lock().push(report.clone());
        }

        fn report_network(&self, stats: &NetworkStats) {
            self.network.lock().push(*stats);
        }
    }

    fn static_pool(name: &str, seeds: &[u64]) -> Pool {
        Pool {
            name: name.to_string(),
            keys: PoolKeys::Static(seeds.iter().copied().map(test_pubkey).collect()),
        }
    }

    fn address_pool(name: &str, address: &str) -> Pool {
        Pool {
            name: name.to_string(),
            keys: PoolKeys::DepositAddresses(vec![address.to_string()]),
        }
    }

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            idle_interval: Duration::from_millis(1),
            fetch_attempts: 2,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    type TestController = EpochCycleController<Arc<MockNode>, Arc<MockDirectory>>;

    fn controller(
        node: &Arc<MockNode>,
        directory: &Arc<MockDirectory>,
        pools: Vec<Pool>,
        sink: &Arc<RecordingSink>,
    ) -> TestController {
        EpochCycleController::new(
            node.clone(),
            directory.clone(),
            pools,
            vec![sink.clone() as Arc<dyn PerformanceSink>],
            LAG,
            test_policy(),
            CancellationToken::new(),
        )
    }

    fn processed(epoch: u64, pools_reported: usize, pools_skipped: usize) -> CycleOutcome {
        CycleOutcome::Processed {
            epoch: Epoch::new(epoch),
            pools_reported,
            pools_skipped,
        }
    }

    // -- happy path --

    #[tokio::test]
    async fn first_cycle_fetches_both_states() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        assert_eq!(controller.run_cycle().await.unwrap(), processed(100, 1, 0));
        assert_eq!(node.fetched(), vec![100, 99]);
        assert_eq!(controller.last_processed_epoch(), Some(Epoch::new(100)));
        assert_eq!(controller.retained_state_epoch(), Some(Epoch::new(100)));

        let reports = sink.reports.lock();
        assert_eq!(reports.len(), 1);
        let m = &reports[0].metrics;
        assert_eq!(reports[0].pool, "a");
        assert_eq!(m.epoch, Epoch::new(100));
        assert_eq!(m.n_validating_keys, 1);
        assert_eq!(m.n_incorrect_source + m.n_incorrect_target + m.n_incorrect_head, 0);
        assert_eq!(m.earned_balance, 10_000_000);
        assert_eq!(m.total_rewards, 10_000_000);
        assert_eq!(m.delta_epoch_balance, 10_000_000);
        assert_eq!(m.sync_committee_members, vec![0]);

        let network = sink.network.lock();
        assert_eq!(network[0].total_validators, 3);
        assert_eq!(network[0].total_slashed_validators, 1);
    }

    #[tokio::test]
    async fn same_epoch_is_idle() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        controller.run_cycle().await.unwrap();
        assert_eq!(
            controller.run_cycle().await.unwrap(),
            CycleOutcome::Idle {
                epoch: Epoch::new(100)
            }
        );
        assert_eq!(node.fetched(), vec![100, 99]);
        assert_eq!(sink.reports.lock().len(), 1);
    }

    #[tokio::test]
    async fn next_epoch_reuses_retained_state() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0, 1])], &sink);

        controller.run_cycle().await.unwrap();
        node.set_processable_epoch(101);
        assert_eq!(controller.run_cycle().await.unwrap(), processed(101, 1, 0));
        assert_eq!(node.fetched(), vec![100, 99, 101]);

        let reports = sink.reports.lock();
        let m = &reports[1].metrics;
        assert_eq!(m.epoch, Epoch::new(101));
        assert_eq!(m.n_total_votes, 6);
        assert_eq!(m.n_incorrect_target, 1);
        assert_eq!(m.n_incorrect_head, 1);
        assert!(m.indexes_missed_att.is_empty());
        assert_eq!(m.earned_balance, 2 * GWEI_PER_EPOCH as u128);
        assert_eq!(m.sync_committee_members, vec![1, 0, 1]);
    }

    #[tokio::test]
    async fn head_jump_refetches_previous() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        controller.run_cycle().await.unwrap();
        node.set_processable_epoch(103);
        assert_eq!(controller.run_cycle().await.unwrap(), processed(103, 1, 0));
        assert_eq!(node.fetched(), vec![100, 99, 103, 102]);
    }

    // -- per-pool skips --

    #[tokio::test]
    async fn bad_pools_are_skipped() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let pools = vec![
            static_pool("empty", &[]),
            static_pool("unregistered", &[42]),
            static_pool("top_up", &[2]),
            static_pool("good", &[0]),
            address_pool("no_deposits", "0xae7ab96520de3a18e5e111b5eaab095312d7fe84"),
        ];
        let mut controller = controller(&node, &directory, pools, &sink);

        assert_eq!(controller.run_cycle().await.unwrap(), processed(100, 1, 4));
        let reports = sink.reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].pool, "good");
    }

    #[tokio::test]
    async fn deposit_address_pools() {
        let node = MockNode::at_epoch(100);
        let address = "0xae7ab96520de3a18e5e111b5eaab095312d7fe84";
        let mut directory = MockDirectory::default();
        directory
            .keys
            .insert(address.to_string(), vec![test_pubkey(0), test_pubkey(1)]);
        let directory = Arc::new(directory);
        let sink = Arc::new(RecordingSink::default());
        let mut controller =
            controller(&node, &directory, vec![address_pool("lido", address)], &sink);

        assert_eq!(controller.run_cycle().await.unwrap(), processed(100, 1, 0));
        let reports = sink.reports.lock();
        assert_eq!(reports[0].n_deposited_keys, 2);
        assert_eq!(reports[0].metrics.n_validating_keys, 2);
    }

    // -- failures --

    #[tokio::test]
    async fn syncing_node_is_not_queried() {
        let node = MockNode::at_epoch(100);
        node.inner.lock().syncing = true;
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        assert!(matches!(
            controller.run_cycle().await,
            Ok(CycleOutcome::Syncing { .. })
        ));
        assert!(node.fetched().is_empty());

        node.inner.lock().syncing = false;
        assert_eq!(controller.run_cycle().await.unwrap(), processed(100, 1, 0));
    }

    #[tokio::test]
    async fn unreachable_node_is_transient() {
        let node = MockNode::at_epoch(100);
        node.inner.lock().status_error = true;
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        let error = controller.run_cycle().await.unwrap_err();
        assert!(matches!(error, CycleError::SyncStatus(_)));
        assert!(error.fatal().is_none());
    }

    #[tokio::test]
    async fn current_fetch_failure_drops_retained_state() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        controller.run_cycle().await.unwrap();
        node.set_processable_epoch(101);
        node.inner.lock().failing.insert(Epoch::new(101));

        let error = controller.run_cycle().await.unwrap_err();
        assert!(matches!(error, CycleError::CurrentState(epoch, _) if epoch == Epoch::new(101)));
        assert_eq!(controller.retained_state_epoch(), None);
        assert_eq!(controller.last_processed_epoch(), Some(Epoch::new(100)));
        // Both attempts were made.
        assert_eq!(node.fetched(), vec![100, 99, 101, 101]);

        node.inner.lock().failing.clear();
        assert_eq!(controller.run_cycle().await.unwrap(), processed(101, 1, 0));
        assert_eq!(node.fetched(), vec![100, 99, 101, 101, 101, 100]);
    }

    #[tokio::test]
    async fn previous_fetch_failure_aborts_cycle() {
        let node = MockNode::at_epoch(100);
        node.inner.lock().failing.insert(Epoch::new(99));
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        assert!(matches!(
            controller.run_cycle().await,
            Err(CycleError::PreviousState(..))
        ));
        assert_eq!(controller.last_processed_epoch(), None);
        assert!(sink.reports.lock().is_empty());
    }

    #[tokio::test]
    async fn key_directory_failure_skips_only_that_pool() {
        let node = MockNode::at_epoch(100);
        let address = "0xae7ab96520de3a18e5e111b5eaab095312d7fe84";
        let directory = Arc::new(MockDirectory::default());
        directory.failing.store(true, Ordering::SeqCst);
        let sink = Arc::new(RecordingSink::default());
        let pools = vec![address_pool("lido", address), static_pool("good", &[0])];
        let mut controller = controller(&node, &directory, pools, &sink);

        assert_eq!(controller.run_cycle().await.unwrap(), processed(100, 1, 1));
        assert_eq!(controller.last_processed_epoch(), Some(Epoch::new(100)));
        {
            let reports = sink.reports.lock();
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].pool, "good");
        }

        // A directory that keeps failing does not hold back later epochs.
        node.set_processable_epoch(101);
        assert_eq!(controller.run_cycle().await.unwrap(), processed(101, 1, 1));
        assert_eq!(node.fetched(), vec![100, 99, 101]);
        assert_eq!(sink.reports.lock().len(), 2);
    }

    #[tokio::test]
    async fn unsupported_state_is_fatal() {
        let node = MockNode::at_epoch(100);
        node.inner.lock().unsupported_fork = true;
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        assert_eq!(
            controller.run().await,
            Err(FatalError::StateVersion(StateVersionError::UnsupportedFork(
                ForkName::Phase0
            )))
        );
        // Not retried.
        assert_eq!(node.fetched(), vec![100]);
    }

    #[tokio::test]
    async fn head_before_lag_is_idle() {
        let node = Arc::new(MockNode::default());
        node.inner.lock().head_slot = 2 * SLOTS_PER_EPOCH;
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);

        assert_eq!(
            controller.run_cycle().await.unwrap(),
            CycleOutcome::Idle {
                epoch: Epoch::new(0)
            }
        );
        assert!(node.fetched().is_empty());
    }

    // -- cancellation --

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let node = MockNode::at_epoch(100);
        let directory = Arc::new(MockDirectory::default());
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(&node, &directory, vec![static_pool("a", &[0])], &sink);
        let cancel = controller.cancel.clone();

        let handle = tokio::spawn(controller.run());
        // Let it process the epoch and settle into idling.
        while sink.reports.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), Ok(()));
        assert_eq!(node.fetched(), vec![100, 99]);
    }
}
