//! Follows the beacon chain one epoch at a time and reports the attestation performance,
//! balance changes and sync committee membership of configured staking pools.

pub mod beacon_node;
pub mod cli;
pub mod config;
pub mod controller;
pub mod http_metrics;
pub mod key_directory;
pub mod metrics;
pub mod pools;
pub mod retry;
pub mod sinks;

use crate::config::Config;
use crate::controller::EpochCycleController;
use crate::key_directory::{KeyDirectory, NoKeyDirectory, SqliteKeyDirectory};
use crate::pools::Pool;
use crate::sinks::{LogSink, PerformanceSink, PrometheusSink};
use eth2::{BeaconNodeHttpClient, Timeouts};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the monitor until `cancel` fires. Errors are startup failures or conditions the monitor
/// cannot recover from.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<(), String> {
    config.validate().map_err(|e| e.to_string())?;
    let pools =
        pools::load_pools(&config.pools, &config.pool_addresses).map_err(|e| e.to_string())?;

    let beacon_node_url = config.beacon_node_url().map_err(|e| e.to_string())?;
    let timeouts = Timeouts {
        get_debug_beacon_states: Duration::from_secs(config.state_timeout_secs),
        ..Timeouts::default()
    };
    info!(
        beacon_node = %beacon_node_url,
        pools = ?pools.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "Configured pool monitor"
    );
    if let Some(url) = config.execution_node_url().map_err(|e| e.to_string())? {
        info!(execution_node = %url, "Execution node configured");
    }
    let client = BeaconNodeHttpClient::new(beacon_node_url, timeouts);

    let deposit_directory = match &config.deposit_database {
        Some(path) => {
            let directory = SqliteKeyDirectory::open(path)
                .map_err(|e| format!("unable to open {}: {}", path.display(), e))?;
            info!(path = %path.display(), "Opened deposit database");
            Some(directory)
        }
        None => {
            if let Some(pool) = pools.iter().find(|pool| pool.needs_key_directory()) {
                return Err(format!(
                    "pool {} is defined by deposit addresses, which requires a deposit database",
                    pool.name
                ));
            }
            None
        }
    };

    // Nothing below returns before the shutdown path at the end.
    let server_handle = if config.metrics.enabled {
        let (_, server) =
            http_metrics::serve(&config.metrics, cancel.clone().cancelled_owned())
                .map_err(|e| e.to_string())?;
        Some(tokio::spawn(server))
    } else {
        None
    };

    let result = match deposit_directory {
        Some(directory) => {
            run_controller(&config, client, directory, pools, cancel.clone()).await
        }
        None => run_controller(&config, client, NoKeyDirectory, pools, cancel.clone()).await,
    };

    // A fatal error leaves the metrics server running otherwise.
    cancel.cancel();
    if let Some(handle) = server_handle
        && let Err(e) = handle.await
    {
        warn!(error = %e, "Metrics server did not shut down cleanly");
    }

    result
}

async fn run_controller<K: KeyDirectory>(
    config: &Config,
    client: BeaconNodeHttpClient,
    key_directory: K,
    pools: Vec<Pool>,
    cancel: CancellationToken,
) -> Result<(), String> {
    let sinks: Vec<Arc<dyn PerformanceSink>> = vec![Arc::new(PrometheusSink), Arc::new(LogSink)];
    EpochCycleController::new(
        client,
        key_directory,
        pools,
        sinks,
        config.epoch_lag,
        config.retry_policy(),
        cancel,
    )
    .run()
    .await
    .map_err(|e| e.to_string())
}
