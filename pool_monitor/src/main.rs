use clap::Parser;
use pool_monitor::cli::Cli;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Held until exit so buffered log lines are flushed.
    let _guard = match logging::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Unable to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal");
                    signal_cancel.cancel();
                }
                Err(e) => error!(error = %e, "Unable to listen for shutdown signal"),
            }
        });

        pool_monitor::run(config, cancel).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Pool monitor failed");
            ExitCode::FAILURE
        }
    }
}
