//! Serves the Prometheus registry on `GET /metrics`.

use crate::config::MetricsConfig;
use crate::metrics;
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;
use warp::Filter;
use warp::http::{Response, StatusCode};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug)]
pub enum Error {
    Warp(warp::Error),
}

impl From<warp::Error> for Error {
    fn from(e: warp::Error) -> Self {
        Error::Warp(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Warp(e) => write!(f, "unable to start metrics server: {}", e),
        }
    }
}

/// Bind the metrics server. The returned future runs it until `shutdown` completes.
pub fn serve<S>(
    config: &MetricsConfig,
    shutdown: S,
) -> Result<(SocketAddr, impl Future<Output = ()> + use<S>), Error>
where
    S: Future<Output = ()> + Send + 'static,
{
    let routes = warp::get()
        .and(warp::path("metrics"))
        .and(warp::path::end())
        .map(|| match metrics::gather_as_text() {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", PROMETHEUS_CONTENT_TYPE)
                .body(body),
            Err(e) => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(format!("unable to gather metrics: {}", e)),
        });

    let (listening_socket, server) = warp::serve(routes).try_bind_with_graceful_shutdown(
        SocketAddr::new(config.listen_address, config.listen_port),
        shutdown,
    )?;

    info!(
        listen_address = %listening_socket,
        "Metrics server started"
    );

    Ok((listening_socket, server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio_util::sync::CancellationToken;

    fn ephemeral_config() -> MetricsConfig {
        MetricsConfig {
            enabled: true,
            listen_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port: 0,
        }
    }

    #[tokio::test]
    async fn scrape_and_shutdown() {
        metrics::set_gauge(&metrics::LAST_PROCESSED_EPOCH, 1234);

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let (addr, server) = {
            let config = ephemeral_config();
            serve(&config, async move { shutdown.cancelled().await }).unwrap()
        };
        // The server does not borrow the config it was started from.
        let handle = tokio::spawn(server);

        let response = reqwest::get(format!("http://{}/metrics", addr))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            PROMETHEUS_CONTENT_TYPE
        );
        let body = response.text().await.unwrap();
        assert!(body.contains("pool_monitor_last_processed_epoch"));

        let missing = reqwest::get(format!("http://{}/other", addr)).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn port_in_use() {
        let (addr, _server) = serve(&ephemeral_config(), futures::future::pending()).unwrap();
        let config = MetricsConfig {
            listen_port: addr.port(),
            ..ephemeral_config()
        };
        assert!(matches!(
            serve(&config, futures::future::pending()),
            Err(Error::Warp(_))
        ));
    }
}
