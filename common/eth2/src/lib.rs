//! A wrapper around `reqwest` that forms a HTTP client for the standard beacon node API, limited
//! to the endpoints the pool monitor consumes.

pub mod mixin;
pub mod types;

use self::mixin::{ResponseForkName, ResponseOptional};
use self::types::*;
pub use reqwest;
use reqwest::{IntoUrl, RequestBuilder, Response, header::ACCEPT};
pub use reqwest::{StatusCode, Url};
pub use sensitive_url::{SensitiveError, SensitiveUrl};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use ::types::{BeaconState, BeaconStateError, StateVersionError};

pub const V1: EndpointVersion = EndpointVersion(1);
pub const V2: EndpointVersion = EndpointVersion(2);

pub const CONSENSUS_VERSION_HEADER: &str = "Eth-Consensus-Version";
pub const JSON_CONTENT_TYPE_HEADER: &str = "application/json";

#[derive(Debug)]
pub enum Error {
    /// The `reqwest` client raised an error.
    HttpClient(reqwest::Error),
    /// The server returned an error message where the body was able to be parsed.
    ServerMessage(ErrorMessage),
    /// The server returned an error message where the body was unable to be parsed.
    StatusCode(StatusCode),
    /// The supplied URL is badly formatted. It should look something like `http://127.0.0.1:5052`.
    InvalidUrl(SensitiveUrl),
    /// The server returned an invalid JSON response.
    InvalidJson(serde_json::Error),
    /// The server sent invalid response headers.
    InvalidHeaders(String),
    /// The state body did not match the layout of its fork.
    InvalidState(String),
    /// The state's fork is missing, unknown or predates participation flags.
    StateVersion(StateVersionError),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::HttpClient(error)
    }
}

impl From<BeaconStateError> for Error {
    fn from(error: BeaconStateError) -> Self {
        match error {
            BeaconStateError::Version(e) => Error::StateVersion(e),
            BeaconStateError::InvalidJson(e) => Error::InvalidState(e),
            other => Error::InvalidState(format!("{:?}", other)),
        }
    }
}

impl Error {
    /// If the error has a HTTP status code, return it.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpClient(error) => error.status(),
            Error::ServerMessage(msg) => StatusCode::try_from(msg.code).ok(),
            Error::StatusCode(status) => Some(*status),
            Error::InvalidUrl(_) => None,
            Error::InvalidJson(_) => None,
            Error::InvalidHeaders(_) => None,
            Error::InvalidState(_) => None,
            Error::StateVersion(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-request timeouts. Full states are tens of megabytes on mainnet and need far longer than a
/// status query.
#[derive(Clone, Debug)]
pub struct Timeouts {
    pub get_node_syncing: Duration,
    pub get_debug_beacon_states: Duration,
}

impl Timeouts {
    pub fn set_all(timeout: Duration) -> Self {
        Timeouts {
            get_node_syncing: timeout,
            get_debug_beacon_states: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            get_node_syncing: Duration::from_secs(12),
            get_debug_beacon_states: Duration::from_secs(300),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EndpointVersion(pub u64);

impl fmt::Display for EndpointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A wrapper around `reqwest::Client` which provides convenience methods for interfacing with a
/// beacon node HTTP server.
#[derive(Clone)]
pub struct BeaconNodeHttpClient {
    client: reqwest::Client,
    server: SensitiveUrl,
    timeouts: Timeouts,
}

impl fmt::Display for BeaconNodeHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.server.fmt(f)
    }
}

impl AsRef<str> for BeaconNodeHttpClient {
    fn as_ref(&self) -> &str {
        self.server.as_ref()
    }
}

impl BeaconNodeHttpClient {
    pub fn new(server: SensitiveUrl, timeouts: Timeouts) -> Self {
        Self {
            client: reqwest::Client::new(),
            server,
            timeouts,
        }
    }

    /// Return the path with the standard `/eth/vX` prefix applied.
    fn eth_path(&self, version: EndpointVersion) -> Result<Url, Error> {
        let mut path = self.server.full().clone();

        path.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(self.server.clone()))?
            .pop_if_empty()
            .push("eth")
            .push(&version.to_string());

        Ok(path)
    }

    /// Perform a HTTP GET request with a custom timeout.
    async fn get_with_timeout<T: DeserializeOwned, U: IntoUrl>(
        &self,
        url: U,
        timeout: Duration,
    ) -> Result<T, Error> {
        let response = self
            .get_response(url, |builder| builder.timeout(timeout))
            .await?;
        Ok(response.json().await?)
    }

    /// Perform an HTTP GET request, returning the `Response` for processing.
    pub async fn get_response<U: IntoUrl>(
        &self,
        url: U,
        builder: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, Error> {
        let response = builder(self.client.get(url)).send().await?;
        ok_or_error(response).await
    }

    /// `GET node/syncing`
    pub async fn get_node_syncing(&self) -> Result<GenericResponse<SyncingData>, Error> {
        let mut path = self.eth_path(V1)?;

        path.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(self.server.clone()))?
            .push("node")
            .push("syncing");

        self.get_with_timeout(path, self.timeouts.get_node_syncing)
            .await
    }

    /// Path for `v2/debug/beacon/states/{state_id}`.
    pub fn get_debug_beacon_states_path(&self, state_id: StateId) -> Result<Url, Error> {
        let mut path = self.eth_path(V2)?;

        path.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(self.server.clone()))?
            .push("debug")
            .push("beacon")
            .push("states")
            .push(&state_id.to_string());

        Ok(path)
    }

    /// `GET v2/debug/beacon/states/{state_id}`
    ///
    /// Returns `Ok(None)` on a 404 error. The fork is read from the `Eth-Consensus-Version`
    /// header, falling back to the `version` field of the body.
    pub async fn get_debug_beacon_states(
        &self,
        state_id: StateId,
    ) -> Result<Option<BeaconState>, Error> {
        let path = self.get_debug_beacon_states_path(state_id)?;

        let opt_response = self
            .get_response(path, |b| {
                b.header(ACCEPT, JSON_CONTENT_TYPE_HEADER)
                    .timeout(self.timeouts.get_debug_beacon_states)
            })
            .await
            .optional()?;

        let Some(response) = opt_response else {
            return Ok(None);
        };
        let fork_name = response.fork_name_from_header()?;
        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes).map_err(Error::InvalidJson)?;

        BeaconState::from_versioned_json(fork_name.as_deref(), body)
            .map(Some)
            .map_err(Into::into)
    }
}

/// Returns `Ok(response)` if the response is a `200 OK` response. Otherwise, creates an
/// appropriate error message.
pub async fn ok_or_error(response: Response) -> Result<Response, Error> {
    let status = response.status();

    if status == StatusCode::OK {
        Ok(response)
    } else if let Ok(message) = response.json().await {
        Err(Error::ServerMessage(message))
    } else {
        Err(Error::StatusCode(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::types::{Epoch, ForkName, StateSnapshot};
    use serde_json::json;
    use std::net::SocketAddr;
    use warp::Filter;
    use warp::http::StatusCode as WarpStatus;

    const PUBKEY: &str = "0x933ad9491b62059dd065b560d256d8957a8c402cc6e8d8ee7290ae11e8f7329267a8811c397529dac52ae1342ba58c95";

    fn state_data(slot: u64) -> serde_json::Value {
        json!({
            "genesis_time": "1606824023",
            "slot": slot.to_string(),
            "validators": [{
                "pubkey": PUBKEY,
                "effective_balance": "32000000000",
                "slashed": false,
                "activation_epoch": "0",
                "exit_epoch": "18446744073709551615"
            }],
            "balances": ["32000000001"],
            "previous_epoch_participation": ["7"],
            "current_epoch_participation": ["0"],
            "current_sync_committee": { "pubkeys": [PUBKEY], "aggregate_pubkey": PUBKEY },
            "next_sync_committee": { "pubkeys": [PUBKEY], "aggregate_pubkey": PUBKEY },
            "next_withdrawal_index": "0"
        })
    }

    /// Serve a minimal beacon API on an ephemeral port.
    fn spawn_server() -> SocketAddr {
        let syncing = warp::path!("eth" / "v1" / "node" / "syncing").map(|| {
            warp::reply::json(&json!({
                "data": { "is_syncing": false, "head_slot": "3232", "sync_distance": "0" }
            }))
        });

        let states = warp::path!("eth" / "v2" / "debug" / "beacon" / "states" / String).map(
            |state_id: String| -> Box<dyn warp::Reply> {
                match state_id.as_str() {
                    "3200" => Box::new(warp::reply::with_header(
                        warp::reply::json(&json!({ "version": "altair", "data": state_data(3200) })),
                        CONSENSUS_VERSION_HEADER,
                        "deneb",
                    )),
                    "3168" => Box::new(warp::reply::json(
                        &json!({ "version": "capella", "data": state_data(3168) }),
                    )),
                    "32" => Box::new(warp::reply::json(
                        &json!({ "version": "phase0", "data": state_data(32) }),
                    )),
                    _ => Box::new(warp::reply::with_status(
                        warp::reply::json(&json!({ "code": 404, "message": "NOT_FOUND: beacon state" })),
                        WarpStatus::NOT_FOUND,
                    )),
                }
            },
        );

        let (addr, server) =
            warp::serve(syncing.or(states)).bind_ephemeral(SocketAddr::from(([127, 0, 0, 1], 0)));
        tokio::spawn(server);
        addr
    }

    fn client(addr: SocketAddr) -> BeaconNodeHttpClient {
        let url = SensitiveUrl::parse(&format!("http://{}", addr)).unwrap();
        BeaconNodeHttpClient::new(url, Timeouts::set_all(Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn node_syncing() {
        let client = client(spawn_server());
        let syncing = client.get_node_syncing().await.unwrap().data;
        assert!(!syncing.is_syncing);
        assert_eq!(syncing.head_slot, ::types::Slot::new(3232));
    }

    #[tokio::test]
    async fn header_version_wins() {
        let client = client(spawn_server());
        let state = client
            .get_debug_beacon_states(StateId::Slot(::types::Slot::new(3200)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.fork_name(), ForkName::Deneb);
        assert_eq!(state.current_epoch(), Epoch::new(100));
    }

    #[tokio::test]
    async fn body_version_without_header() {
        let client = client(spawn_server());
        let state = client
            .get_debug_beacon_states(StateId::Slot(::types::Slot::new(3168)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.fork_name(), ForkName::Capella);
    }

    #[tokio::test]
    async fn phase0_state_is_a_version_error() {
        let client = client(spawn_server());
        let result = client
            .get_debug_beacon_states(StateId::Slot(::types::Slot::new(32)))
            .await;
        assert!(matches!(
            result,
            Err(Error::StateVersion(StateVersionError::UnsupportedFork(
                ForkName::Phase0
            )))
        ));
    }

    #[tokio::test]
    async fn missing_state_is_none() {
        let client = client(spawn_server());
        let result = client
            .get_debug_beacon_states(StateId::Slot(::types::Slot::new(64)))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn state_path() {
        let url = SensitiveUrl::parse("http://localhost:5052/").unwrap();
        let client = BeaconNodeHttpClient::new(url, Timeouts::default());
        let path = client
            .get_debug_beacon_states_path(StateId::Slot(::types::Slot::new(3200)))
            .unwrap();
        assert_eq!(
            path.as_str(),
            "http://localhost:5052/eth/v2/debug/beacon/states/3200"
        );
    }
}
