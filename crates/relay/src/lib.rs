//! # litsafe-relay
//!
//! Client for the relay server that mints programmable key-pairs on behalf of a Google identity
//! and looks up the key-pairs already bound to it.
//!
//! | Operation | Request | Response |
//! |---|---|---|
//! | mint | `POST /auth/google` `{"idToken"}` | `{"requestId"}` |
//! | status | `GET /auth/status/{requestId}` | `{"status", "pkpEthAddress", "pkpPublicKey", "error"}` |
//! | fetch | `POST /auth/google/userinfo` `{"idToken"}` | `{"pkps": [..]}` |

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use async_trait::async_trait;
use litsafe_common::{IdToken, Pkp};
use litsafe_config::Config;
use reqwest::{RequestBuilder, header::HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

mod error;
pub use error::RelayError;

mod types;
pub use types::{MintStatus, RequestId};
use types::{FetchResponse, IdTokenBody, MintResponse, StatusResponse};

/// Header carrying the relay API key.
pub const API_KEY_HEADER: &str = "api-key";

/// The operations the workflow needs from a relay.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Starts minting a key-pair for `token` and returns the request to poll.
    async fn mint(&self, token: &IdToken) -> Result<RequestId, RelayError>;

    /// Polls `request_id` until the mint succeeds, fails, or the retry budget is spent.
    async fn poll_until_terminal(&self, request_id: &RequestId) -> Result<Pkp, RelayError>;

    /// Returns the key-pairs already bound to `token`. An empty list is not an error.
    async fn fetch_existing(&self, token: &IdToken) -> Result<Vec<Pkp>, RelayError>;

    /// Mints a key-pair and waits for it.
    async fn mint_and_wait(&self, token: &IdToken) -> Result<Pkp, RelayError> {
        let request_id = self.mint(token).await?;
        self.poll_until_terminal(&request_id).await
    }
}

/// How often and how long a mint is polled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status requests.
    pub interval: Duration,
    /// Status requests sent before giving up.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(15), max_attempts: 20 }
    }
}

/// HTTP [`Relay`] implementation.
#[derive(Clone, Debug)]
pub struct RelayClient {
    client: reqwest::Client,
    base: Url,
    api_key: Option<HeaderValue>,
    poll: PollConfig,
}

impl RelayClient {
    /// Creates a client for the relay at `base`.
    pub fn new(base: Url) -> Self {
        Self { client: reqwest::Client::new(), base, api_key: None, poll: PollConfig::default() }
    }

    /// Creates a client from the relay settings of `config`.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let mut relay = Self::new(config.relay_url.clone()).with_poll(PollConfig {
            interval: config.poll.interval(),
            max_attempts: config.poll.max_attempts,
        });
        if let Some(key) = &config.relay_api_key {
            relay = relay.with_api_key(key)?;
        }
        Ok(relay)
    }

    /// Sends `key` in the `api-key` header of every request.
    pub fn with_api_key(mut self, key: &str) -> Result<Self, RelayError> {
        let mut value = HeaderValue::from_str(key).map_err(|_| RelayError::InvalidApiKey)?;
        value.set_sensitive(true);
        self.api_key = Some(value);
        Ok(self)
    }

    /// Overrides the mint polling schedule. At least one status request is always sent.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = PollConfig { max_attempts: poll.max_attempts.max(1), ..poll };
        self
    }

    /// Uses `client` for all requests.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the polling schedule.
    pub fn poll(&self) -> PollConfig {
        self.poll
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, RelayError> {
        let request = match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.clone()),
            None => request,
        };
        let transport =
            |source| RelayError::Transport { url: url.to_string(), source };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        trace!(target: "relay", %url, %status, "relay responded");

        if !status.is_success() {
            return Err(RelayError::Status { url: url.to_string(), status, body });
        }
        serde_json::from_str(&body).map_err(|err| RelayError::MalformedResponse {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl Relay for RelayClient {
    async fn mint(&self, token: &IdToken) -> Result<RequestId, RelayError> {
        let url = self.endpoint(&["auth", "google"]);
        debug!(target: "relay", %url, "requesting key-pair mint");
        let response: MintResponse =
            self.send(self.client.post(url.clone()).json(&IdTokenBody::from(token)), &url).await?;
        match response.request_id {
            Some(id) if !id.is_empty() => Ok(RequestId(id)),
            _ => Err(RelayError::MintRejected),
        }
    }

    async fn poll_until_terminal(&self, request_id: &RequestId) -> Result<Pkp, RelayError> {
        let url = self.endpoint(&["auth", "status", &request_id.0]);
        let PollConfig { interval, max_attempts } = self.poll;

        for attempt in 1..=max_attempts {
            let status: StatusResponse = self.send(self.client.get(url.clone()), &url).await?;
            if let Some(reason) = status.error.clone() {
                return Err(RelayError::MintFailed { request_id: request_id.clone(), reason });
            }
            match status.status.clone() {
                Some(MintStatus::Succeeded) => {
                    let Some(pkp) = status.into_pkp() else {
                        return Err(RelayError::MintFailed {
                            request_id: request_id.clone(),
                            reason: "relay reported success without an address and public key"
                                .to_string(),
                        });
                    };
                    if !pkp.is_consistent() {
                        warn!(target: "relay", address = %pkp.eth_address, "minted address does not match its public key");
                    }
                    debug!(target: "relay", %request_id, address = %pkp.eth_address, attempt, "mint succeeded");
                    return Ok(pkp);
                }
                Some(MintStatus::Failed) => {
                    return Err(RelayError::MintFailed {
                        request_id: request_id.clone(),
                        reason: "relay reported the mint as failed".to_string(),
                    });
                }
                Some(MintStatus::Pending(ref raw)) => {
                    trace!(target: "relay", %request_id, attempt, status = %raw, "mint pending");
                }
                None => trace!(target: "relay", %request_id, attempt, "mint pending"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(RelayError::MintTimeout { request_id: request_id.clone(), attempts: max_attempts })
    }

    async fn fetch_existing(&self, token: &IdToken) -> Result<Vec<Pkp>, RelayError> {
        let url = self.endpoint(&["auth", "google", "userinfo"]);
        debug!(target: "relay", %url, "fetching key-pairs");
        let response: FetchResponse =
            self.send(self.client.post(url.clone()).json(&IdTokenBody::from(token)), &url).await?;
        let pkps = response.pkps.ok_or_else(|| RelayError::MalformedResponse {
            url: url.to_string(),
            reason: "missing `pkps`".to_string(),
        })?;
        debug!(target: "relay", count = pkps.len(), "fetched key-pairs");
        Ok(pkps)
    }
}
