//! Relay wire types.

use alloy_primitives::{Address, Bytes, U256};
use litsafe_common::{IdToken, Pkp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an in-flight mint, used to poll its status.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdTokenBody<'a> {
    pub(crate) id_token: &'a str,
}

impl<'a> From<&'a IdToken> for IdTokenBody<'a> {
    fn from(token: &'a IdToken) -> Self {
        Self { id_token: token.as_str() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MintResponse {
    #[serde(default)]
    pub(crate) request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FetchResponse {
    #[serde(default)]
    pub(crate) pkps: Option<Vec<Pkp>>,
}

/// Progress of a mint as reported by the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MintStatus {
    /// The key-pair was minted.
    Succeeded,
    /// The mint transaction failed.
    Failed,
    /// Anything else; the raw status is kept for logging.
    Pending(String),
}

impl From<String> for MintStatus {
    fn from(status: String) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" | "success" => Self::Succeeded,
            "failed" | "error" => Self::Failed,
            _ => Self::Pending(status),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub(crate) status: Option<MintStatus>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) pkp_eth_address: Option<Address>,
    #[serde(default)]
    pub(crate) pkp_public_key: Option<Bytes>,
    #[serde(default, deserialize_with = "litsafe_common::serde_helpers::from_int_or_hex_opt")]
    pub(crate) pkp_token_id: Option<U256>,
}

impl StatusResponse {
    /// Returns the minted key-pair if both the address and the public key are present.
    pub(crate) fn into_pkp(self) -> Option<Pkp> {
        let public_key = self.pkp_public_key.filter(|key| !key.is_empty())?;
        Some(Pkp { token_id: self.pkp_token_id, public_key, eth_address: self.pkp_eth_address? })
    }
}
