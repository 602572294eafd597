//! Delegated key-pairs and the identity token they are bound to.

use alloy_primitives::{Address, Bytes, U256, keccak256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Google-issued OpenID identity token (JWT).
///
/// The token is a bearer credential, so its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdToken(String);

impl IdToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdToken(..)")
    }
}

impl From<String> for IdToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for IdToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// A programmable key-pair whose private key is held by the signing network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pkp {
    /// NFT token id of the key-pair, when the relay reports it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::serde_helpers::from_int_or_hex_opt"
    )]
    pub token_id: Option<U256>,
    /// Uncompressed secp256k1 public key, `0x04` prefixed.
    pub public_key: Bytes,
    /// Ethereum address derived from `public_key`.
    pub eth_address: Address,
}

impl Pkp {
    /// Creates a key-pair from its public key, deriving the address.
    ///
    /// Returns `None` if `public_key` is not a 64 or 65 byte secp256k1 key.
    pub fn from_public_key(public_key: Bytes) -> Option<Self> {
        let eth_address = address_from_public_key(&public_key)?;
        Some(Self { token_id: None, public_key, eth_address })
    }

    /// Returns `true` if `eth_address` is the address of `public_key`.
    pub fn is_consistent(&self) -> bool {
        address_from_public_key(&self.public_key) == Some(self.eth_address)
    }
}

/// Derives the Ethereum address of an uncompressed secp256k1 public key.
///
/// Accepts the 65 byte SEC1 form (`0x04 || x || y`) or the raw 64 byte `x || y`.
pub fn address_from_public_key(public_key: &[u8]) -> Option<Address> {
    let raw = match public_key {
        [0x04, rest @ ..] if rest.len() == 64 => rest,
        raw if raw.len() == 64 => raw,
        _ => return None,
    };
    Some(Address::from_slice(&keccak256(raw)[12..]))
}
