//! Session material exchanged with the signing network.

use crate::SigningError;
use alloy_primitives::{Address, B256, Bytes, Signature, U256};
use chrono::{DateTime, Utc};
use litsafe_common::IdToken;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Auth method type the network assigns to Google OAuth id tokens.
pub const GOOGLE_AUTH_METHOD_TYPE: u32 = 6;

/// Chain the session capabilities are scoped to.
pub const DEFAULT_SESSION_CHAIN: &str = "ethereum";

/// Resource granting execution of any action.
pub const ANY_ACTION_RESOURCE: &str = "litAction://*";

/// Proof of an external identity that controls a PKP.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMethod {
    pub auth_method_type: u32,
    pub access_token: String,
}

impl AuthMethod {
    pub fn google(token: &IdToken) -> Self {
        Self { auth_method_type: GOOGLE_AUTH_METHOD_TYPE, access_token: token.as_str().to_string() }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthMethod")
            .field("auth_method_type", &self.auth_method_type)
            .field("access_token", &"..")
            .finish()
    }
}

/// What the caller asks the network for when opening a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub chain: String,
    pub resources: Vec<String>,
    pub expiration: DateTime<Utc>,
}

impl SessionRequest {
    /// A session on `ethereum` allowed to run any action until `expiration`.
    pub fn any_action(expiration: DateTime<Utc>) -> Self {
        Self {
            chain: DEFAULT_SESSION_CHAIN.to_string(),
            resources: vec![ANY_ACTION_RESOURCE.to_string()],
            expiration,
        }
    }
}

/// Parameters the network hands to the auth callback while it builds a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthCallbackParams {
    pub chain: String,
    pub resources: Vec<String>,
    pub expiration: DateTime<Utc>,
    /// Identifier of the ephemeral session key to be certified.
    pub session_key_uri: String,
}

/// The callback's answer: a request to certify the session key with a PKP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeyAuth {
    pub session_key_uri: String,
    pub auth_methods: Vec<AuthMethod>,
    pub pkp_public_key: Bytes,
    pub chain: String,
    pub resources: Vec<String>,
    pub expiration: DateTime<Utc>,
}

/// A node's certification of the session key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    pub sig: Signature,
    pub derived_via: String,
    pub signed_message: String,
    pub address: Address,
}

/// Per-node signatures authorizing a session key to act for one PKP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSigs {
    pub pkp_public_key: Bytes,
    /// The session key the node signatures certify.
    pub session_key_uri: String,
    pub chain: String,
    pub expiration: DateTime<Utc>,
    pub resources: Vec<String>,
    /// Keyed by node URL.
    pub sigs: BTreeMap<String, AuthSig>,
}

impl SessionSigs {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }

    /// Whether `resource` is covered by one of the granted resources, where a trailing `*`
    /// matches any suffix.
    pub fn allows(&self, resource: &str) -> bool {
        self.resources.iter().any(|granted| match granted.strip_suffix('*') {
            Some(prefix) => resource.starts_with(prefix),
            None => granted == resource,
        })
    }

    /// Fails unless the session is unexpired, issued for `public_key` and grants `resource`.
    pub fn check(&self, public_key: &Bytes, resource: &str) -> Result<(), SigningError> {
        if self.pkp_public_key != *public_key {
            return Err(SigningError::WrongPkp(public_key.clone()));
        }
        if self.is_expired_at(Utc::now()) {
            return Err(SigningError::SessionExpired(self.expiration));
        }
        if !self.allows(resource) {
            return Err(SigningError::ResourceNotAllowed(resource.to_string()));
        }
        Ok(())
    }
}

/// A combined ECDSA signature as returned by the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSignature {
    pub name: String,
    pub r: B256,
    pub s: B256,
    pub recid: u8,
}

impl ThresholdSignature {
    /// Joins `r`, `s` and the recovery id into a standard signature.
    ///
    /// Both the raw parity (0, 1) and the legacy `v` (27, 28) forms are accepted.
    pub fn to_signature(&self) -> Result<Signature, SigningError> {
        let parity = match self.recid {
            0 | 27 => false,
            1 | 28 => true,
            other => return Err(SigningError::InvalidRecoveryId(other)),
        };
        Ok(Signature::new(U256::from_be_bytes(self.r.0), U256::from_be_bytes(self.s.0), parity))
    }
}
