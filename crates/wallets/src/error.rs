use alloy_primitives::Bytes;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing network is not connected")]
    NotConnected,
    #[error("failed to connect to the signing network: {0}")]
    Connect(String),
    #[error("authentication rejected: {0}")]
    Authentication(String),
    #[error("no PKP with public key {0} is known to the signing network")]
    UnknownPkp(Bytes),
    #[error("session is not valid for PKP {0}")]
    WrongPkp(Bytes),
    #[error("session expired at {0}")]
    SessionExpired(DateTime<Utc>),
    #[error("session does not grant access to `{0}`")]
    ResourceNotAllowed(String),
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signing network returned no signature named `{0}`")]
    MissingSignature(String),
    #[error("signing network error: {0}")]
    Network(String),
    #[error(transparent)]
    Signer(#[from] alloy_signer::Error),
}
