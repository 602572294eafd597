use crate::{state::InvalidTransition, submit::SubmitError};
use alloy_primitives::Address;
use litsafe_auth::RedirectError;
use litsafe_common::errors::display_chain;
use litsafe_relay::RelayError;
use litsafe_safe::{IncompleteInput, PackError, SafeConfigError};
use litsafe_wallets::SigningError;
use std::fmt;

/// Coarse classification of every failure the workflow can surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedRedirect,
    RelayUnavailable,
    MintRejected,
    MintTimeout,
    MintFailed,
    SessionEstablishmentFailed,
    SigningFailed,
    SignatureVerificationMismatch,
    DuplicateSigner,
    InvalidSignatureLength,
    ContractCallFailed,
    UserInputIncomplete,
    InvalidTransition,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("failed to establish a signing session: {0}")]
    Session(#[source] SigningError),
    #[error("signing failed: {0}")]
    Signing(#[source] SigningError),
    #[error("signature recovers to {recovered}, expected {expected}")]
    SignatureMismatch { expected: Address, recovered: Address },
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Incomplete(#[from] IncompleteInput),
    #[error(transparent)]
    SafeConfig(#[from] SafeConfigError),
    #[error("`{0}` is not configured")]
    MissingContract(&'static str),
    #[error("{0} is not one of the fetched PKPs")]
    UnknownPkp(Address),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Redirect(_) => ErrorKind::MalformedRedirect,
            Self::Relay(err) => match err {
                RelayError::MintRejected => ErrorKind::MintRejected,
                RelayError::MintFailed { .. } => ErrorKind::MintFailed,
                RelayError::MintTimeout { .. } => ErrorKind::MintTimeout,
                RelayError::Transport { .. }
                | RelayError::Status { .. }
                | RelayError::MalformedResponse { .. }
                | RelayError::InvalidApiKey => ErrorKind::RelayUnavailable,
            },
            Self::Session(_) => ErrorKind::SessionEstablishmentFailed,
            Self::Signing(_) => ErrorKind::SigningFailed,
            Self::SignatureMismatch { .. } => ErrorKind::SignatureVerificationMismatch,
            Self::Pack(PackError::DuplicateSigner(_)) => ErrorKind::DuplicateSigner,
            Self::Pack(PackError::InvalidLength { .. }) => ErrorKind::InvalidSignatureLength,
            Self::Submit(_) | Self::MissingContract(_) => ErrorKind::ContractCallFailed,
            Self::Incomplete(_) | Self::SafeConfig(_) | Self::UnknownPkp(_) => {
                ErrorKind::UserInputIncomplete
            }
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
        }
    }
}

/// A failure as shown to the user: its kind and the rendered error chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&WorkflowError> for Failure {
    fn from(err: &WorkflowError) -> Self {
        let chain: &(dyn std::error::Error + Send + Sync + 'static) = err;
        Self { kind: err.kind(), message: display_chain(chain) }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
