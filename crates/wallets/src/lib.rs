//! # litsafe-wallets
//!
//! The capability to sign with a PKP: the [`SigningNetwork`] abstraction over the distributed
//! key-share nodes, session material, a lazily connected [`NetworkHandle`] and the
//! [`PkpSigner`] that plugs a PKP into alloy providers.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod dev;
pub mod error;
pub mod network;
pub mod session;
pub mod signer;

pub use dev::DevNetwork;
pub use error::SigningError;
pub use network::{AuthNeededCallback, DefaultAuthNeededCallback, NetworkHandle, SigningNetwork};
pub use session::{
    ANY_ACTION_RESOURCE, AuthCallbackParams, AuthMethod, AuthSig, DEFAULT_SESSION_CHAIN,
    GOOGLE_AUTH_METHOD_TYPE, SessionKeyAuth, SessionRequest, SessionSigs, ThresholdSignature,
};
pub use signer::{PkpSigner, SIGN_ACTION_RESOURCE, SIGNATURE_NAME};
