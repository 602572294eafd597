//! Common types and helpers shared by the litsafe crates.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod errors;
pub mod pkp;
pub mod serde_helpers;

pub use pkp::{IdToken, Pkp, address_from_public_key};

/// Initializes a tracing subscriber that reads its filter from `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
