//! # litsafe-safe
//!
//! Everything needed to talk to a Safe multisig wallet without its SDK:
//!
//! - [`eip712`]: the `SafeTx` structured-data schema and its signing hash
//! - [`signatures`]: packing owner signatures into the layout `checkSignatures` expects
//! - [`contracts`]: calldata for `setup`, `createProxyWithNonce` and `execTransaction`
//! - [`draft`]: field-by-field builders for user-entered transactions

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod contracts;
pub mod draft;
pub mod eip712;
pub mod signatures;

pub use contracts::{SafeAccountConfig, SafeConfigError};
pub use draft::{IncompleteInput, SafeDomainDraft, SafeTxDraft};
pub use eip712::{
    Operation, SafeDomain, SafeTx, TypedDataError, compute_struct_hash, safe_tx_hash,
    safe_tx_message, safe_tx_types, safe_typed_data,
};
pub use signatures::{PackError, SIGNATURE_LENGTH, SafeSignature, pack_signatures};
