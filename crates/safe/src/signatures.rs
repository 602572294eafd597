//! Owner signatures in the layout `Safe.checkSignatures` consumes.

use alloy_primitives::{Address, Bytes, Signature, hex};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Length of a single ECDSA owner signature, `r ‖ s ‖ v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// A signature over a Safe transaction hash together with the owner that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafeSignature {
    pub signer: Address,
    pub data: Bytes,
}

impl SafeSignature {
    pub fn new(signer: Address, data: impl Into<Bytes>) -> Self {
        Self { signer, data: data.into() }
    }

    /// Encodes an ECDSA signature with `v` in `{27, 28}`, the form Safe treats as a plain
    /// `ecrecover` signature.
    pub fn from_ecdsa(signer: Address, signature: &Signature) -> Self {
        Self::new(signer, signature.as_bytes().to_vec())
    }
}

impl fmt::Display for SafeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.signer, self.data)
    }
}

/// Parses `<signer>:<signature>`, both hex encoded.
impl FromStr for SafeSignature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (signer, data) =
            s.split_once(':').ok_or_else(|| format!("expected `signer:signature`, got `{s}`"))?;
        let signer = signer.trim().parse::<Address>().map_err(|e| format!("invalid signer: {e}"))?;
        let data = hex::decode(data.trim()).map_err(|e| format!("invalid signature hex: {e}"))?;
        Ok(Self::new(signer, data))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    #[error("signature from {signer} is {len} bytes, expected {SIGNATURE_LENGTH}")]
    InvalidLength { signer: Address, len: usize },
    #[error("duplicate signature from {0}")]
    DuplicateSigner(Address),
}

/// Concatenates owner signatures sorted by ascending signer address.
///
/// `checkSignatures` walks the blob expecting strictly increasing owners, so the order the
/// signatures were collected in does not matter but duplicates are rejected. An empty input
/// yields empty bytes.
pub fn pack_signatures(signatures: &[SafeSignature]) -> Result<Bytes, PackError> {
    if let Some(bad) = signatures.iter().find(|s| s.data.len() != SIGNATURE_LENGTH) {
        return Err(PackError::InvalidLength { signer: bad.signer, len: bad.data.len() });
    }

    let mut sorted: Vec<&SafeSignature> = signatures.iter().collect();
    sorted.sort_by_key(|s| s.signer);
    if let Some(pair) = sorted.windows(2).find(|w| w[0].signer == w[1].signer) {
        return Err(PackError::DuplicateSigner(pair[0].signer));
    }

    let mut packed = Vec::with_capacity(sorted.len() * SIGNATURE_LENGTH);
    for signature in sorted {
        packed.extend_from_slice(&signature.data);
    }
    Ok(packed.into())
}
