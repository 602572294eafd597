//! The `SafeTx` EIP-712 schema.
//!
//! A Safe recomputes `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct(SafeTx))` on chain and
//! checks every owner signature against it, so the hash produced here has to match that
//! computation bit for bit.

use alloy_dyn_abi::{Eip712Domain, Eip712Types, TypedData};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{SolStruct, sol};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

sol! {
    /// A transaction to be executed by a Safe once enough owners signed it.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct SafeTx {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 safeTxGas;
        uint256 baseGas;
        uint256 gasPrice;
        address gasToken;
        address refundReceiver;
        uint256 nonce;
    }
}

/// How the Safe performs the call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Operation {
    /// A regular `CALL`.
    #[default]
    Call = 0,
    /// A `DELEGATECALL` executing `to` in the Safe's context.
    DelegateCall = 1,
}

impl TryFrom<u8> for Operation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::DelegateCall),
            other => Err(other),
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> Self {
        op as Self
    }
}

/// The EIP-712 domain of a Safe: its chain and its own address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SafeDomain {
    /// Chain the Safe is deployed on.
    pub chain_id: u64,
    /// Address of the Safe proxy.
    pub verifying_contract: Address,
}

impl SafeDomain {
    /// Returns the EIP-712 domain, `EIP712Domain(uint256 chainId,address verifyingContract)`.
    pub fn eip712_domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            None,
            None,
            Some(U256::from(self.chain_id)),
            Some(self.verifying_contract),
            None,
        )
    }

    /// Returns the domain separator the Safe stores for itself.
    pub fn separator(&self) -> B256 {
        self.eip712_domain().separator()
    }
}

/// Returns the digest owners sign to approve `tx` on the Safe described by `domain`.
pub fn safe_tx_hash(domain: &SafeDomain, tx: &SafeTx) -> B256 {
    tx.eip712_signing_hash(&domain.eip712_domain())
}

/// Errors raised when hashing runtime typed data.
#[derive(Debug, thiserror::Error)]
pub enum TypedDataError {
    #[error("invalid typed data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Encode(#[from] alloy_dyn_abi::Error),
}

/// Computes the EIP-712 signing digest of `message` described at runtime by `types` and
/// `primary_type`, under `domain`.
///
/// This is the full `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct(message))` digest, the
/// value a wallet signs for `eth_signTypedData_v4`.
pub fn compute_struct_hash(
    domain: &Eip712Domain,
    types: &Eip712Types,
    primary_type: &str,
    message: &Value,
) -> Result<B256, TypedDataError> {
    let typed = typed_data(domain, types, primary_type, message)?;
    Ok(typed.eip712_signing_hash()?)
}

fn typed_data(
    domain: &Eip712Domain,
    types: &Eip712Types,
    primary_type: &str,
    message: &Value,
) -> Result<TypedData, serde_json::Error> {
    serde_json::from_value(json!({
        "types": types,
        "primaryType": primary_type,
        "domain": domain,
        "message": message,
    }))
}

/// Returns the `SafeTx` type definitions in their runtime form.
pub fn safe_tx_types() -> Eip712Types {
    serde_json::from_value(json!({
        "SafeTx": [
            { "name": "to", "type": "address" },
            { "name": "value", "type": "uint256" },
            { "name": "data", "type": "bytes" },
            { "name": "operation", "type": "uint8" },
            { "name": "safeTxGas", "type": "uint256" },
            { "name": "baseGas", "type": "uint256" },
            { "name": "gasPrice", "type": "uint256" },
            { "name": "gasToken", "type": "address" },
            { "name": "refundReceiver", "type": "address" },
            { "name": "nonce", "type": "uint256" },
        ]
    }))
    .expect("static SafeTx schema")
}

/// Returns `tx` as a JSON message matching [`safe_tx_types`].
pub fn safe_tx_message(tx: &SafeTx) -> Value {
    json!({
        "to": tx.to.to_string(),
        "value": tx.value.to_string(),
        "data": tx.data.to_string(),
        "operation": tx.operation,
        "safeTxGas": tx.safeTxGas.to_string(),
        "baseGas": tx.baseGas.to_string(),
        "gasPrice": tx.gasPrice.to_string(),
        "gasToken": tx.gasToken.to_string(),
        "refundReceiver": tx.refundReceiver.to_string(),
        "nonce": tx.nonce.to_string(),
    })
}

/// Returns `tx` as runtime typed data, the payload of an `eth_signTypedData_v4` request.
pub fn safe_typed_data(domain: &SafeDomain, tx: &SafeTx) -> Result<TypedData, TypedDataError> {
    Ok(typed_data(&domain.eip712_domain(), &safe_tx_types(), "SafeTx", &safe_tx_message(tx))?)
}
