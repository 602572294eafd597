//! Builders for Safe transactions entered one field at a time.

use crate::eip712::{Operation, SafeDomain, SafeTx};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A required field was never filled in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("missing required field `{field}`")]
pub struct IncompleteInput {
    pub field: &'static str,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, IncompleteInput> {
    value.ok_or(IncompleteInput { field })
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeDomainDraft {
    pub chain_id: Option<u64>,
    pub verifying_contract: Option<Address>,
}

impl SafeDomainDraft {
    pub fn build(&self) -> Result<SafeDomain, IncompleteInput> {
        Ok(SafeDomain {
            chain_id: required(self.chain_id, "chainId")?,
            verifying_contract: required(self.verifying_contract, "verifyingContract")?,
        })
    }
}

/// A Safe transaction under construction.
///
/// Only `to` and `nonce` are required; everything else falls back to a plain call with no
/// value, no data and no gas refund.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTxDraft {
    pub to: Option<Address>,
    pub value: Option<U256>,
    pub data: Option<Bytes>,
    pub operation: Option<Operation>,
    pub safe_tx_gas: Option<U256>,
    pub base_gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub gas_token: Option<Address>,
    pub refund_receiver: Option<Address>,
    pub nonce: Option<U256>,
}

impl SafeTxDraft {
    pub fn build(&self) -> Result<SafeTx, IncompleteInput> {
        Ok(SafeTx {
            to: required(self.to, "to")?,
            value: self.value.unwrap_or_default(),
            data: self.data.clone().unwrap_or_default(),
            operation: self.operation.unwrap_or_default().into(),
            safeTxGas: self.safe_tx_gas.unwrap_or_default(),
            baseGas: self.base_gas.unwrap_or_default(),
            gasPrice: self.gas_price.unwrap_or_default(),
            gasToken: self.gas_token.unwrap_or_default(),
            refundReceiver: self.refund_receiver.unwrap_or_default(),
            nonce: required(self.nonce, "nonce")?,
        })
    }
}
