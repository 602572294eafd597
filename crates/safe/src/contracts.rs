//! Calldata for the Safe singleton and its proxy factory.

use crate::eip712::SafeTx;
use alloy_primitives::{Address, Bytes, U256, address};
use alloy_sol_types::{SolCall, sol};
use std::{collections::HashSet, time::SystemTime};

sol! {
    interface ISafeProxyFactory {
        function createProxyWithNonce(address _singleton, bytes initializer, uint256 saltNonce)
            external returns (address proxy);
    }

    interface ISafe {
        function setup(
            address[] _owners,
            uint256 _threshold,
            address to,
            bytes data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address paymentReceiver
        ) external;

        function execTransaction(
            address to,
            uint256 value,
            bytes data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes signatures
        ) external payable returns (bool success);
    }
}

/// Head of the Safe's owner linked list; can never be an owner itself.
pub const SENTINEL_OWNER: Address = address!("0x0000000000000000000000000000000000000001");

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SafeConfigError {
    #[error("a Safe needs at least one owner")]
    NoOwners,
    #[error("{0} cannot be a Safe owner")]
    InvalidOwner(Address),
    #[error("{0} is listed as owner more than once")]
    DuplicateOwner(Address),
    #[error("threshold {threshold} is not between 1 and the {owners} owners")]
    InvalidThreshold { threshold: usize, owners: usize },
}

/// Owners and confirmation threshold of a Safe about to be deployed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafeAccountConfig {
    owners: Vec<Address>,
    threshold: usize,
}

impl SafeAccountConfig {
    /// Validates the owner set the same way `Safe.setup` would, so a bad configuration fails
    /// before anything is signed.
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self, SafeConfigError> {
        if owners.is_empty() {
            return Err(SafeConfigError::NoOwners);
        }
        let mut seen = HashSet::with_capacity(owners.len());
        for owner in &owners {
            if owner.is_zero() || *owner == SENTINEL_OWNER {
                return Err(SafeConfigError::InvalidOwner(*owner));
            }
            if !seen.insert(*owner) {
                return Err(SafeConfigError::DuplicateOwner(*owner));
            }
        }
        if threshold == 0 || threshold > owners.len() {
            return Err(SafeConfigError::InvalidThreshold { threshold, owners: owners.len() });
        }
        Ok(Self { owners, threshold })
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// ABI-encoded `setup` call used as the proxy initializer. No delegate call on setup and
    /// no deployment refund.
    pub fn setup_calldata(&self, fallback_handler: Address) -> Bytes {
        ISafe::setupCall {
            _owners: self.owners.clone(),
            _threshold: U256::from(self.threshold),
            to: Address::ZERO,
            data: Bytes::new(),
            fallbackHandler: fallback_handler,
            paymentToken: Address::ZERO,
            payment: U256::ZERO,
            paymentReceiver: Address::ZERO,
        }
        .abi_encode()
        .into()
    }
}

/// ABI-encoded `createProxyWithNonce` call deploying a new Safe proxy.
pub fn create_proxy_calldata(singleton: Address, initializer: Bytes, salt_nonce: U256) -> Bytes {
    ISafeProxyFactory::createProxyWithNonceCall {
        _singleton: singleton,
        initializer,
        saltNonce: salt_nonce,
    }
    .abi_encode()
    .into()
}

/// ABI-encoded `execTransaction` call carrying packed owner signatures.
pub fn exec_transaction_calldata(tx: &SafeTx, signatures: Bytes) -> Bytes {
    ISafe::execTransactionCall {
        to: tx.to,
        value: tx.value,
        data: tx.data.clone(),
        operation: tx.operation,
        safeTxGas: tx.safeTxGas,
        baseGas: tx.baseGas,
        gasPrice: tx.gasPrice,
        gasToken: tx.gasToken,
        refundReceiver: tx.refundReceiver,
        signatures,
    }
    .abi_encode()
    .into()
}

/// Returns a fresh proxy salt: the current unix time in milliseconds times 1000 plus a random
/// number below 1000.
pub fn salt_nonce() -> U256 {
    let millis = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    U256::from(millis) * U256::from(1000) + U256::from(rand::random_range(0..1000u32))
}
