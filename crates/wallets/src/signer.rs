use crate::{NetworkHandle, SigningError, session::SessionSigs};
use alloy_consensus::SignableTransaction;
use alloy_network::TxSigner;
use alloy_primitives::{Address, B256, Bytes, ChainId, Signature};
use alloy_signer::{Result, Signer};
use async_trait::async_trait;
use litsafe_common::Pkp;
use std::sync::Arc;

/// Name of the signature slot requested from the network.
pub const SIGNATURE_NAME: &str = "sig1";

/// Resource an ECDSA signing request runs under.
pub const SIGN_ACTION_RESOURCE: &str = "litAction://sign-ecdsa";

/// Signer that delegates every signature to the network under an established session.
///
/// It can back an alloy provider wallet, so transactions are filled and broadcast from the
/// PKP address like any local key.
#[derive(Clone, Debug)]
pub struct PkpSigner {
    network: NetworkHandle,
    session: Arc<SessionSigs>,
    public_key: Bytes,
    address: Address,
    chain_id: Option<ChainId>,
}

impl PkpSigner {
    pub fn new(network: NetworkHandle, session: Arc<SessionSigs>, pkp: &Pkp) -> Self {
        Self {
            network,
            session,
            public_key: pkp.public_key.clone(),
            address: pkp.eth_address,
            chain_id: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: Option<ChainId>) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn session(&self) -> &SessionSigs {
        &self.session
    }

    /// Signs a 32-byte digest, keeping the signing network's error.
    pub async fn sign_digest(&self, hash: B256) -> Result<Signature, SigningError> {
        self.session.check(&self.public_key, SIGN_ACTION_RESOURCE)?;
        let network = self.network.connected().await?;
        trace!(target: "wallets", %hash, address = %self.address, "requesting PKP signature");
        let signature =
            network.sign_ecdsa(&self.session, hash, &self.public_key, SIGNATURE_NAME).await?;
        if signature.name != SIGNATURE_NAME {
            return Err(SigningError::MissingSignature(SIGNATURE_NAME.to_string()));
        }
        signature.to_signature()
    }
}

#[async_trait]
impl Signer for PkpSigner {
    async fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        self.sign_digest(*hash).await.map_err(alloy_signer::Error::other)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    fn set_chain_id(&mut self, chain_id: Option<ChainId>) {
        self.chain_id = chain_id;
    }
}

#[async_trait]
impl TxSigner<Signature> for PkpSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_transaction(
        &self,
        tx: &mut dyn SignableTransaction<Signature>,
    ) -> Result<Signature> {
        if let Some(chain_id) = self.chain_id
            && !tx.set_chain_id_checked(chain_id)
        {
            return Err(alloy_signer::Error::TransactionChainIdMismatch {
                signer: chain_id,
                tx: tx.chain_id().unwrap_or_default(),
            });
        }
        Signer::sign_hash(self, &tx.signature_hash()).await
    }
}
