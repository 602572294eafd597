use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::TxHash;
use alloy_provider::{PendingTransactionError, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_transport::TransportError;
use async_trait::async_trait;
use litsafe_config::Config;
use litsafe_wallets::PkpSigner;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid RPC URL `{url}`: {source}")]
    InvalidRpcUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Rpc(#[from] TransportError),
    #[error(transparent)]
    Pending(#[from] PendingTransactionError),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

/// Sends a transaction signed by a PKP and waits until it is mined.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(
        &self,
        signer: PkpSigner,
        request: TransactionRequest,
    ) -> Result<TxHash, SubmitError>;
}

/// Submits through a JSON-RPC endpoint, filling nonce, gas and chain id from the node.
#[derive(Clone, Debug)]
pub struct RpcSubmitter {
    url: Url,
}

impl RpcSubmitter {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn from_config(config: &Config) -> Result<Self, SubmitError> {
        let url = Url::parse(&config.rpc_url)
            .map_err(|source| SubmitError::InvalidRpcUrl { url: config.rpc_url.clone(), source })?;
        Ok(Self::new(url))
    }
}

#[async_trait]
impl TransactionSubmitter for RpcSubmitter {
    async fn submit(
        &self,
        signer: PkpSigner,
        request: TransactionRequest,
    ) -> Result<TxHash, SubmitError> {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.url.clone());

        let pending = provider.send_transaction(request).await?;
        let hash = *pending.tx_hash();
        debug!(target: "workflow", %hash, "transaction sent, waiting for receipt");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(SubmitError::Reverted(hash));
        }
        Ok(hash)
    }
}
