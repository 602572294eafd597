use alloy_primitives::{Address, Bytes, U256};
use clap::{Parser, Subcommand};
use litsafe_common::IdToken;
use litsafe_safe::{Operation, SafeDomainDraft, SafeSignature, SafeTxDraft};
use url::Url;

/// Sign in with Google, mint PKPs through the relay and prepare Safe signatures.
#[derive(Debug, Parser)]
#[command(name = "litsafe", version, next_display_order = None)]
pub struct Litsafe {
    #[command(subcommand)]
    pub cmd: LitsafeSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum LitsafeSubcommand {
    /// Prints the URL that starts a Google login.
    LoginUrl {
        /// Where the gateway redirects to after login. Defaults to the configured redirect URI.
        #[arg(long)]
        redirect: Option<Url>,
    },

    /// Extracts the identity token from a login callback URL.
    Token {
        /// The URL the browser landed on after login.
        url: Url,

        /// The redirect URI the login was started with.
        #[arg(long)]
        redirect: Option<Url>,
    },

    /// Lists the PKPs bound to an identity token.
    Pkps {
        #[command(flatten)]
        token: TokenArgs,
    },

    /// Mints a new PKP for an identity token and waits until it exists.
    Mint {
        #[command(flatten)]
        token: TokenArgs,
    },

    /// Computes the EIP-712 hash of a Safe transaction.
    #[command(visible_alias = "sth")]
    SafeTxHash(SafeTxArgs),

    /// Packs owner signatures in the order `execTransaction` expects.
    #[command(visible_alias = "pack")]
    PackSignatures {
        /// Signatures as `<signer>:<signature>`, in any order.
        #[arg(required = true, value_name = "SIGNER:SIG")]
        signatures: Vec<SafeSignature>,
    },

    /// Prints the resolved configuration.
    Config,
}

#[derive(Clone, Debug, Parser)]
pub struct TokenArgs {
    /// The Google identity token.
    #[arg(long, env = "LITSAFE_ID_TOKEN", value_name = "JWT", hide_env_values = true)]
    pub id_token: String,
}

impl TokenArgs {
    pub fn token(&self) -> IdToken {
        IdToken::new(self.id_token.clone())
    }
}

#[derive(Clone, Debug, Parser)]
pub struct SafeTxArgs {
    /// Address of the Safe.
    #[arg(long)]
    pub safe: Address,

    /// Chain the Safe is deployed on. Defaults to the configured chain.
    #[arg(long)]
    pub chain_id: Option<u64>,

    #[arg(long)]
    pub to: Address,

    #[arg(long)]
    pub value: Option<U256>,

    #[arg(long)]
    pub data: Option<Bytes>,

    /// Perform a `DELEGATECALL` instead of a `CALL`.
    #[arg(long)]
    pub delegate_call: bool,

    #[arg(long)]
    pub safe_tx_gas: Option<U256>,

    #[arg(long)]
    pub base_gas: Option<U256>,

    #[arg(long)]
    pub gas_price: Option<U256>,

    #[arg(long)]
    pub gas_token: Option<Address>,

    #[arg(long)]
    pub refund_receiver: Option<Address>,

    /// Nonce of the Safe.
    #[arg(long)]
    pub nonce: U256,

    /// Print the full `eth_signTypedData_v4` payload instead of the hash.
    #[arg(long)]
    pub typed_data: bool,
}

impl SafeTxArgs {
    pub fn domain(&self, default_chain_id: u64) -> SafeDomainDraft {
        SafeDomainDraft {
            chain_id: Some(self.chain_id.unwrap_or(default_chain_id)),
            verifying_contract: Some(self.safe),
        }
    }

    pub fn tx(&self) -> SafeTxDraft {
        SafeTxDraft {
            to: Some(self.to),
            value: self.value,
            data: self.data.clone(),
            operation: self.delegate_call.then_some(Operation::DelegateCall),
            safe_tx_gas: self.safe_tx_gas,
            base_gas: self.base_gas,
            gas_price: self.gas_price,
            gas_token: self.gas_token,
            refund_receiver: self.refund_receiver,
            nonce: Some(self.nonce),
        }
    }
}
