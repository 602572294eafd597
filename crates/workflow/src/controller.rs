use crate::{
    error::{Failure, WorkflowError},
    state::{Event, InvalidTransition, Machine, Ticket, View},
    submit::TransactionSubmitter,
};
use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, B256, Signature, TxHash, U256, eip191_hash_message};
use alloy_rpc_types::TransactionRequest;
use chrono::Utc;
use litsafe_auth::{LoginGateway, extract_token, has_callback_params};
use litsafe_common::{IdToken, Pkp};
use litsafe_config::Config;
use litsafe_relay::Relay;
use litsafe_safe::{
    IncompleteInput, SafeAccountConfig, SafeDomainDraft, SafeSignature, SafeTxDraft,
    contracts::{create_proxy_calldata, exec_transaction_calldata, salt_nonce},
    pack_signatures, safe_tx_hash,
};
use litsafe_wallets::{
    ANY_ACTION_RESOURCE, DefaultAuthNeededCallback, NetworkHandle, PkpSigner, SessionRequest,
    SigningError,
};
use std::sync::Arc;
use url::Url;

/// Owners a new Safe needs to confirm a transaction.
pub const SAFE_THRESHOLD: usize = 2;

/// The PKP a session was established for, and the signer bound to it.
#[derive(Clone, Debug)]
pub struct ActiveSession {
    pub pkp: Pkp,
    pub signer: PkpSigner,
}

/// Result of the last message signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMessage {
    pub message: String,
    pub signature: Signature,
    pub recovered: Address,
}

/// Input of [`Workflow::cosign_and_submit`].
#[derive(Clone, Debug, Default)]
pub struct CosignRequest {
    pub domain: SafeDomainDraft,
    pub tx: SafeTxDraft,
    /// Signature of the other owner. When absent the one supplied earlier is reused.
    pub signer_signature: Option<SafeSignature>,
}

/// Signatures collected for the pending Safe transaction. Kept across failures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CosignState {
    pub signer_signature: Option<SafeSignature>,
    pub safe_signature: Option<SafeSignature>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CosignOutcome {
    pub safe_tx_hash: B256,
    pub signature: SafeSignature,
    pub tx_hash: TxHash,
}

/// Drives one user through sign-in, PKP selection, session creation and the signing actions.
///
/// Every action takes `&mut self`, so a controller never runs two actions at once. Failures
/// of the primary flow (redirect, fetch, mint, session, message signing) move the view to
/// [`View::Error`] and are returned as well; failures of the Safe actions are only returned.
pub struct Workflow<R, T> {
    config: Config,
    relay: R,
    submitter: T,
    network: NetworkHandle,
    machine: Machine,
    token: Option<IdToken>,
    pkps: Vec<Pkp>,
    session: Option<ActiveSession>,
    message: Option<SignedMessage>,
    cosign: CosignState,
}

impl<R: Relay, T: TransactionSubmitter> Workflow<R, T> {
    pub fn new(config: Config, relay: R, submitter: T, network: NetworkHandle) -> Self {
        Self {
            config,
            relay,
            submitter,
            network,
            machine: Machine::new(),
            token: None,
            pkps: Vec::new(),
            session: None,
            message: None,
            cosign: CosignState::default(),
        }
    }

    pub fn view(&self) -> &View {
        self.machine.view()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn submitter(&self) -> &T {
        &self.submitter
    }

    pub fn token(&self) -> Option<&IdToken> {
        self.token.as_ref()
    }

    pub fn pkps(&self) -> &[Pkp] {
        &self.pkps
    }

    /// `true` once the relay reported no PKP for the token and none was minted yet.
    pub fn needs_mint(&self) -> bool {
        matches!(self.view(), View::Fetched) && self.pkps.is_empty()
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn signed_message(&self) -> Option<&SignedMessage> {
        self.message.as_ref()
    }

    pub fn cosign_state(&self) -> &CosignState {
        &self.cosign
    }

    /// The URL that starts the Google login and returns to the configured redirect URI.
    pub fn login_url(&self) -> Url {
        LoginGateway::new(self.config.login_gateway.clone()).login_url(&self.config.redirect_uri)
    }

    /// Handles the page the user agent landed on.
    ///
    /// Does nothing and returns `None` unless `current_url` is a login callback. Otherwise the
    /// token is extracted, the bound PKPs are fetched and the cleaned URL is returned.
    pub async fn start(&mut self, current_url: &Url) -> Result<Option<Url>, WorkflowError> {
        if !has_callback_params(&self.config.redirect_uri, current_url) {
            return Ok(None);
        }
        self.machine.apply(Event::CallbackDetected)?;

        let callback = match extract_token(&self.config.redirect_uri, current_url) {
            Ok(callback) => callback,
            Err(err) => return Err(self.fail(err.into())),
        };
        let ticket = self.machine.begin(Event::TokenExtracted)?;
        self.token = Some(callback.id_token.clone());

        match self.relay.fetch_existing(&callback.id_token).await {
            Ok(pkps) => {
                debug!(target: "workflow", count = pkps.len(), "fetched PKPs");
                self.pkps = pkps;
                self.machine.complete(ticket, Event::PkpsFetched)?;
                Ok(Some(callback.cleaned_url))
            }
            Err(err) => Err(self.fail_ticket(ticket, err.into())),
        }
    }

    /// Mints a new PKP, waits for it and opens a session for it.
    pub async fn mint(&mut self) -> Result<Pkp, WorkflowError> {
        let token = self.require_token("mint requested")?;
        let ticket = self.machine.begin(Event::MintRequested)?;

        let minted = match self.relay.mint(&token).await {
            Ok(request_id) => {
                debug!(target: "workflow", %request_id, "mint accepted, polling");
                self.relay.poll_until_terminal(&request_id).await
            }
            Err(err) => Err(err),
        };
        let pkp = match minted {
            Ok(pkp) => pkp,
            Err(err) => return Err(self.fail_ticket(ticket, err.into())),
        };
        self.pkps.push(pkp.clone());
        self.machine.complete(ticket, Event::Minted)?;

        self.create_session(pkp.clone()).await?;
        Ok(pkp)
    }

    /// Opens a session for one of the fetched PKPs.
    pub async fn select_pkp(&mut self, address: Address) -> Result<(), WorkflowError> {
        let pkp = self
            .pkps
            .iter()
            .find(|pkp| pkp.eth_address == address)
            .cloned()
            .ok_or(WorkflowError::UnknownPkp(address))?;
        self.create_session(pkp).await
    }

    async fn create_session(&mut self, pkp: Pkp) -> Result<(), WorkflowError> {
        let token = self.require_token("session requested")?;
        let ticket = self.machine.begin(Event::SessionRequested)?;
        match self.establish_session(&token, &pkp).await {
            Ok(signer) => {
                debug!(target: "workflow", address = %pkp.eth_address, "session established");
                self.session = Some(ActiveSession { pkp, signer });
                self.machine.complete(ticket, Event::SessionEstablished)?;
                Ok(())
            }
            Err(err) => Err(self.fail_ticket(ticket, WorkflowError::Session(err))),
        }
    }

    async fn establish_session(
        &self,
        token: &IdToken,
        pkp: &Pkp,
    ) -> Result<PkpSigner, SigningError> {
        let network = self.network.connected().await?;
        let ttl = self.config.session_ttl();
        let expiration = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                SigningError::Network(format!("session ttl of {}s is out of range", ttl.as_secs()))
            })?;
        let request = SessionRequest {
            chain: self.config.session_chain.clone(),
            resources: vec![ANY_ACTION_RESOURCE.to_string()],
            expiration,
        };
        let callback = DefaultAuthNeededCallback::google(token, pkp.public_key.clone());
        let sigs = network.session_sigs(&request, &callback).await?;
        Ok(PkpSigner::new(self.network.clone(), Arc::new(sigs), pkp)
            .with_chain_id(Some(self.config.chain_id)))
    }

    /// Dismisses the current error.
    pub fn acknowledge(&mut self) -> Result<(), InvalidTransition> {
        self.machine.apply(Event::Acknowledge)
    }

    /// Signs `message` as a personal message and checks it recovers to the PKP.
    pub async fn sign_message(&mut self, message: &str) -> Result<SignedMessage, WorkflowError> {
        let active = self.require_session("sign message")?;
        let hash = eip191_hash_message(message);

        let signature = match active.signer.sign_digest(hash).await {
            Ok(signature) => signature,
            Err(err) => return Err(self.fail(WorkflowError::Signing(err))),
        };
        let recovered = match signature.recover_address_from_prehash(&hash) {
            Ok(recovered) => recovered,
            Err(err) => {
                return Err(self.fail(WorkflowError::Signing(SigningError::Signer(err.into()))));
            }
        };

        let signed = SignedMessage { message: message.to_string(), signature, recovered };
        self.message = Some(signed.clone());
        if recovered != active.pkp.eth_address {
            return Err(self.fail(WorkflowError::SignatureMismatch {
                expected: active.pkp.eth_address,
                recovered,
            }));
        }
        Ok(signed)
    }

    /// Deploys a Safe owned by `owner_a`, `owner_b` and the PKP with a threshold of two.
    ///
    /// Returns the hash of the factory transaction. The view is left unchanged on failure.
    pub async fn create_safe(
        &mut self,
        owner_a: Address,
        owner_b: Address,
    ) -> Result<TxHash, WorkflowError> {
        let active = self.require_session("create safe")?;
        let factory =
            self.config.safe.factory.ok_or(WorkflowError::MissingContract("safe.factory"))?;
        let singleton =
            self.config.safe.singleton.ok_or(WorkflowError::MissingContract("safe.singleton"))?;

        let owners = SafeAccountConfig::new(
            vec![owner_a, owner_b, active.pkp.eth_address],
            SAFE_THRESHOLD,
        )?;
        let initializer = owners.setup_calldata(self.config.safe.fallback_handler);
        let salt = salt_nonce();
        let request = TransactionRequest::default()
            .with_from(active.pkp.eth_address)
            .with_to(factory)
            .with_value(U256::ZERO)
            .with_input(create_proxy_calldata(singleton, initializer, salt))
            .with_chain_id(self.config.chain_id);

        let hash = self.submitter.submit(active.signer.clone(), request).await?;
        info!(target: "workflow", %hash, %factory, %salt, "Safe deployment submitted");
        Ok(hash)
    }

    /// Signs the Safe transaction with the PKP, packs it with the other owner's signature and
    /// executes it on the Safe.
    pub async fn cosign_and_submit(
        &mut self,
        request: CosignRequest,
    ) -> Result<CosignOutcome, WorkflowError> {
        let active = self.require_session("cosign")?;
        if let Some(signature) = request.signer_signature {
            self.cosign.signer_signature = Some(signature);
        }
        let signer_signature = self
            .cosign
            .signer_signature
            .clone()
            .ok_or(IncompleteInput { field: "signerSignature" })?;
        let domain = request.domain.build()?;
        let tx = request.tx.build()?;

        let safe_tx_hash = safe_tx_hash(&domain, &tx);
        let signature =
            active.signer.sign_digest(safe_tx_hash).await.map_err(WorkflowError::Signing)?;
        let recovered = signature
            .recover_address_from_prehash(&safe_tx_hash)
            .map_err(|err| WorkflowError::Signing(SigningError::Signer(err.into())))?;
        if recovered != active.pkp.eth_address {
            return Err(WorkflowError::SignatureMismatch {
                expected: active.pkp.eth_address,
                recovered,
            });
        }
        let signature = SafeSignature::from_ecdsa(active.pkp.eth_address, &signature);
        self.cosign.safe_signature = Some(signature.clone());

        let packed = pack_signatures(&[signer_signature, signature.clone()])?;
        let call = TransactionRequest::default()
            .with_from(active.pkp.eth_address)
            .with_to(domain.verifying_contract)
            .with_value(U256::ZERO)
            .with_input(exec_transaction_calldata(&tx, packed))
            .with_chain_id(self.config.chain_id);

        let tx_hash = self.submitter.submit(active.signer.clone(), call).await?;
        info!(
            target: "workflow",
            %tx_hash,
            safe = %domain.verifying_contract,
            "Safe transaction submitted"
        );
        Ok(CosignOutcome { safe_tx_hash, signature, tx_hash })
    }

    fn require_token(&self, event: &'static str) -> Result<IdToken, WorkflowError> {
        self.token
            .clone()
            .ok_or_else(|| InvalidTransition { view: self.view().name(), event }.into())
    }

    fn require_session(&self, action: &'static str) -> Result<ActiveSession, WorkflowError> {
        match (self.view(), &self.session) {
            (View::SessionCreated, Some(active)) => Ok(active.clone()),
            (view, _) => Err(InvalidTransition { view: view.name(), event: action }.into()),
        }
    }

    /// Moves the view to [`View::Error`] and hands `err` back.
    fn fail(&mut self, err: WorkflowError) -> WorkflowError {
        warn!(target: "workflow", kind = %err.kind(), "{err}");
        if let Err(invalid) = self.machine.apply(Event::Failed(Failure::from(&err))) {
            debug!(target: "workflow", %invalid, "error not recorded in view");
        }
        err
    }

    fn fail_ticket(&mut self, ticket: Ticket, err: WorkflowError) -> WorkflowError {
        warn!(target: "workflow", kind = %err.kind(), "{err}");
        if let Err(invalid) = self.machine.complete(ticket, Event::Failed(Failure::from(&err))) {
            debug!(target: "workflow", %invalid, "error not recorded in view");
        }
        err
    }
}
