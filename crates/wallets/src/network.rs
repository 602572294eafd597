use crate::{
    SigningError,
    session::{
        AuthCallbackParams, AuthMethod, SessionKeyAuth, SessionRequest, SessionSigs,
        ThresholdSignature,
    },
};
use alloy_primitives::{B256, Bytes};
use async_trait::async_trait;
use litsafe_common::IdToken;
use std::{fmt, sync::Arc};
use tokio::sync::OnceCell;

/// A distributed network that holds PKP key shares and signs on their behalf.
///
/// How requests are packaged for the nodes (remote action code, share combination) is left
/// to the implementation.
#[async_trait]
pub trait SigningNetwork: Send + Sync {
    /// Performs the initial handshake with the nodes.
    async fn connect(&self) -> Result<(), SigningError>;

    /// Opens a session for the PKP proven by `callback`.
    ///
    /// The network calls `callback` synchronously, possibly more than once, before this
    /// returns; it is never retained afterwards.
    async fn session_sigs(
        &self,
        request: &SessionRequest,
        callback: &dyn AuthNeededCallback,
    ) -> Result<SessionSigs, SigningError>;

    /// Produces an ECDSA signature over `to_sign` with the PKP identified by `public_key`.
    async fn sign_ecdsa(
        &self,
        session: &SessionSigs,
        to_sign: B256,
        public_key: &Bytes,
        sig_name: &str,
    ) -> Result<ThresholdSignature, SigningError>;
}

/// Invoked by the network when it needs the user's identity to certify a session key.
pub trait AuthNeededCallback: Send + Sync {
    fn authenticate(&self, params: &AuthCallbackParams) -> Result<SessionKeyAuth, SigningError>;
}

/// Certifies session keys with a fixed set of auth methods for one PKP.
#[derive(Clone, Debug)]
pub struct DefaultAuthNeededCallback {
    auth_methods: Vec<AuthMethod>,
    pkp_public_key: Bytes,
}

impl DefaultAuthNeededCallback {
    pub fn new(auth_methods: Vec<AuthMethod>, pkp_public_key: Bytes) -> Self {
        Self { auth_methods, pkp_public_key }
    }

    /// Proves control of the PKP with a Google id token.
    pub fn google(token: &IdToken, pkp_public_key: Bytes) -> Self {
        Self::new(vec![AuthMethod::google(token)], pkp_public_key)
    }
}

impl AuthNeededCallback for DefaultAuthNeededCallback {
    fn authenticate(&self, params: &AuthCallbackParams) -> Result<SessionKeyAuth, SigningError> {
        Ok(SessionKeyAuth {
            session_key_uri: params.session_key_uri.clone(),
            auth_methods: self.auth_methods.clone(),
            pkp_public_key: self.pkp_public_key.clone(),
            chain: params.chain.clone(),
            resources: params.resources.clone(),
            expiration: params.expiration,
        })
    }
}

/// A shared handle that connects to the network the first time it is used.
///
/// Clones share the connection. There is no teardown; the connection lives as long as the
/// last clone.
#[derive(Clone)]
pub struct NetworkHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    network: Arc<dyn SigningNetwork>,
    connected: OnceCell<()>,
}

impl NetworkHandle {
    pub fn new<N: SigningNetwork + 'static>(network: N) -> Self {
        Self::from_arc(Arc::new(network))
    }

    pub fn from_arc(network: Arc<dyn SigningNetwork>) -> Self {
        Self { inner: Arc::new(HandleInner { network, connected: OnceCell::new() }) }
    }

    /// Returns the network, connecting first if no call has succeeded yet.
    ///
    /// A failed connection attempt is not cached and will be retried by the next call.
    pub async fn connected(&self) -> Result<&dyn SigningNetwork, SigningError> {
        let network = &self.inner.network;
        self.inner
            .connected
            .get_or_try_init(|| async {
                debug!(target: "wallets", "connecting to signing network");
                network.connect().await
            })
            .await?;
        Ok(network.as_ref())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.initialized()
    }
}

impl fmt::Debug for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkHandle").field("connected", &self.is_connected()).finish()
    }
}
