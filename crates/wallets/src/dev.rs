//! An in-process signing network backed by local keys.

use crate::{
    AuthNeededCallback, SigningError, SigningNetwork,
    session::{
        AuthCallbackParams, AuthSig, SessionRequest, SessionSigs, ThresholdSignature,
    },
};
use alloy_primitives::{B256, Bytes, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use litsafe_common::Pkp;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
};

const DERIVED_VIA: &str = "litsafe.dev.session";

/// Signing network that keeps every PKP key in memory.
///
/// It follows the same rules as a real network: sessions are certified by the PKP through
/// the auth callback, expire, are scoped to resources, and every node signature is checked
/// before a signing request is honored.
#[derive(Debug)]
pub struct DevNetwork {
    keys: RwLock<HashMap<Bytes, PrivateKeySigner>>,
    nodes: usize,
    connects: AtomicUsize,
    next_token_id: AtomicUsize,
}

impl Default for DevNetwork {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DevNetwork {
    pub fn new(nodes: usize) -> Self {
        Self {
            keys: RwLock::default(),
            nodes: nodes.max(1),
            connects: AtomicUsize::new(0),
            next_token_id: AtomicUsize::new(1),
        }
    }

    /// Creates a fresh PKP held by this network.
    pub fn mint_pkp(&self) -> Pkp {
        self.import_key(PrivateKeySigner::random())
    }

    /// Makes `signer` available as a PKP.
    pub fn import_key(&self, signer: PrivateKeySigner) -> Pkp {
        let public_key = Bytes::copy_from_slice(
            signer.credential().verifying_key().to_encoded_point(false).as_bytes(),
        );
        let token_id = self.next_token_id.fetch_add(1, Ordering::Relaxed);
        let pkp = Pkp {
            token_id: Some(U256::from(token_id)),
            public_key: public_key.clone(),
            eth_address: signer.address(),
        };
        self.keys.write().insert(public_key, signer);
        pkp
    }

    /// How many times [`SigningNetwork::connect`] was called.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    fn ensure_connected(&self) -> Result<(), SigningError> {
        if self.connect_count() == 0 {
            return Err(SigningError::NotConnected);
        }
        Ok(())
    }

    fn key(&self, public_key: &Bytes) -> Result<PrivateKeySigner, SigningError> {
        self.keys
            .read()
            .get(public_key)
            .cloned()
            .ok_or_else(|| SigningError::UnknownPkp(public_key.clone()))
    }

    fn node_url(index: usize) -> String {
        format!("dev://node-{index}")
    }

    fn session_message(
        session_key_uri: &str,
        chain: &str,
        resources: &[String],
        expiration: DateTime<Utc>,
        node: &str,
    ) -> String {
        format!(
            "{node} certifies session key {session_key_uri}\nchain: {chain}\n\
             resources: {}\nexpiration: {}",
            resources.join(","),
            expiration.to_rfc3339(),
        )
    }

    fn verify_session(
        &self,
        session: &SessionSigs,
        key: &PrivateKeySigner,
    ) -> Result<(), SigningError> {
        if session.sigs.len() != self.nodes {
            return Err(SigningError::Authentication("incomplete session signatures".into()));
        }
        for (node, auth_sig) in &session.sigs {
            let expected = Self::session_message(
                &session.session_key_uri,
                &session.chain,
                &session.resources,
                session.expiration,
                node,
            );
            if auth_sig.signed_message != expected {
                return Err(SigningError::Authentication(format!(
                    "{node}: session fields differ from the certified session"
                )));
            }
            let recovered = auth_sig
                .sig
                .recover_address_from_msg(auth_sig.signed_message.as_bytes())
                .map_err(|e| SigningError::Authentication(format!("{node}: {e}")))?;
            if recovered != key.address() || auth_sig.address != key.address() {
                return Err(SigningError::Authentication(format!(
                    "{node}: session was not certified by this PKP"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SigningNetwork for DevNetwork {
    async fn connect(&self) -> Result<(), SigningError> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn session_sigs(
        &self,
        request: &SessionRequest,
        callback: &dyn AuthNeededCallback,
    ) -> Result<SessionSigs, SigningError> {
        self.ensure_connected()?;
        if request.expiration <= Utc::now() {
            return Err(SigningError::SessionExpired(request.expiration));
        }

        let params = AuthCallbackParams {
            chain: request.chain.clone(),
            resources: request.resources.clone(),
            expiration: request.expiration,
            session_key_uri: format!("lit:session:{}", B256::random()),
        };
        let auth = callback.authenticate(&params)?;
        if auth.session_key_uri != params.session_key_uri {
            return Err(SigningError::Authentication("certified a different session key".into()));
        }
        if auth.auth_methods.is_empty()
            || auth.auth_methods.iter().any(|method| method.access_token.is_empty())
        {
            return Err(SigningError::Authentication("no usable auth method".into()));
        }
        let key = self.key(&auth.pkp_public_key)?;

        let mut sigs = BTreeMap::new();
        for index in 0..self.nodes {
            let node = Self::node_url(index);
            let signed_message = Self::session_message(
                &auth.session_key_uri,
                &auth.chain,
                &auth.resources,
                auth.expiration,
                &node,
            );
            let sig = key.sign_message_sync(signed_message.as_bytes())?;
            sigs.insert(
                node,
                AuthSig {
                    sig,
                    derived_via: DERIVED_VIA.to_string(),
                    signed_message,
                    address: key.address(),
                },
            );
        }

        debug!(target: "wallets", address = %key.address(), expiration = %auth.expiration, "issued dev session");
        Ok(SessionSigs {
            pkp_public_key: auth.pkp_public_key,
            session_key_uri: auth.session_key_uri,
            chain: auth.chain,
            expiration: auth.expiration,
            resources: auth.resources,
            sigs,
        })
    }

    async fn sign_ecdsa(
        &self,
        session: &SessionSigs,
        to_sign: B256,
        public_key: &Bytes,
        sig_name: &str,
    ) -> Result<ThresholdSignature, SigningError> {
        self.ensure_connected()?;
        session.check(public_key, crate::SIGN_ACTION_RESOURCE)?;
        let key = self.key(public_key)?;
        self.verify_session(session, &key)?;

        let signature = key.sign_hash_sync(&to_sign)?;
        Ok(ThresholdSignature {
            name: sig_name.to_string(),
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
            recid: signature.v() as u8,
        })
    }
}
