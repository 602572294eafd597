use crate::fakes::{FakeRelay, FakeSubmitter, ImpostorNetwork, MintOutcome, SUBMITTED};
use alloy_primitives::{Address, Bytes, U256, address};
use alloy_sol_types::SolCall;
use litsafe_config::Config;
use litsafe_safe::{
    SIGNATURE_LENGTH, SafeDomainDraft, SafeSignature, SafeTxDraft,
    contracts::{ISafe, ISafeProxyFactory},
};
use litsafe_wallets::{DevNetwork, NetworkHandle};
use litsafe_workflow::{CosignRequest, ErrorKind, View, Workflow, WorkflowError};
use similar_asserts::assert_eq;
use std::sync::Arc;
use url::Url;

const FACTORY: Address = address!("0xa6B71E26C5e0845f74c812102Ca7114b6a896AB2");
const SINGLETON: Address = address!("0x3E5c63644E683549055b9Be8653de26E0B4CD36E");
const SAFE: Address = address!("0x1C8b9B78e3085866521FE206fa4c1a67F49f153A");

fn config() -> Config {
    let mut config = Config::default();
    config.safe.factory = Some(FACTORY);
    config.safe.singleton = Some(SINGLETON);
    config
}

fn callback(token: &str) -> Url {
    Url::parse(&format!("http://localhost:3000/?provider=google&id_token={token}")).unwrap()
}

type TestWorkflow = Workflow<FakeRelay, FakeSubmitter>;

fn workflow_with(relay: FakeRelay, network: NetworkHandle) -> TestWorkflow {
    litsafe_common::init_tracing();
    Workflow::new(config(), relay, FakeSubmitter::default(), network)
}

fn workflow() -> (TestWorkflow, Arc<DevNetwork>) {
    let network = Arc::new(DevNetwork::default());
    let relay = FakeRelay::new(network.clone());
    (workflow_with(relay, NetworkHandle::from_arc(network.clone())), network)
}

async fn with_session() -> (TestWorkflow, Arc<DevNetwork>) {
    let (mut workflow, network) = workflow();
    workflow.start(&callback("abc")).await.unwrap();
    workflow.mint().await.unwrap();
    assert_eq!(workflow.view(), &View::SessionCreated);
    (workflow, network)
}

fn error_kind(view: &View) -> Option<ErrorKind> {
    match view {
        View::Error { failure, .. } => Some(failure.kind),
        _ => None,
    }
}

#[tokio::test]
async fn ignores_non_callback_locations() {
    let (mut workflow, _) = workflow();
    let current = Url::parse("http://localhost:3000/").unwrap();
    assert_eq!(workflow.start(&current).await.unwrap(), None);
    assert_eq!(workflow.view(), &View::SignIn);
    assert!(workflow.login_url().as_str().starts_with("https://login.litgateway.com/auth/google"));
}

#[tokio::test]
async fn empty_fetch_prompts_for_mint() {
    let (mut workflow, _) = workflow();
    let cleaned = workflow.start(&callback("abc")).await.unwrap();

    assert_eq!(cleaned, Some(Url::parse("http://localhost:3000/").unwrap()));
    assert_eq!(workflow.view(), &View::Fetched);
    assert!(workflow.needs_mint());
    assert_eq!(workflow.token().map(|t| t.as_str()), Some("abc"));
    assert_eq!(*workflow.relay().tokens.lock(), vec!["abc".to_string()]);
}

#[tokio::test]
async fn malformed_callback_is_an_error() {
    let (mut workflow, _) = workflow();
    let current = Url::parse("http://localhost:3000/?provider=github&id_token=abc").unwrap();
    let err = workflow.start(&current).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedRedirect);
    assert_eq!(error_kind(workflow.view()), Some(ErrorKind::MalformedRedirect));
    workflow.acknowledge().unwrap();
    assert_eq!(workflow.view(), &View::SignIn);
}

#[tokio::test]
async fn fetch_failure_resumes_at_fetched() {
    let network = Arc::new(DevNetwork::default());
    let mut relay = FakeRelay::new(network.clone());
    relay.fetch_available = false;
    let mut workflow = workflow_with(relay, NetworkHandle::from_arc(network));

    let err = workflow.start(&callback("abc")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RelayUnavailable);
    assert_eq!(error_kind(workflow.view()), Some(ErrorKind::RelayUnavailable));
    workflow.acknowledge().unwrap();
    assert_eq!(workflow.view(), &View::Fetched);
}

#[tokio::test]
async fn mint_creates_session() {
    let (mut workflow, network) = workflow();
    workflow.start(&callback("abc")).await.unwrap();
    let pkp = workflow.mint().await.unwrap();

    assert!(pkp.is_consistent());
    assert_eq!(workflow.pkps().to_vec(), vec![pkp.clone()]);
    assert_eq!(workflow.view(), &View::SessionCreated);
    let session = workflow.session().unwrap();
    assert_eq!(session.pkp, pkp);
    assert_eq!(session.signer.session().resources, vec!["litAction://*".to_string()]);
    assert_eq!(network.connect_count(), 1);
}

#[tokio::test]
async fn failed_mint_status_is_mint_failed() {
    let network = Arc::new(DevNetwork::default());
    let mut relay = FakeRelay::new(network.clone());
    relay.mint = MintOutcome::Fail;
    let mut workflow = workflow_with(relay, NetworkHandle::from_arc(network));

    workflow.start(&callback("abc")).await.unwrap();
    let err = workflow.mint().await.unwrap_err();
    assert!(matches!(err, WorkflowError::Relay(_)));
    assert_eq!(err.kind(), ErrorKind::MintFailed);
    assert_eq!(error_kind(workflow.view()), Some(ErrorKind::MintFailed));
    assert!(workflow.pkps().is_empty());

    workflow.acknowledge().unwrap();
    assert_eq!(workflow.view(), &View::Fetched);
}

#[tokio::test]
async fn mint_rejections_are_classified() {
    for (outcome, kind) in [
        (MintOutcome::Reject, ErrorKind::MintRejected),
        (MintOutcome::Unavailable, ErrorKind::RelayUnavailable),
    ] {
        let network = Arc::new(DevNetwork::default());
        let mut relay = FakeRelay::new(network.clone());
        relay.mint = outcome;
        let mut workflow = workflow_with(relay, NetworkHandle::from_arc(network));
        workflow.start(&callback("abc")).await.unwrap();
        assert_eq!(workflow.mint().await.unwrap_err().kind(), kind);
    }
}

#[tokio::test]
async fn select_existing_pkp() {
    let network = Arc::new(DevNetwork::default());
    let pkp = network.mint_pkp();
    let mut relay = FakeRelay::new(network.clone());
    relay.existing = vec![network.mint_pkp(), pkp.clone()];
    let mut workflow = workflow_with(relay, NetworkHandle::from_arc(network));

    workflow.start(&callback("abc")).await.unwrap();
    assert!(!workflow.needs_mint());

    let err = workflow.select_pkp(Address::repeat_byte(9)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserInputIncomplete);
    assert_eq!(workflow.view(), &View::Fetched);

    workflow.select_pkp(pkp.eth_address).await.unwrap();
    assert_eq!(workflow.session().unwrap().pkp, pkp);
}

#[tokio::test]
async fn session_for_foreign_pkp_fails() {
    let network = Arc::new(DevNetwork::default());
    let mut relay = FakeRelay::new(network.clone());
    // Known to the relay but not held by the signing network.
    let stranger = DevNetwork::default().mint_pkp();
    relay.existing = vec![stranger.clone()];
    let mut workflow = workflow_with(relay, NetworkHandle::from_arc(network));

    workflow.start(&callback("abc")).await.unwrap();
    let err = workflow.select_pkp(stranger.eth_address).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionEstablishmentFailed);
    assert!(workflow.session().is_none());
    workflow.acknowledge().unwrap();
    assert_eq!(workflow.view(), &View::Fetched);
}

#[tokio::test]
async fn out_of_range_session_ttl_fails_session() {
    let network = Arc::new(DevNetwork::default());
    let relay = FakeRelay::new(network.clone());
    let mut config = config();
    config.session_ttl = 10_000_000_000_000;
    let mut workflow =
        Workflow::new(config, relay, FakeSubmitter::default(), NetworkHandle::from_arc(network));

    workflow.start(&callback("abc")).await.unwrap();
    let err = workflow.mint().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionEstablishmentFailed);
    assert_eq!(error_kind(workflow.view()), Some(ErrorKind::SessionEstablishmentFailed));
    assert_eq!(workflow.pkps().len(), 1);
    assert!(workflow.session().is_none());

    workflow.acknowledge().unwrap();
    assert_eq!(workflow.view(), &View::Fetched);
}

#[tokio::test]
async fn actions_require_a_session() {
    let (mut workflow, _) = workflow();
    let err = workflow.sign_message("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(workflow.view(), &View::SignIn);

    assert_eq!(workflow.mint().await.unwrap_err().kind(), ErrorKind::InvalidTransition);
    assert!(workflow.acknowledge().is_err());
}

#[tokio::test]
async fn signed_message_recovers_to_pkp() {
    let (mut workflow, _) = with_session().await;
    let signed = workflow.sign_message("Free the web").await.unwrap();

    let pkp = workflow.session().unwrap().pkp.clone();
    assert_eq!(signed.recovered, pkp.eth_address);
    assert_eq!(signed.signature.recover_address_from_msg("Free the web").unwrap(), pkp.eth_address);
    assert_eq!(workflow.signed_message(), Some(&signed));
    assert_eq!(workflow.view(), &View::SessionCreated);
}

#[tokio::test]
async fn signature_mismatch_resumes_session() {
    let dev = Arc::new(DevNetwork::default());
    let impostor = dev.mint_pkp();
    let network =
        NetworkHandle::new(ImpostorNetwork { inner: dev.clone(), impostor: impostor.clone() });
    let mut workflow = workflow_with(FakeRelay::new(dev), network);
    workflow.start(&callback("abc")).await.unwrap();
    workflow.mint().await.unwrap();

    let err = workflow.sign_message("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureVerificationMismatch);
    assert_eq!(workflow.signed_message().unwrap().recovered, impostor.eth_address);
    assert_eq!(error_kind(workflow.view()), Some(ErrorKind::SignatureVerificationMismatch));

    workflow.acknowledge().unwrap();
    assert_eq!(workflow.view(), &View::SessionCreated);
}

#[tokio::test]
async fn create_safe_calls_factory() {
    let (mut workflow, _) = with_session().await;
    let pkp = workflow.session().unwrap().pkp.eth_address;
    let (owner_a, owner_b) = (Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));

    let hash = workflow.create_safe(owner_a, owner_b).await.unwrap();
    assert_eq!(hash, SUBMITTED);

    let requests = workflow.submitter().requests.lock();
    let request = &requests[0];
    assert_eq!(request.from, Some(pkp));
    assert_eq!(request.to, Some(FACTORY.into()));
    assert_eq!(request.chain_id, Some(5));

    let input = request.input.input().unwrap();
    let call = ISafeProxyFactory::createProxyWithNonceCall::abi_decode(input).unwrap();
    assert_eq!(call._singleton, SINGLETON);
    let setup = ISafe::setupCall::abi_decode(&call.initializer).unwrap();
    assert_eq!(setup._owners, vec![owner_a, owner_b, pkp]);
    assert_eq!(setup._threshold, U256::from(2));
}

#[tokio::test]
async fn create_safe_failures_are_notifications() {
    let (mut workflow, _) = with_session().await;

    let pkp = workflow.session().unwrap().pkp.eth_address;
    let err = workflow.create_safe(pkp, Address::repeat_byte(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserInputIncomplete);
    assert_eq!(workflow.view(), &View::SessionCreated);
    assert!(workflow.submitter().requests.lock().is_empty());
}

#[tokio::test]
async fn create_safe_needs_configured_factory() {
    let network = Arc::new(DevNetwork::default());
    let relay = FakeRelay::new(network.clone());
    let mut workflow = Workflow::new(
        Config::default(),
        relay,
        FakeSubmitter::default(),
        NetworkHandle::from_arc(network),
    );
    workflow.start(&callback("abc")).await.unwrap();
    workflow.mint().await.unwrap();

    let err = workflow.create_safe(Address::repeat_byte(1), Address::repeat_byte(2)).await;
    assert!(matches!(err, Err(WorkflowError::MissingContract("safe.factory"))));
}

fn cosign_request(signer_signature: Option<SafeSignature>) -> CosignRequest {
    CosignRequest {
        domain: SafeDomainDraft { chain_id: Some(5), verifying_contract: Some(SAFE) },
        tx: SafeTxDraft {
            to: Some(Address::repeat_byte(0x42)),
            value: Some(U256::from(1000)),
            nonce: Some(U256::from(1)),
            ..Default::default()
        },
        signer_signature,
    }
}

#[tokio::test]
async fn cosign_packs_sorted_signatures() {
    let (mut workflow, _) = with_session().await;
    let pkp = workflow.session().unwrap().pkp.eth_address;
    let other = SafeSignature::new(Address::ZERO, vec![0x11; SIGNATURE_LENGTH]);

    let outcome = workflow.cosign_and_submit(cosign_request(Some(other.clone()))).await.unwrap();
    assert_eq!(outcome.tx_hash, SUBMITTED);
    assert_eq!(outcome.signature.signer, pkp);
    assert_eq!(outcome.signature.data.len(), SIGNATURE_LENGTH);

    let requests = workflow.submitter().requests.lock();
    assert_eq!(requests[0].to, Some(SAFE.into()));
    let call = ISafe::execTransactionCall::abi_decode(requests[0].input.input().unwrap()).unwrap();
    assert_eq!(call.to, Address::repeat_byte(0x42));
    assert_eq!(call.value, U256::from(1000));

    // The zero address sorts first.
    let mut expected = other.data.to_vec();
    expected.extend_from_slice(&outcome.signature.data);
    assert_eq!(call.signatures, Bytes::from(expected));

    let signature = alloy_primitives::Signature::try_from(&outcome.signature.data[..]).unwrap();
    let recovered = signature.recover_address_from_prehash(&outcome.safe_tx_hash).unwrap();
    assert_eq!(recovered, pkp);
}

#[tokio::test]
async fn cosign_keeps_signatures_across_failures() {
    let (mut workflow, _) = with_session().await;
    let other = SafeSignature::new(Address::repeat_byte(0xcc), vec![0x22; SIGNATURE_LENGTH]);

    // Incomplete transaction: the supplied signature is still remembered.
    let mut request = cosign_request(Some(other.clone()));
    request.tx.to = None;
    let err = workflow.cosign_and_submit(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserInputIncomplete);
    assert_eq!(workflow.cosign_state().signer_signature, Some(other.clone()));
    assert_eq!(workflow.view(), &View::SessionCreated);

    // Retrying without re-entering the signature reuses it.
    let outcome = workflow.cosign_and_submit(cosign_request(None)).await.unwrap();
    assert_eq!(workflow.cosign_state().safe_signature, Some(outcome.signature));
}

#[tokio::test]
async fn cosign_rejects_bad_signer_signature() {
    let (mut workflow, _) = with_session().await;
    let pkp = workflow.session().unwrap().pkp.eth_address;

    let err = workflow.cosign_and_submit(cosign_request(None)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserInputIncomplete);

    let short = SafeSignature::new(Address::repeat_byte(1), vec![0; 64]);
    let err = workflow.cosign_and_submit(cosign_request(Some(short))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignatureLength);

    let own = SafeSignature::new(pkp, vec![0; SIGNATURE_LENGTH]);
    let err = workflow.cosign_and_submit(cosign_request(Some(own))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateSigner);

    // The PKP signature of the last attempt is retained.
    assert!(workflow.cosign_state().safe_signature.is_some());
    assert_eq!(workflow.view(), &View::SessionCreated);
    assert!(workflow.submitter().requests.lock().is_empty());
}
