use crate::mock::{ADDRESS, MockRelay, PUBLIC_KEY, pending, succeeded};
use alloy_primitives::{U256, address};
use axum::http::StatusCode;
use litsafe_common::IdToken;
use litsafe_relay::{PollConfig, Relay, RelayClient, RelayError, RequestId};
use serde_json::json;
use std::time::Duration;
use url::Url;

fn token() -> IdToken {
    IdToken::from("abc")
}

#[tokio::test]
async fn mint_returns_request_id() {
    let mock = MockRelay::new();
    let relay = mock.clone().spawn().await.with_api_key("relay-key").unwrap();

    let id = relay.mint(&token()).await.unwrap();
    assert_eq!(id, RequestId::from("r1"));
    assert_eq!(mock.id_tokens(), vec!["abc".to_string()]);
    assert_eq!(mock.api_keys(), vec![Some("relay-key".to_string())]);
}

#[tokio::test]
async fn mint_without_request_id_is_rejected() {
    let relay = MockRelay::new().on_mint(StatusCode::OK, json!({})).spawn().await;
    assert!(matches!(relay.mint(&token()).await, Err(RelayError::MintRejected)));

    let relay = MockRelay::new().on_mint(StatusCode::OK, json!({ "requestId": "" })).spawn().await;
    assert!(matches!(relay.mint(&token()).await, Err(RelayError::MintRejected)));
}

#[tokio::test]
async fn mint_server_error_is_unavailable() {
    let relay = MockRelay::new()
        .on_mint(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "db down" }))
        .spawn()
        .await;
    let err = relay.mint(&token()).await.unwrap_err();
    assert!(err.is_unavailable(), "{err}");
    match err {
        RelayError::Status { status, body, .. } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("db down"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn poll_waits_for_success() {
    let mock = MockRelay::new().on_status([pending(), pending(), succeeded()]);
    let relay = mock.clone().spawn().await;

    let pkp = relay.poll_until_terminal(&RequestId::from("r1")).await.unwrap();
    assert_eq!(pkp.eth_address, address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
    assert_eq!(pkp.public_key.to_string(), PUBLIC_KEY);
    assert_eq!(pkp.token_id, Some(U256::from(42)));
    assert_eq!(mock.status_requests(), vec!["r1"; 3]);
}

#[tokio::test]
async fn poll_error_status_is_mint_failure() {
    let relay = MockRelay::new().on_status([json!({ "status": "error" })]).spawn().await;
    let err = relay.poll_until_terminal(&RequestId::from("r1")).await.unwrap_err();
    assert!(matches!(err, RelayError::MintFailed { ref request_id, .. } if request_id.0 == "r1"));
}

#[tokio::test]
async fn poll_error_field_is_mint_failure() {
    let relay = MockRelay::new()
        .on_status([pending(), json!({ "error": "insufficient funds" })])
        .spawn()
        .await;
    match relay.poll_until_terminal(&RequestId::from("r1")).await {
        Err(RelayError::MintFailed { reason, .. }) => assert_eq!(reason, "insufficient funds"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn poll_success_without_key_pair_fails() {
    let relay = MockRelay::new()
        .on_status([json!({ "status": "Succeeded", "pkpEthAddress": ADDRESS })])
        .spawn()
        .await;
    let err = relay.poll_until_terminal(&RequestId::from("r1")).await.unwrap_err();
    assert!(matches!(err, RelayError::MintFailed { .. }), "{err}");
}

#[tokio::test]
async fn poll_gives_up_after_budget() {
    let mock = MockRelay::new().on_status([pending()]);
    let relay = mock
        .clone()
        .spawn()
        .await
        .with_poll(PollConfig { interval: Duration::from_millis(1), max_attempts: 3 });

    let err = relay.poll_until_terminal(&RequestId::from("r9")).await.unwrap_err();
    assert!(matches!(err, RelayError::MintTimeout { attempts: 3, .. }), "{err}");
    assert_eq!(mock.status_requests().len(), 3);
}

#[tokio::test]
async fn zero_attempt_budget_still_polls_once() {
    let mock = MockRelay::new().on_status([succeeded()]);
    let relay = mock
        .clone()
        .spawn()
        .await
        .with_poll(PollConfig { interval: Duration::from_millis(1), max_attempts: 0 });

    let pkp = relay.poll_until_terminal(&RequestId::from("r1")).await.unwrap();
    assert_eq!(pkp.public_key.to_string(), PUBLIC_KEY);
    assert_eq!(mock.status_requests(), vec!["r1"]);
}

#[tokio::test]
async fn mint_and_wait_chains_both_calls() {
    let mock = MockRelay::new()
        .on_mint(StatusCode::OK, json!({ "requestId": "req-7" }))
        .on_status([pending(), succeeded()]);
    let relay = mock.clone().spawn().await;

    let pkp = relay.mint_and_wait(&token()).await.unwrap();
    assert!(pkp.is_consistent());
    assert_eq!(mock.status_requests(), vec!["req-7", "req-7"]);
}

#[tokio::test]
async fn fetch_accepts_empty_list() {
    let relay = MockRelay::new().spawn().await;
    assert!(relay.fetch_existing(&token()).await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_returns_key_pairs() {
    let relay = MockRelay::new()
        .on_fetch(
            StatusCode::OK,
            json!({ "pkps": [{ "tokenId": "7", "publicKey": PUBLIC_KEY, "ethAddress": ADDRESS }] }),
        )
        .spawn()
        .await;
    let pkps = relay.fetch_existing(&token()).await.unwrap();
    assert_eq!(pkps.len(), 1);
    assert_eq!(pkps[0].token_id, Some(U256::from(7)));
}

#[tokio::test]
async fn fetch_without_pkps_field_is_unavailable() {
    let relay = MockRelay::new().on_fetch(StatusCode::OK, json!({ "ok": true })).spawn().await;
    let err = relay.fetch_existing(&token()).await.unwrap_err();
    assert!(matches!(err, RelayError::MalformedResponse { .. }), "{err}");
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn unreachable_relay_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let relay = RelayClient::new(Url::parse(&format!("http://{addr}")).unwrap());
    let err = relay.fetch_existing(&token()).await.unwrap_err();
    assert!(matches!(err, RelayError::Transport { .. }), "{err}");
    assert!(err.is_unavailable());
}
