//! An in-process relay server.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use litsafe_relay::{PollConfig, RelayClient};
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use url::Url;

pub const PUBLIC_KEY: &str = "0x0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
pub const ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

#[derive(Clone)]
pub struct MockRelay {
    inner: Arc<Inner>,
}

struct Inner {
    mint: Mutex<(StatusCode, Value)>,
    fetch: Mutex<(StatusCode, Value)>,
    statuses: Mutex<VecDeque<Value>>,
    status_requests: Mutex<Vec<String>>,
    api_keys: Mutex<Vec<Option<String>>>,
    id_tokens: Mutex<Vec<String>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                mint: Mutex::new((StatusCode::OK, json!({ "requestId": "r1" }))),
                fetch: Mutex::new((StatusCode::OK, json!({ "pkps": [] }))),
                statuses: Mutex::new(VecDeque::from([succeeded()])),
                status_requests: Mutex::default(),
                api_keys: Mutex::default(),
                id_tokens: Mutex::default(),
            }),
        }
    }

    pub fn on_mint(self, status: StatusCode, body: Value) -> Self {
        *self.inner.mint.lock().unwrap() = (status, body);
        self
    }

    pub fn on_fetch(self, status: StatusCode, body: Value) -> Self {
        *self.inner.fetch.lock().unwrap() = (status, body);
        self
    }

    /// Status bodies returned in order; the last one repeats.
    pub fn on_status(self, bodies: impl IntoIterator<Item = Value>) -> Self {
        *self.inner.statuses.lock().unwrap() = bodies.into_iter().collect();
        self
    }

    pub fn status_requests(&self) -> Vec<String> {
        self.inner.status_requests.lock().unwrap().clone()
    }

    pub fn api_keys(&self) -> Vec<Option<String>> {
        self.inner.api_keys.lock().unwrap().clone()
    }

    pub fn id_tokens(&self) -> Vec<String> {
        self.inner.id_tokens.lock().unwrap().clone()
    }

    /// Serves the relay on an ephemeral port and returns a client for it.
    pub async fn spawn(self) -> RelayClient {
        let app = Router::new()
            .route("/auth/google", post(mint))
            .route("/auth/google/userinfo", post(fetch))
            .route("/auth/status/{id}", get(status))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        RelayClient::new(base)
            .with_poll(PollConfig { interval: Duration::from_millis(5), max_attempts: 20 })
    }

    fn record(&self, headers: &HeaderMap, body: &Value) {
        let key = headers.get("api-key").map(|v| v.to_str().unwrap().to_string());
        self.inner.api_keys.lock().unwrap().push(key);
        if let Some(token) = body.get("idToken").and_then(Value::as_str) {
            self.inner.id_tokens.lock().unwrap().push(token.to_string());
        }
    }
}

pub fn succeeded() -> Value {
    json!({
        "status": "Succeeded",
        "pkpEthAddress": ADDRESS,
        "pkpPublicKey": PUBLIC_KEY,
        "pkpTokenId": "0x2a",
    })
}

pub fn pending() -> Value {
    json!({ "status": "InProgress" })
}

async fn mint(
    State(mock): State<MockRelay>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.record(&headers, &body);
    let (status, body) = mock.inner.mint.lock().unwrap().clone();
    (status, Json(body))
}

async fn fetch(
    State(mock): State<MockRelay>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.record(&headers, &body);
    let (status, body) = mock.inner.fetch.lock().unwrap().clone();
    (status, Json(body))
}

async fn status(State(mock): State<MockRelay>, Path(id): Path<String>) -> Json<Value> {
    mock.inner.status_requests.lock().unwrap().push(id);
    let mut statuses = mock.inner.statuses.lock().unwrap();
    let body = if statuses.len() > 1 { statuses.pop_front() } else { statuses.front().cloned() };
    Json(body.unwrap_or_else(pending))
}
