//! Shared harness: a real server on an ephemeral port over in-memory backends.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use collab_session::config::Config;
use collab_session::db::memory::{MemoryDocumentStore, MemoryUserDirectory};
use collab_session::services::auth_service::JwtIdentityGate;
use collab_session::{build_router, AppState};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const SECRET: &str = "integration-secret";

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub ws_url: String,
    pub app: Arc<AppState>,
    pub store: Arc<MemoryDocumentStore>,
    pub users: Arc<MemoryUserDirectory>,
}

/// App state with documents `doc1`, `doc2` and users `u1` (alice), `u2`
/// (bob), `u3` (carol).
pub fn test_app(config: Config) -> (Arc<AppState>, Arc<MemoryDocumentStore>, Arc<MemoryUserDirectory>) {
    let store = Arc::new(MemoryDocumentStore::new());
    store.create("doc1", json!({"ops": []}));
    store.create("doc2", json!({"ops": []}));

    let users = Arc::new(MemoryUserDirectory::new());
    users.insert("u1", "alice", "alice@example.com");
    users.insert("u2", "bob", "bob@example.com");
    users.insert("u3", "carol", "carol@example.com");

    let app = Arc::new(AppState::new(
        config,
        Arc::new(JwtIdentityGate::new(SECRET)),
        users.clone(),
        store.clone(),
    ));
    (app, store, users)
}

pub async fn start_server() -> TestServer {
    start_server_with(Config::default()).await
}

pub async fn start_server_with(config: Config) -> TestServer {
    let (app, store, users) = test_app(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = build_router(app.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        ws_url: format!("ws://{}/ws", addr),
        app,
        store,
        users,
    }
}

pub fn token_for(user_id: &str) -> String {
    let exp = (Utc::now() + ChronoDuration::minutes(10)).timestamp();
    encode(
        &Header::default(),
        &json!({"userId": user_id, "email": format!("{}@example.com", user_id), "exp": exp}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn connect(server: &TestServer) -> Client {
    let (client, _) = connect_async(server.ws_url.as_str()).await.unwrap();
    client
}

pub async fn send(client: &mut Client, value: Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

/// Next JSON message, skipping transport frames. Panics after two seconds.
pub async fn recv(client: &mut Client) -> Value {
    recv_within(client, Duration::from_secs(2))
        .await
        .expect("timed out waiting for a message")
}

pub async fn recv_within(client: &mut Client, limit: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let frame = match timeout(remaining, client.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(_) => return None,
            Err(_) => return None,
        };
        if let Message::Text(text) = frame {
            return Some(serde_json::from_str(text.as_str()).unwrap());
        }
    }
}

/// Assert that no JSON message arrives for a short while.
pub async fn assert_silent(client: &mut Client) {
    if let Some(msg) = recv_within(client, Duration::from_millis(200)).await {
        panic!("unexpected message: {}", msg);
    }
}

/// Join and consume the roster; returns the roster's presences.
pub async fn join(client: &mut Client, document_id: &str, user_id: &str) -> Vec<Value> {
    send(client, json!({"type": "join", "documentId": document_id, "token": token_for(user_id)})).await;
    let roster = recv(client).await;
    assert_eq!(roster["type"], "roster", "expected roster, got {}", roster);
    roster["presences"].as_array().unwrap().clone()
}

/// Poll until `check` holds, for up to two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}
