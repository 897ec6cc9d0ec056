//! Shared harness: an in-process server on a random port with a temporary
//! data directory.

#![allow(dead_code)]

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use messenger_server::config::Config;
use messenger_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWrite = SplitSink<WsStream, Message>;
pub type WsRead = SplitStream<WsStream>;

pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    pub state: AppState,
}

pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Start the server with test defaults (no practical auth rate limit).
pub async fn start_test_server() -> TestServer {
    start_test_server_with(|_| {}).await
}

pub async fn start_test_server_with(configure: impl FnOnce(&mut Config)) -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let mut config = Config {
        data_dir: data_dir.clone(),
        auth_rate_limit_burst: 1000,
        ..Config::default()
    };
    configure(&mut config);

    let db = messenger_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = messenger_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = AppState::new(db, jwt_secret, &config);
    let app = messenger_server::routes::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    TestServer {
        base_url: format!("http://{}", addr),
        addr,
        state,
    }
}

/// Register and log in a user.
pub async fn register_user(server: &TestServer, username: &str) -> TestUser {
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/user/register", server.base_url))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
            "first_name": username,
            "last_name": "Tester",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Registration failed for {}", username);

    let resp = client
        .post(format!("{}/api/user/login", server.base_url))
        .json(&json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Login failed for {}", username);

    let body: Value = resp.json().await.unwrap();
    TestUser {
        id: body["user"]["id"].as_str().unwrap().to_string(),
        username: username.to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

/// Open a socket for the user and wait until its own online event arrives,
/// which means the hub has registered it.
pub async fn connect_ws(server: &TestServer, user: &TestUser) -> (WsWrite, WsRead) {
    let ws_url = format!("ws://{}/ws?access_token={}", server.addr, user.token);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");
    let (write, mut read) = ws_stream.split();

    let id = user.id.clone();
    wait_for_event(&mut read, move |event| {
        event["type"] == "UserStatusChanged" && event["user_id"] == id && event["is_online"] == true
    })
    .await;

    (write, read)
}

/// Next text frame decoded as JSON, or None on timeout/close.
pub async fn next_event(read: &mut WsRead, wait: Duration) -> Option<Value> {
    loop {
        match tokio::time::timeout(wait, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                return Some(serde_json::from_str(text.as_str()).expect("server sent invalid JSON"))
            }
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            _ => return None,
        }
    }
}

/// Skip events until one matches; panics after two seconds.
pub async fn wait_for_event(read: &mut WsRead, matches: impl Fn(&Value) -> bool) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let event = next_event(read, remaining)
            .await
            .expect("Expected event before timeout");
        if matches(&event) {
            return event;
        }
    }
}

/// Assert nothing but presence noise arrives within the window.
pub async fn assert_no_event_of_type(read: &mut WsRead, event_type: &str) {
    while let Some(event) = next_event(read, Duration::from_millis(300)).await {
        assert_ne!(event["type"], event_type, "Unexpected event: {}", event);
    }
}
