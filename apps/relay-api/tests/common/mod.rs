#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use relay_common::PeerId;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use relay_api::config::Config;
use relay_api::AppState;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build a test AppState with a short delivery allowance.
pub fn test_state() -> AppState {
    AppState::new(Config {
        queue_capacity: 16,
        delivery_timeout: Duration::from_millis(100),
        ..Config::default()
    })
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = relay_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background.
pub async fn start_ws_server() -> (SocketAddr, AppState) {
    start_ws_server_with(test_state()).await
}

/// Same as [`start_ws_server`], with a caller-built state.
pub async fn start_ws_server_with(state: AppState) -> (SocketAddr, AppState) {
    let app = relay_api::routes::router().with_state(state.clone());
    (serve(app).await, state)
}

/// Serve `app` on an ephemeral local port in the background.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Connect to the relay and read the ASSIGN_ID message.
pub async fn connect(addr: SocketAddr) -> (Client, PeerId) {
    let url = format!("ws://{addr}/ws/connect");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let assign = recv_json(&mut ws).await;
    assert_eq!(assign["type"], "ASSIGN_ID");
    let id: PeerId = assign["id"]
        .as_str()
        .expect("id present")
        .parse()
        .expect("id parses");

    (ws, id)
}

/// Read the next text frame as JSON, failing after five seconds.
pub async fn recv_json(ws: &mut Client) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse message")
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("Expected text frame, got: {other:?}"),
        }
    }
}

/// Assert that no text frame arrives within `wait`.
pub async fn expect_silence(ws: &mut Client, wait: Duration) {
    if let Ok(Some(Ok(tungstenite::Message::Text(text)))) = time::timeout(wait, ws.next()).await {
        panic!("Expected no message, got: {}", text.as_str());
    }
}

pub async fn send_json(ws: &mut Client, value: serde_json::Value) {
    ws.send(tungstenite::Message::Text(value.to_string().into()))
        .await
        .expect("ws send");
}

pub async fn send_raw(ws: &mut Client, raw: &str) {
    ws.send(tungstenite::Message::Text(raw.to_string().into()))
        .await
        .expect("ws send");
}
