//! Shared helpers for socket-level tests: a live server on an ephemeral port.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::net::SocketAddr;

use futures::StreamExt;
use reel_web::{AppState, ServerConfig, create_app};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn spawn_server(state: AppState) -> SocketAddr {
    let app = create_app(&ServerConfig::default(), state).expect("router");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (stream, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("websocket handshake");
    stream
}

/// Next text frame, or `None` once the server closes the connection.
pub async fn next_text(client: &mut Client) -> Option<String> {
    while let Some(msg) = client.next().await {
        match msg.ok()? {
            Message::Text(text) => return Some(text.as_str().to_string()),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}
