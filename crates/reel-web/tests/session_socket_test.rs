//! Session channel protocol over a real socket.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{connect, next_text, spawn_server};
use futures::SinkExt;
use reel_core::{ChangeRecord, ClientFrame, EditOperation, ServerFrame};
use reel_web::{AppState, SESSION_SOCKET_PATH};
use tokio_tungstenite::tungstenite::Message;

fn change_frame(timestamp: u64, op: EditOperation, prior: &str) -> Message {
    let record = ChangeRecord::capture(timestamp, op, prior).unwrap();
    Message::text(ClientFrame::Change(record).encode().unwrap())
}

#[tokio::test]
async fn test_full_recording_is_persisted_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::in_memory(dir.path());
    let repository = state.repository.clone();
    let addr = spawn_server(state).await;
    let mut client = connect(addr, SESSION_SOCKET_PATH).await;

    assert_eq!(next_text(&mut client).await.as_deref(), Some("ready"));

    client.send(Message::text("start")).await.unwrap();
    let reply: ServerFrame = next_text(&mut client).await.unwrap().parse().unwrap();
    let ServerFrame::Start(session_id) = reply else {
        panic!("expected start ack, got {reply:?}");
    };

    let initial = ChangeRecord::initial("fn main() {}").unwrap();
    client
        .send(Message::text(ClientFrame::Change(initial).encode().unwrap()))
        .await
        .unwrap();
    client
        .send(change_frame(
            480,
            EditOperation::insert(1, 12, " "),
            "fn main() {}",
        ))
        .await
        .unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("change"));
    assert_eq!(next_text(&mut client).await.as_deref(), Some("change"));

    client.send(Message::text("duration 1500")).await.unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("duration"));

    let stored = repository.get_session(session_id).await.unwrap();
    assert_eq!(stored.duration, Some(1500));
    assert_eq!(
        stored.changes.iter().map(|c| c.timestamp).collect::<Vec<_>>(),
        vec![0, 480]
    );
}

#[tokio::test]
async fn test_change_before_start_closes_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(AppState::in_memory(dir.path())).await;
    let mut client = connect(addr, SESSION_SOCKET_PATH).await;
    assert_eq!(next_text(&mut client).await.as_deref(), Some("ready"));

    client
        .send(change_frame(0, EditOperation::insert(1, 1, "x"), ""))
        .await
        .unwrap();

    let reply = next_text(&mut client).await.unwrap();
    assert!(reply.starts_with("error "), "unexpected reply: {reply}");
    assert_eq!(next_text(&mut client).await, None);
}

#[tokio::test]
async fn test_malformed_frame_closes_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(AppState::in_memory(dir.path())).await;
    let mut client = connect(addr, SESSION_SOCKET_PATH).await;
    assert_eq!(next_text(&mut client).await.as_deref(), Some("ready"));

    client.send(Message::text("rewind 10")).await.unwrap();

    let reply = next_text(&mut client).await.unwrap();
    assert!(reply.starts_with("error "), "unexpected reply: {reply}");
    assert_eq!(next_text(&mut client).await, None);
}

#[tokio::test]
async fn test_ping_is_answered_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(AppState::in_memory(dir.path())).await;
    let mut client = connect(addr, SESSION_SOCKET_PATH).await;
    assert_eq!(next_text(&mut client).await.as_deref(), Some("ready"));

    client.send(Message::text("ping")).await.unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("pong"));
}

#[tokio::test]
async fn test_binary_frame_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(AppState::in_memory(dir.path())).await;
    let mut client = connect(addr, SESSION_SOCKET_PATH).await;
    assert_eq!(next_text(&mut client).await.as_deref(), Some("ready"));

    client
        .send(Message::binary(vec![1_u8, 2, 3]))
        .await
        .unwrap();

    let reply = next_text(&mut client).await.unwrap();
    assert!(reply.starts_with("error "), "unexpected reply: {reply}");
}
