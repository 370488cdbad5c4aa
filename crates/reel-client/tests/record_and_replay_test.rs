//! Record through a live session store, then replay over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use reel_client::{
    ChangeRecorder, EditorView, HttpSessionSource, PlaybackConfig, PlaybackController,
    RecorderConfig, SimulatedVideo, TextBuffer, WsMediaConnector, WsSessionChannel,
};
use reel_core::EditOperation;
use reel_web::{AppState, ServerConfig, create_app};
use tokio::net::TcpListener;
use url::Url;

async fn spawn_store(state: AppState) -> Url {
    let app = create_app(&ServerConfig::default(), state).expect("router");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{addr}/")).expect("base url")
}

#[tokio::test]
async fn test_recorded_session_replays_and_scrubs() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::in_memory(dir.path());
    let media = state.media.clone();
    let base = spawn_store(state).await;

    // Record: snapshot, two keystrokes and a deletion.
    let channel = WsSessionChannel::connect(&base).await.unwrap();
    let mut recorder = ChangeRecorder::new(channel, RecorderConfig::default())
        .with_media(Box::new(WsMediaConnector::new(&base).unwrap()));
    let mut buffer = TextBuffer::new("fn main");
    let session_id = recorder.start(buffer.text()).await.unwrap();

    for op in [
        EditOperation::insert(1, 8, "()"),
        EditOperation::insert(1, 10, " {}"),
        EditOperation::delete_in_line(1, 1, 4),
    ] {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let event = buffer.edit(op).unwrap();
        recorder.record(&event).await.unwrap();
    }
    recorder.push_media(b"webm".to_vec()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    recorder.stop().await.unwrap();
    assert!(recorder.errors().is_empty(), "{:?}", recorder.errors());
    assert_eq!(buffer.text(), "main() {}");

    // Replay.
    let source = HttpSessionSource::new(base);
    let mut player = PlaybackController::new(
        TextBuffer::default(),
        SimulatedVideo::new(u64::MAX),
        PlaybackConfig::default(),
    );
    player.load(&source, session_id).await.unwrap();
    assert_eq!(player.index().record_count(), 4);

    let end = player.state().video_duration;
    player.set_time(end);
    assert_eq!(player.editor().content(), "main() {}");

    player.set_time(0);
    assert_eq!(player.editor().content(), "");

    // Scrub idempotence from the middle of the session.
    let middle = end / 2;
    player.set_time(middle);
    let before = player.editor().content();
    player.set_time(end);
    player.set_time(middle);
    assert_eq!(player.editor().content(), before);
    assert!(player.state().errors.is_empty(), "{:?}", player.state().errors);

    // The video channel is a separate connection; give it a moment to land.
    let media_path = media.path_for(session_id);
    for _ in 0..100 {
        if tokio::fs::read(&media_path).await.is_ok_and(|bytes| bytes == b"webm") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("video chunk not stored at {}", media_path.display());
}
