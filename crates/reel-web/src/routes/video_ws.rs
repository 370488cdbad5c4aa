//! Video channel: GET /editor/video/ws
//!
//! The first frame must be the text `start <session id>` naming an existing
//! session. Every following binary frame is appended to that session's
//! media asset.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use reel_core::{ServerFrame, SessionId, parse_media_start};
use tracing::{debug, info, warn};

use crate::media::MediaWriter;
use crate::session::ProtocolError;
use crate::state::AppState;

/// GET /editor/video/ws - Video channel upgrade endpoint
pub async fn video_socket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("Video channel connected");

    let session_id = match open_stream(&mut socket, &state).await {
        Ok(Some(session_id)) => session_id,
        Ok(None) => return,
        Err(e) => {
            reject(&mut socket, &e).await;
            return;
        }
    };

    let writer = match state.media.open_writer(session_id).await {
        Ok(writer) => writer,
        Err(e) => {
            reject(&mut socket, &ProtocolError::Media(e)).await;
            return;
        }
    };

    match receive_chunks(&mut socket, writer).await {
        Ok(bytes) => info!(session_id = %session_id, bytes, "Video stream stored"),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Video stream aborted");
            reject(&mut socket, &e).await;
        }
    }
}

/// Wait for the opening `start <id>` frame.
///
/// Returns `Ok(None)` when the peer leaves before sending anything.
async fn open_stream(
    socket: &mut WebSocket,
    state: &AppState,
) -> Result<Option<SessionId>, ProtocolError> {
    loop {
        let Some(Ok(msg)) = socket.recv().await else {
            return Ok(None);
        };
        match msg {
            Message::Text(text) => {
                let session_id = parse_media_start(text.as_str())?;
                // The session must exist before media is accepted for it.
                state.repository.get_session(session_id).await?;
                return Ok(Some(session_id));
            }
            Message::Binary(_) => return Err(ProtocolError::MissingMediaStart),
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Ok(None),
        }
    }
}

async fn receive_chunks(
    socket: &mut WebSocket,
    mut writer: MediaWriter,
) -> Result<u64, ProtocolError> {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Binary(chunk) => writer.append(&chunk).await?,
            Message::Text(text) => {
                return Err(reel_core::Error::malformed_frame(
                    text.as_str(),
                    "only binary chunks may follow 'start'",
                )
                .into());
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => break,
        }
    }
    Ok(writer.finish().await?)
}

async fn reject(socket: &mut WebSocket, error: &ProtocolError) {
    warn!(error = %error, "Video channel rejected");
    let _ = socket
        .send(Message::Text(ServerFrame::Error(error.to_string()).to_string().into()))
        .await;
    let _ = socket.send(Message::Close(None)).await;
}
