//! Session channel: GET /editor/ws
//!
//! Text frames only. The server greets with `ready`, then answers each
//! client frame through [`handle_frame`]. A protocol violation is reported
//! as `error <message>` and the connection is closed.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use reel_core::{ClientFrame, ServerFrame};
use tracing::{debug, info, warn};

use crate::repository::SessionRepository;
use crate::session::{ProtocolError, SessionHandle, handle_frame};
use crate::state::AppState;

type Sender = SplitSink<WebSocket, Message>;

/// What the connection loop does after one message.
enum Flow {
    Reply(ServerFrame),
    Continue,
    Close,
}

/// GET /editor/ws - Session channel upgrade endpoint
pub async fn session_socket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("Session channel connected");
    let (mut sender, mut receiver) = socket.split();
    let mut handle = SessionHandle::new();

    if send_frame(&mut sender, &ServerFrame::Ready).await.is_err() {
        return;
    }

    while let Some(msg) = receiver.next().await {
        match process_message(msg, &mut handle, state.repository.as_ref()).await {
            Ok(Flow::Reply(frame)) => {
                if let Err(e) = send_frame(&mut sender, &frame).await {
                    warn!("Failed to send frame: {}", e);
                    break;
                }
            }
            Ok(Flow::Continue) => {}
            Ok(Flow::Close) => break,
            Err(e) => {
                warn!(session_id = ?handle.session_id(), error = %e, "Protocol violation");
                // Best effort; the peer may already be gone.
                let _ = send_frame(&mut sender, &ServerFrame::Error(e.to_string())).await;
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!(session_id = ?handle.session_id(), "Session channel closed");
}

async fn process_message(
    msg: Result<Message, axum::Error>,
    handle: &mut SessionHandle,
    repository: &dyn SessionRepository,
) -> Result<Flow, ProtocolError> {
    let msg = match msg {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Session channel transport error: {}", e);
            return Ok(Flow::Close);
        }
    };

    match msg {
        Message::Text(text) => {
            debug!("Received frame: {}", text.as_str());
            let frame: ClientFrame = text.as_str().parse()?;
            Ok(handle_frame(handle, frame, repository)
                .await?
                .map_or(Flow::Continue, Flow::Reply))
        }
        Message::Binary(_) => Err(ProtocolError::UnexpectedBinary),
        // Transport-level keepalives are answered by axum.
        Message::Ping(_) | Message::Pong(_) => Ok(Flow::Continue),
        Message::Close(_) => Ok(Flow::Close),
    }
}

async fn send_frame(sender: &mut Sender, frame: &ServerFrame) -> Result<(), axum::Error> {
    sender.send(Message::Text(frame.to_string().into())).await
}
