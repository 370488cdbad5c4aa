//! Session and media channels.
//!
//! The recorder talks to the session store through [`SessionChannel`] and
//! streams video through [`MediaChannel`]. Frames are parsed once, here, at
//! the channel boundary.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reel_core::{ClientFrame, ServerFrame, SessionId, media_start};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, Result};

/// Path of the session channel on the session store.
pub const SESSION_SOCKET_PATH: &str = "editor/ws";

/// Path of the video channel on the session store.
pub const VIDEO_SOCKET_PATH: &str = "editor/video/ws";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Text-frame channel to the session store.
#[async_trait]
pub trait SessionChannel: Send {
    /// Send one frame. Frames leave in call order.
    async fn send(&mut self, frame: &ClientFrame) -> Result<()>;

    /// Next frame from the server, or `None` once the channel is closed.
    async fn recv(&mut self) -> Result<Option<ServerFrame>>;

    async fn close(&mut self) -> Result<()>;
}

/// Opaque byte stream keyed by a session id.
#[async_trait]
pub trait MediaChannel: Send {
    /// Bind the stream to `session_id`. Must precede any chunk.
    async fn start(&mut self, session_id: SessionId) -> Result<()>;

    async fn send_chunk(&mut self, chunk: Vec<u8>) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens media channels on demand, once the session id is known.
#[async_trait]
pub trait MediaConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn MediaChannel>>;
}

/// Resolve a socket endpoint relative to the store's HTTP base URL.
///
/// `http` maps to `ws` and `https` to `wss`.
///
/// # Errors
///
/// Returns an error if the base is not an HTTP(S) URL.
pub fn socket_url(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.join(path)?;
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::Channel(format!(
                "unsupported scheme '{other}' in {base}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ClientError::Channel(format!("cannot use scheme '{scheme}' for {base}")))?;
    Ok(url)
}

/// [`SessionChannel`] over a WebSocket.
pub struct WsSessionChannel {
    socket: Socket,
}

impl WsSessionChannel {
    /// Connect to the session channel of the store at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the handshake fails.
    pub async fn connect(base: &Url) -> Result<Self> {
        let url = socket_url(base, SESSION_SOCKET_PATH)?;
        let (socket, _) = connect_async(url.as_str()).await?;
        debug!(url = %url, "Session channel connected");
        Ok(Self { socket })
    }
}

#[async_trait]
impl SessionChannel for WsSessionChannel {
    async fn send(&mut self, frame: &ClientFrame) -> Result<()> {
        let text = frame.encode()?;
        trace!(frame = %text, "Sending frame");
        self.socket.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ServerFrame>> {
        while let Some(msg) = self.socket.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(text.as_str().parse()?)),
                Message::Binary(_) => {
                    return Err(ClientError::Channel(
                        "unexpected binary frame on the session channel".to_string(),
                    ));
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

/// [`MediaChannel`] over a WebSocket.
pub struct WsMediaChannel {
    socket: Socket,
}

#[async_trait]
impl MediaChannel for WsMediaChannel {
    async fn start(&mut self, session_id: SessionId) -> Result<()> {
        self.socket.send(Message::text(media_start(session_id))).await?;
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.socket.send(Message::binary(chunk)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

/// Connects [`WsMediaChannel`]s to the video channel of the store at a base URL.
#[derive(Debug, Clone)]
pub struct WsMediaConnector {
    url: Url,
}

impl WsMediaConnector {
    /// # Errors
    ///
    /// Returns an error if the base is not an HTTP(S) URL.
    pub fn new(base: &Url) -> Result<Self> {
        Ok(Self {
            url: socket_url(base, VIDEO_SOCKET_PATH)?,
        })
    }
}

#[async_trait]
impl MediaConnector for WsMediaConnector {
    async fn connect(&self) -> Result<Box<dyn MediaChannel>> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, "Video channel connected");
        Ok(Box::new(WsMediaChannel { socket }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_maps_scheme() {
        let base = Url::parse("http://127.0.0.1:3000").unwrap();
        assert_eq!(
            socket_url(&base, SESSION_SOCKET_PATH).unwrap().as_str(),
            "ws://127.0.0.1:3000/editor/ws"
        );

        let base = Url::parse("https://reel.example.com/").unwrap();
        assert_eq!(
            socket_url(&base, VIDEO_SOCKET_PATH).unwrap().as_str(),
            "wss://reel.example.com/editor/video/ws"
        );
    }

    #[test]
    fn test_socket_url_rejects_other_schemes() {
        let base = Url::parse("ftp://example.com").unwrap();
        assert!(matches!(
            socket_url(&base, SESSION_SOCKET_PATH),
            Err(ClientError::Channel(_))
        ));
    }
}
