//! Change recorder.
//!
//! Captures local edits as change records and streams them to the session
//! store. States move `Idle -> Started -> Recording -> Stopped`.
//!
//! Sends are fire-and-forget: `change` acknowledgments are not awaited and
//! only the transport's in-order delivery is relied on. The `start` and
//! `duration` acknowledgments are awaited with a bounded timeout.

use std::fmt;
use std::time::Duration;

use reel_core::{ChangeRecord, ClientFrame, ServerFrame, SessionId};
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::channel::{MediaChannel, MediaConnector, SessionChannel};
use crate::editor::EditEvent;
use crate::error::{ClientError, Result};

/// Recorder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Bound on the `start`, `duration` and `pong` waits.
    pub ack_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    /// Session allocated; the initial snapshot is not sent yet.
    Started,
    Recording,
    Stopped,
}

impl RecorderState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgment a wait is looking for.
#[derive(Debug, Clone, Copy)]
enum Ack {
    Start,
    Duration,
    Pong,
}

impl Ack {
    const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Duration => "duration",
            Self::Pong => "pong",
        }
    }

    const fn matches(self, frame: &ServerFrame) -> bool {
        matches!(
            (self, frame),
            (Self::Start, ServerFrame::Start(_))
                | (Self::Duration, ServerFrame::Duration)
                | (Self::Pong, ServerFrame::Pong)
        )
    }
}

/// Streams one editing session to the session store.
pub struct ChangeRecorder<C: SessionChannel> {
    config: RecorderConfig,
    channel: Option<C>,
    media_connector: Option<Box<dyn MediaConnector>>,
    media: Option<Box<dyn MediaChannel>>,
    state: RecorderState,
    session_id: Option<SessionId>,
    started_at: Option<Instant>,
    errors: Vec<String>,
}

impl<C: SessionChannel> ChangeRecorder<C> {
    pub fn new(channel: C, config: RecorderConfig) -> Self {
        Self {
            config,
            channel: Some(channel),
            media_connector: None,
            media: None,
            state: RecorderState::Idle,
            session_id: None,
            started_at: None,
            errors: Vec::new(),
        }
    }

    /// Stream video alongside the session, opened once the session id is known.
    #[must_use]
    pub fn with_media(mut self, connector: Box<dyn MediaConnector>) -> Self {
        self.media_connector = Some(connector);
        self
    }

    pub const fn state(&self) -> RecorderState {
        self.state
    }

    pub const fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Failures seen so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Open a session and send the initial snapshot of the document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AckTimeout`] if the server does not answer in
    /// time. The recorder is then stopped; retry with a new connection.
    pub async fn start(&mut self, initial_content: &str) -> Result<SessionId> {
        let result = self.start_inner(initial_content).await;
        if result.is_err() && self.state != RecorderState::Recording {
            self.shutdown().await;
        }
        self.track(result)
    }

    async fn start_inner(&mut self, initial_content: &str) -> Result<SessionId> {
        self.require(RecorderState::Idle, "start")?;

        self.send(&ClientFrame::Start).await?;
        let ServerFrame::Start(session_id) = self.await_ack(Ack::Start).await? else {
            return Err(ClientError::Rejected("start acknowledged without an id".to_string()));
        };
        self.session_id = Some(session_id);
        self.started_at = Some(Instant::now());
        self.state = RecorderState::Started;
        info!(session_id = %session_id, "Recording started");

        self.open_media(session_id).await;

        let initial = ChangeRecord::initial(initial_content)?;
        self.send(&ClientFrame::Change(initial)).await?;
        self.state = RecorderState::Recording;
        Ok(session_id)
    }

    /// A missing video stream does not stop the edit recording.
    async fn open_media(&mut self, session_id: SessionId) {
        let Some(connector) = self.media_connector.as_ref() else {
            return;
        };
        let opened = match connector.connect().await {
            Ok(mut media) => media.start(session_id).await.map(|()| media),
            Err(e) => Err(e),
        };
        match opened {
            Ok(media) => self.media = Some(media),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Video channel unavailable");
                self.errors.push(e.to_string());
            }
        }
    }

    /// Capture one local edit.
    ///
    /// Returns `Ok(None)` for programmatic edits, which are never recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder is not recording, the edit cannot be
    /// inverted, or the send fails.
    pub async fn record(&mut self, event: &EditEvent) -> Result<Option<ChangeRecord>> {
        if event.programmatic {
            debug!("Skipping programmatic edit");
            return Ok(None);
        }
        let result = self.record_inner(event).await;
        self.track(result).map(Some)
    }

    async fn record_inner(&mut self, event: &EditEvent) -> Result<ChangeRecord> {
        self.require(RecorderState::Recording, "record")?;
        let timestamp = self.elapsed_ms();
        let record =
            ChangeRecord::capture(timestamp, event.operation.clone(), &event.prior_content)?;
        self.send(&ClientFrame::Change(record.clone())).await?;
        debug!(timestamp, "Change sent");
        Ok(record)
    }

    /// Forward an opaque video chunk. A no-op without a video channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder is not recording or the send fails.
    pub async fn push_media(&mut self, chunk: Vec<u8>) -> Result<()> {
        let result = match self.require(RecorderState::Recording, "push media") {
            Ok(()) => match self.media.as_mut() {
                Some(media) => media.send_chunk(chunk).await,
                None => Ok(()),
            },
            Err(e) => Err(e),
        };
        self.track(result)
    }

    /// Seal the session with its duration and release the channels.
    ///
    /// Returns the recorded duration in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder is not recording or the `duration`
    /// acknowledgment does not arrive in time.
    pub async fn stop(&mut self) -> Result<u64> {
        let result = self.stop_inner().await;
        if self.state == RecorderState::Recording && result.is_err() {
            self.shutdown().await;
        }
        self.track(result)
    }

    async fn stop_inner(&mut self) -> Result<u64> {
        self.require(RecorderState::Recording, "stop")?;
        let duration = self.elapsed_ms();
        self.send(&ClientFrame::Duration(duration)).await?;
        self.await_ack(Ack::Duration).await?;
        info!(session_id = ?self.session_id, duration, "Recording stopped");
        self.shutdown().await;
        Ok(duration)
    }

    /// Close both channels from any state.
    pub async fn cancel(&mut self) {
        if self.state != RecorderState::Stopped {
            info!(session_id = ?self.session_id, state = %self.state, "Recording cancelled");
        }
        self.shutdown().await;
    }

    /// Round-trip a `ping` through the session channel.
    ///
    /// # Errors
    ///
    /// Returns an error if no `pong` arrives in time.
    pub async fn ping(&mut self) -> Result<()> {
        let result = match self.send(&ClientFrame::Ping).await {
            Ok(()) => self.await_ack(Ack::Pong).await.map(|_| ()),
            Err(e) => Err(e),
        };
        self.track(result)
    }

    fn require(&self, expected: RecorderState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                operation,
                state: self.state.as_str(),
            })
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at.map_or(0, |started| {
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
        })
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(ClientError::ChannelClosed)?;
        channel.send(frame).await
    }

    /// Wait for `ack`, bounded by the configured timeout.
    async fn await_ack(&mut self, ack: Ack) -> Result<ServerFrame> {
        let bound = self.config.ack_timeout;
        let channel = self.channel.as_mut().ok_or(ClientError::ChannelClosed)?;

        timeout(bound, Self::next_ack(channel, ack))
            .await
            .map_err(|_| ClientError::AckTimeout {
                expected: ack.name(),
                timeout: bound,
            })?
    }

    /// Read until `ack`, skipping greetings and stray acknowledgments.
    async fn next_ack(channel: &mut C, ack: Ack) -> Result<ServerFrame> {
        loop {
            match channel.recv().await? {
                Some(frame) if ack.matches(&frame) => return Ok(frame),
                Some(ServerFrame::Error(message)) => return Err(ClientError::Rejected(message)),
                Some(ServerFrame::Ping) => channel.send(&ClientFrame::Pong).await?,
                Some(frame) => {
                    debug!(frame = %frame, waiting_for = ack.name(), "Skipping frame");
                }
                None => return Err(ClientError::ChannelClosed),
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut media) = self.media.take() {
            if let Err(e) = media.close().await {
                debug!(error = %e, "Video channel close failed");
            }
        }
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!(error = %e, "Session channel close failed");
            }
        }
        self.state = RecorderState::Stopped;
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(session_id = ?self.session_id, error = %e, "Recorder error");
            self.errors.push(e.to_string());
        }
        result
    }
}
