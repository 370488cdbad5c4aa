//! Reel client
//!
//! Records an editing session into the session store and plays recorded
//! sessions back:
//!
//! - [`ChangeRecorder`]: captures local edits and streams them over a [`SessionChannel`]
//! - [`PlaybackController`]: moves an [`EditorView`] back and forth in time,
//!   following a paired [`VideoElement`]
//! - [`HttpSessionSource`]: loads recorded sessions from the store's read API

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod channel;
pub mod editor;
pub mod error;
pub mod player;
pub mod recorder;
pub mod source;
pub mod video;

pub use channel::{
    MediaChannel, MediaConnector, SessionChannel, WsMediaChannel, WsMediaConnector,
    WsSessionChannel, socket_url,
};
pub use editor::{EditEvent, EditorView, TextBuffer};
pub use error::{ClientError, Result};
pub use player::{PlaybackConfig, PlaybackController, PlaybackState};
pub use recorder::{ChangeRecorder, RecorderConfig, RecorderState};
pub use source::{HttpSessionSource, InMemorySessionSource, SessionSource};
pub use video::{SimulatedVideo, VideoElement};
