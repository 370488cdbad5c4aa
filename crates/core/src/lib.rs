//! Reel core
//!
//! Edit operations and their inverses, the per-second change index, and the
//! session channel protocol shared by the recorder, the session store and
//! the player.
//!
//! # Architecture
//!
//! - [`operation`]: line/column edit operations (coordinate convention documented there)
//! - [`invert`]: computes the undo of a single captured edit
//! - [`index`]: dense per-second bucket index and half-open range queries
//! - [`record`]: change records, sessions, session ids
//! - [`document`]: headless text buffer applying edit operations
//! - [`protocol`]: session and video channel frames

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod document;
pub mod error;
pub mod index;
pub mod invert;
pub mod operation;
pub mod protocol;
pub mod record;
pub mod result;

pub use document::Document;
pub use error::Error;
pub use index::{
    BUCKET_MS, ChangeIndex, MAX_TIMELINE_MS, check_timeline, index_changes, query_range,
};
pub use invert::{invert, invert_changes};
pub use operation::{EditOperation, TextRange};
pub use protocol::{ClientFrame, ServerFrame, media_start, parse_media_start};
pub use record::{ChangeRecord, Session, SessionId};
pub use result::Result;
