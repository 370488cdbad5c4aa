//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reel_core::SessionId;
use url::Url;

/// Reel - edit-session recorder and time-travel player
#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(version)]
#[command(about = "Record editing sessions and replay them back and forth in time")]
#[command(
    long_about = "Reel runs the session store that recorders stream edits and video to, and replays stored sessions headlessly for inspection."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the session store
    Serve {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bind address, overriding config and environment
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Replay a stored session headlessly and print the document
    Inspect {
        /// Base URL of the session store
        #[arg(short = 'u', long, default_value = "http://127.0.0.1:3000/")]
        server: Url,

        /// Session id
        #[arg(short, long)]
        session: SessionId,

        /// Replay up to this many milliseconds (default: end of the session)
        #[arg(long)]
        at: Option<u64>,
    },
}
