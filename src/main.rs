//! # Reel
//!
//! Command line entry point.
//!
//! - `reel serve` runs the session store until Ctrl+C
//! - `reel inspect` fetches a session, replays it to a point in time and
//!   prints the document with a per-second change histogram

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use reel_client::{
    HttpSessionSource, PlaybackConfig, PlaybackController, SimulatedVideo, TextBuffer,
};
use reel_core::{ChangeIndex, SessionId};
use reel_web::ServerConfig;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => serve(config.as_deref(), bind).await,
        Commands::Inspect {
            server,
            session,
            at,
        } => inspect(server, session, at).await,
    }
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reel_web=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config_path: Option<&std::path::Path>, bind: Option<String>) -> Result<()> {
    let mut config = ServerConfig::load(config_path).context("loading configuration")?;
    if let Some(bind) = bind {
        config.bind_address = bind;
        config.validate().context("invalid --bind address")?;
    }

    info!(
        bind = %config.bind_address,
        storage = %config.storage,
        media = %config.media_dir.display(),
        "Reel session store starting"
    );

    tokio::select! {
        result = reel_web::run_server(config) => result.context("session store terminated"),
        () = wait_for_shutdown() => {
            info!("Reel session store stopped");
            Ok(())
        }
    }
}

async fn inspect(server: Url, session_id: SessionId, at: Option<u64>) -> Result<()> {
    let source = HttpSessionSource::new(server);
    let mut player = PlaybackController::new(
        TextBuffer::default(),
        SimulatedVideo::new(u64::MAX),
        PlaybackConfig::default(),
    );
    player
        .load(&source, session_id)
        .await
        .with_context(|| format!("loading session {session_id}"))?;

    let duration = player.state().video_duration;
    player.set_time(at.unwrap_or(duration));
    if let Some(problem) = player.state().errors.first() {
        anyhow::bail!("replay failed: {problem}");
    }

    println!(
        "session {session_id} at {}ms of {duration}ms",
        player.state().video_position
    );
    println!("{}", render_histogram(player.index()));
    println!("---");
    println!("{}", player.editor().text());
    Ok(())
}

/// One line per second: `  3s | ##### 5`.
fn render_histogram(index: &ChangeIndex) -> String {
    index
        .buckets()
        .iter()
        .enumerate()
        .map(|(second, bucket)| {
            format!(
                "{second:>4}s | {} {}",
                "#".repeat(bucket.len().min(60)),
                bucket.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            error!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
