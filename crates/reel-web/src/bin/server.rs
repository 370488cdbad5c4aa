//! Reel Session Store Binary
//!
//! Standalone server for the session and video channels and the session read
//! API. An optional first argument names a TOML config file; `REEL_*`
//! environment variables override it.

use std::path::PathBuf;

use anyhow::Context;
use reel_web::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reel_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref()).context("loading configuration")?;

    tracing::info!("Starting Reel session store");
    tracing::info!("Session channel: ws://{}/editor/ws", config.bind_address);
    tracing::info!("Read API: http://{}/api/editor/sessions", config.bind_address);

    reel_web::run_server(config)
        .await
        .context("session store terminated")?;

    Ok(())
}
