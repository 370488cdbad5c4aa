//! Server setup with Tower middleware

use axum::{Router, http::HeaderValue, http::Method};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::Error;
use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Run the server until the listener fails.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, storage cannot be
/// opened, or the address cannot be bound.
pub async fn run_server(config: ServerConfig) -> Result<(), Error> {
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config).await?;
    let app = create_app(&config, state)?;

    let listener = TcpListener::bind(addr).await?;
    info!("Reel session store listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application with middleware.
///
/// Recorded media is served read-only under `/media`.
///
/// # Errors
///
/// Returns an error if the configured CORS origin is not a valid header value.
pub fn create_app(config: &ServerConfig, state: AppState) -> Result<Router, Error> {
    info!("Creating router with CORS origin: {}", config.cors_origin);

    let origin = if config.cors_origin == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(config.cors_origin.parse::<HeaderValue>()?)
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let media = ServeDir::new(state.media.dir());

    let app = routes::create_router()
        .with_state(state)
        .nest_service("/media", media)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        );

    Ok(app)
}
