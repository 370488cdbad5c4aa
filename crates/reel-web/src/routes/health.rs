//! Health check endpoint: GET /health

/// GET /health - Liveness probe, plain `OK`
pub async fn health_check() -> &'static str {
    "OK"
}
