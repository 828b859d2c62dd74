use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

use crate::error::AppError;

/// Type alias for the global governor layer (IP-based rate limiting)
pub type GlobalGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Create a GovernorLayer for global rate limiting (per IP address)
/// - 1000 requests per minute (one token every 60ms)
/// - Applied before authentication so anonymous floods never reach the store
pub fn create_global_governor() -> GlobalGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(60) // One token every 60ms (1000 per minute)
            .burst_size(1000)    // Max capacity of the "window"
            .finish()
            .expect("global rate limit config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Render governor rejections with the same JSON shape as every other error.
pub fn rate_limit_error_handler(err: GovernorError) -> Response<Body> {
    match err {
        GovernorError::TooManyRequests { wait_time, .. } => {
            AppError::RateLimited(wait_time).into_response()
        }
        GovernorError::UnableToExtractKey => {
            AppError::Unauthenticated("No authentication found".to_string()).into_response()
        }
        other => {
            AppError::Internal(format!("Rate limiter failure: {:?}", other)).into_response()
        }
    }
}

/// Log each request's outcome with the peer address and latency. Rejections
/// from the limiters show up here as 429s.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let ip = addr.ip();

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!(client_ip = %ip, %method, path = %path, "Rate limited")
        }
        s if s.is_server_error() => {
            tracing::warn!(client_ip = %ip, %method, path = %path, status = s.as_u16(), elapsed_ms, "Request failed")
        }
        s => {
            tracing::debug!(client_ip = %ip, %method, path = %path, status = s.as_u16(), elapsed_ms, "Request completed")
        }
    }

    response
}
