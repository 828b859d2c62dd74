use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::auth::CurrentUser;
use crate::middleware::rate_limit::rate_limit_error_handler;

/// Keys the limiter on the authenticated user set by `auth_middleware`
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<CurrentUser>()
            .map(|user| user.id)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    UserIdExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Roles with a per-user budget. Admin routes only sit behind the global
/// per-IP limiter.
pub enum RateLimitedRole {
    Passenger,
    Driver,
}

/// - Driver: 500 requests per minute burst
/// - Passenger: 100 requests per minute burst
pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = match role {
        RateLimitedRole::Driver => (120 * 2, 500),
        RateLimitedRole::Passenger => (600 * 2, 100),
    };

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(UserIdExtractor)
            .finish()
            .expect("role rate limit config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}
