use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::verify_token;
use crate::AppState;

/// Identity resolved from a verified bearer token and the user record it
/// points to. Role checks read `role` from here, never from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<user::Model> for CurrentUser {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// The token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify a token and load the user it belongs to.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<CurrentUser> {
    let claims = verify_token(token, &state.config.jwt_secret)?;
    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Account no longer exists".to_string()))?;
    Ok(user.into())
}

/// Extract and validate the bearer token, then attach the caller's identity
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthenticated("No token, authorization denied".to_string()))?
        .to_string();

    let current = authenticate(&state, &token).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

fn require_role(request: &Request, role: UserRole, message: &str) -> AppResult<()> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthenticated("No authentication found".to_string()))?;

    if current.role != role {
        return Err(AppError::Forbidden(message.to_string()));
    }
    Ok(())
}

/// Require admin role
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    require_role(&request, UserRole::Admin, "Admin privileges required")?;
    Ok(next.run(request).await)
}

/// Require driver role
pub async fn require_driver(request: Request, next: Next) -> AppResult<Response> {
    require_role(&request, UserRole::Driver, "Only drivers can do this")?;
    Ok(next.run(request).await)
}

/// Require passenger role
pub async fn require_passenger(request: Request, next: Next) -> AppResult<Response> {
    require_role(&request, UserRole::Passenger, "Only passengers can do this")?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
