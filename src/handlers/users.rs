use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::utils::jwt::create_token;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::validation::{require_non_empty, validate_email, validate_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserInfo {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

fn issue(state: &AppState, user: user::Model) -> AppResult<AuthResponse> {
    let token = create_token(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// Register a passenger or driver account
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    require_non_empty("name", &payload.name)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    if payload.role == UserRole::Admin {
        return Err(AppError::Validation(
            "Role must be 'passenger' or 'driver'".to_string(),
        ));
    }

    let new_user = user::Model {
        id: Uuid::new_v4(),
        email: payload.email.trim().to_lowercase(),
        password_hash: hash_password(&payload.password)?,
        name: payload.name.trim().to_string(),
        role: payload.role,
        created_at: Utc::now().into(),
    };

    let user = state.store.insert_user(new_user).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok((StatusCode::CREATED, Json(issue(&state, user)?)))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let user = state
        .store
        .find_user_by_email(&payload.email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    Ok(Json(issue(&state, user)?))
}

/// The caller's own account
pub async fn profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<UserInfo>> {
    let user = state
        .store
        .find_user(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Change the caller's display name. Role cannot be changed.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> AppResult<Json<UserInfo>> {
    require_non_empty("name", &payload.name)?;
    let user = state
        .store
        .rename_user(current.id, payload.name.trim())
        .await?;

    Ok(Json(user.into()))
}
