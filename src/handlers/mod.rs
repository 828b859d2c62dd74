pub mod admin;
pub mod bookings;
pub mod driver;
pub mod notifications;
pub mod rides;
pub mod users;

use axum::Json;

/// Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
