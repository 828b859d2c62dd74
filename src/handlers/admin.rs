use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::handlers::bookings::BookingResponse;
use crate::handlers::rides::RideResponse;
use crate::handlers::users::UserInfo;
use crate::store::{BookingScope, RideFilter, StoreStats};
use crate::AppState;

/// Platform totals
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<StoreStats>> {
    Ok(Json(state.store.stats().await?))
}

/// List all users (admin)
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserInfo>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// List all rides (admin)
pub async fn list_rides(State(state): State<AppState>) -> AppResult<Json<Vec<RideResponse>>> {
    let rides = state.store.list_rides(&RideFilter::default()).await?;
    Ok(Json(rides.into_iter().map(RideResponse::from).collect()))
}

/// List all bookings (admin)
pub async fn list_bookings(State(state): State<AppState>) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = state.store.list_bookings(BookingScope::All).await?;
    let rides = state.store.list_rides(&RideFilter::default()).await?;

    let responses = bookings
        .into_iter()
        .map(|b| {
            let ride = rides.iter().find(|r| r.id == b.ride_id);
            BookingResponse::new(b, ride)
        })
        .collect();

    Ok(Json(responses))
}
