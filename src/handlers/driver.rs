use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::BookingStatus;
use crate::error::AppResult;
use crate::handlers::rides::RideResponse;
use crate::middleware::auth::CurrentUser;
use crate::store::{BookingScope, RideFilter};
use crate::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCounts {
    pub pending: i32,
    pub accepted_seats: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRideResponse {
    #[serde(flatten)]
    pub ride: RideResponse,
    pub bookings: BookingCounts,
}

/// List rides published by the logged-in driver, with booking counts
pub async fn my_rides(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<DriverRideResponse>>> {
    let rides = state
        .store
        .list_rides(&RideFilter::for_driver(current.id))
        .await?;

    let mut counts: HashMap<Uuid, BookingCounts> = HashMap::new();
    for b in state.store.list_bookings(BookingScope::Driver(current.id)).await? {
        let entry = counts.entry(b.ride_id).or_default();
        match b.status {
            BookingStatus::Pending => entry.pending += 1,
            BookingStatus::Accepted => entry.accepted_seats += b.seats_booked,
            BookingStatus::Rejected => {}
        }
    }

    let responses = rides
        .into_iter()
        .map(|r| DriverRideResponse {
            bookings: counts.get(&r.id).copied().unwrap_or_default(),
            ride: r.into(),
        })
        .collect();

    Ok(Json(responses))
}
