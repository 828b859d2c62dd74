use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PassengerDetail};
use crate::entities::ride;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::notify::RideSummary;
use crate::services::NewBooking;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub ride_id: Uuid,
    pub seats_booked: i32,
    pub passengers: Vec<PassengerDetail>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub passengers: Vec<PassengerDetail>,
    pub seats_booked: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride: Option<RideSummary>,
}

impl BookingResponse {
    pub fn new(b: booking::Model, ride: Option<&ride::Model>) -> Self {
        Self {
            id: b.id,
            ride_id: b.ride_id,
            passenger_id: b.passenger_id,
            passengers: b.passengers.0,
            seats_booked: b.seats_booked,
            status: b.status,
            created_at: b.created_at.with_timezone(&Utc),
            ride: ride.map(RideSummary::from),
        }
    }
}

/// Request seats on a ride. The booking starts out pending.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateBookingRequest>, AppError>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let request = NewBooking {
        ride_id: payload.ride_id,
        seats_booked: payload.seats_booked,
        passengers: payload.passengers,
    };

    let booking = state.bookings.create(&current, request).await?;
    let ride = state.store.find_ride(booking.ride_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::new(booking, ride.as_ref())),
    ))
}

/// Bookings visible to the caller
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = state.bookings.list_for(&current).await?;

    Ok(Json(
        bookings
            .into_iter()
            .map(|(b, ride)| BookingResponse::new(b, ride.as_ref()))
            .collect(),
    ))
}

/// Accept or reject a pending booking (owning driver only)
pub async fn update_booking_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(booking_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateStatusRequest>, AppError>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .bookings
        .decide(&current, booking_id, &payload.status)
        .await?;
    let ride = state.store.find_ride(booking.ride_id).await?;

    Ok(Json(BookingResponse::new(booking, ride.as_ref())))
}
