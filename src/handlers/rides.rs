use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::entities::ride::{self, Amenities};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::store::{RideChanges, RideFilter};
use crate::utils::validation::{require_non_empty, MAX_RIDE_SEATS};
use crate::AppState;

const TIME_FORMAT: &str = "%H:%M";

/// Accepts `HH:MM` as sent by the booking UI, or `HH:MM:SS`.
fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("invalid time '{}', expected HH:MM", value))
}

fn de_time<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    parse_time(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|raw| parse_time(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideResponse {
    pub id: Uuid,
    pub from: String,
    pub from_detail: String,
    pub to: String,
    pub to_detail: String,
    pub date: NaiveDate,
    pub departure_time: String,
    pub arrival_time: String,
    pub price_per_seat: i32,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub driver_rating: f64,
    pub car_model: String,
    pub seats_available: i32,
    pub verified: bool,
    pub rating: f64,
    pub amenities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ride::Model> for RideResponse {
    fn from(r: ride::Model) -> Self {
        Self {
            id: r.id,
            from: r.origin,
            from_detail: r.origin_detail,
            to: r.destination,
            to_detail: r.destination_detail,
            date: r.date,
            departure_time: r.departure_time.format(TIME_FORMAT).to_string(),
            arrival_time: r.arrival_time.format(TIME_FORMAT).to_string(),
            price_per_seat: r.price_per_seat,
            driver_id: r.driver_id,
            driver_name: r.driver_name,
            driver_rating: r.driver_rating,
            car_model: r.car_model,
            seats_available: r.seats_available,
            verified: r.verified,
            rating: r.rating,
            amenities: r.amenities.0,
            created_at: r.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RideQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<NaiveDate>,
    pub seats: Option<i32>,
}

impl From<RideQuery> for RideFilter {
    fn from(q: RideQuery) -> Self {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            origin: non_empty(q.from),
            destination: non_empty(q.to),
            date: q.date,
            min_seats: q.seats,
            driver_id: None,
        }
    }
}

/// Search published rides, newest first
pub async fn list_rides(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<RideQuery>, AppError>,
) -> AppResult<Json<Vec<RideResponse>>> {
    let rides = state.store.list_rides(&query.into()).await?;
    Ok(Json(rides.into_iter().map(RideResponse::from).collect()))
}

/// Get ride details
pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<RideResponse>> {
    let ride = state
        .store
        .find_ride(ride_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    Ok(Json(ride.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    pub from: String,
    pub from_detail: String,
    pub to: String,
    pub to_detail: String,
    pub date: NaiveDate,
    #[serde(deserialize_with = "de_time")]
    pub departure_time: NaiveTime,
    #[serde(deserialize_with = "de_time")]
    pub arrival_time: NaiveTime,
    pub price_per_seat: i32,
    pub car_model: String,
    pub seats_available: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl CreateRideRequest {
    fn validate(&self, today: NaiveDate) -> AppResult<()> {
        require_non_empty("from", &self.from)?;
        require_non_empty("fromDetail", &self.from_detail)?;
        require_non_empty("to", &self.to)?;
        require_non_empty("toDetail", &self.to_detail)?;
        require_non_empty("carModel", &self.car_model)?;

        if self.from.trim().eq_ignore_ascii_case(self.to.trim()) {
            return Err(AppError::Validation(
                "Origin and destination must be different".to_string(),
            ));
        }
        if self.date < today {
            return Err(AppError::Validation("Ride date cannot be in the past".to_string()));
        }
        if !(1..=MAX_RIDE_SEATS).contains(&self.seats_available) {
            return Err(AppError::Validation(format!(
                "seatsAvailable must be between 1 and {}",
                MAX_RIDE_SEATS
            )));
        }
        if self.price_per_seat < 0 {
            return Err(AppError::Validation("pricePerSeat cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// Publish a ride. Driver identity comes from the token, never the body.
pub async fn create_ride(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateRideRequest>, AppError>,
) -> AppResult<(StatusCode, Json<RideResponse>)> {
    payload.validate(Utc::now().date_naive())?;

    let ride = ride::Model {
        id: Uuid::new_v4(),
        origin: payload.from.trim().to_string(),
        origin_detail: payload.from_detail.trim().to_string(),
        destination: payload.to.trim().to_string(),
        destination_detail: payload.to_detail.trim().to_string(),
        date: payload.date,
        departure_time: payload.departure_time,
        arrival_time: payload.arrival_time,
        price_per_seat: payload.price_per_seat,
        driver_id: current.id,
        driver_name: current.name.clone(),
        driver_rating: 0.0,
        car_model: payload.car_model.trim().to_string(),
        seats_available: payload.seats_available,
        verified: true,
        rating: 0.0,
        amenities: Amenities(payload.amenities),
        created_at: Utc::now().into(),
    };

    let ride = state.store.insert_ride(ride).await?;
    tracing::info!(ride_id = %ride.id, driver_id = %current.id, seats = ride.seats_available, "Ride published");

    Ok((StatusCode::CREATED, Json(ride.into())))
}

/// Seat count is absent: it only moves through bookings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRideRequest {
    pub from: Option<String>,
    pub from_detail: Option<String>,
    pub to: Option<String>,
    pub to_detail: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_time")]
    pub departure_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "de_opt_time")]
    pub arrival_time: Option<NaiveTime>,
    pub price_per_seat: Option<i32>,
    pub car_model: Option<String>,
    pub amenities: Option<Vec<String>>,
}

impl UpdateRideRequest {
    fn into_changes(self, today: NaiveDate) -> AppResult<RideChanges> {
        let text = |field: &str, v: Option<String>| -> AppResult<Option<String>> {
            match v {
                Some(s) => {
                    require_non_empty(field, &s)?;
                    Ok(Some(s.trim().to_string()))
                }
                None => Ok(None),
            }
        };

        if self.date.is_some_and(|d| d < today) {
            return Err(AppError::Validation("Ride date cannot be in the past".to_string()));
        }
        if self.price_per_seat.is_some_and(|p| p < 0) {
            return Err(AppError::Validation("pricePerSeat cannot be negative".to_string()));
        }

        Ok(RideChanges {
            origin: text("from", self.from)?,
            origin_detail: text("fromDetail", self.from_detail)?,
            destination: text("to", self.to)?,
            destination_detail: text("toDetail", self.to_detail)?,
            date: self.date,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price_per_seat: self.price_per_seat,
            car_model: text("carModel", self.car_model)?,
            amenities: self.amenities,
        })
    }
}

/// Edit a ride's descriptive fields (owning driver only)
pub async fn update_ride(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(ride_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateRideRequest>, AppError>,
) -> AppResult<Json<RideResponse>> {
    let ride = state
        .store
        .find_ride(ride_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    if ride.driver_id != current.id {
        return Err(AppError::Forbidden(
            "Not authorized to update this ride".to_string(),
        ));
    }

    let changes = payload.into_changes(Utc::now().date_naive())?;
    let from = changes.origin.as_deref().unwrap_or(&ride.origin);
    let to = changes.destination.as_deref().unwrap_or(&ride.destination);
    if from.eq_ignore_ascii_case(to) {
        return Err(AppError::Validation(
            "Origin and destination must be different".to_string(),
        ));
    }

    let updated = state.store.update_ride(ride.id, changes).await?;
    tracing::info!(ride_id = %updated.id, driver_id = %current.id, "Ride updated");

    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateRideRequest {
        serde_json::from_value(serde_json::json!({
            "from": "Chennai",
            "fromDetail": "Koyambedu",
            "to": "Bangalore",
            "toDetail": "Majestic",
            "date": "2030-06-01",
            "departureTime": "06:30",
            "arrivalTime": "12:15",
            "pricePerSeat": 650,
            "carModel": "Innova",
            "seatsAvailable": 4,
        }))
        .expect("valid request")
    }

    #[test]
    fn accepts_short_times() {
        let req = request();
        assert_eq!(req.departure_time, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert!(req.amenities.is_empty());
        assert!(req.validate(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()).is_ok());
    }

    #[test]
    fn rejects_bad_capacity_and_route() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

        let mut req = request();
        req.seats_available = 0;
        assert!(req.validate(today).is_err());

        let mut req = request();
        req.to = "chennai".into();
        assert!(req.validate(today).is_err());

        let req = request();
        assert!(req.validate(NaiveDate::from_ymd_opt(2031, 1, 1).unwrap()).is_err());
    }

    #[test]
    fn seat_count_is_not_editable() {
        let result: Result<UpdateRideRequest, _> =
            serde_json::from_value(serde_json::json!({ "seatsAvailable": 10 }));
        assert!(result.is_err());
    }

    #[test]
    fn blank_update_fields_are_rejected() {
        let req = UpdateRideRequest {
            car_model: Some("  ".into()),
            ..Default::default()
        };
        assert!(req.into_changes(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()).is_err());
    }

    #[test]
    fn edits_cannot_move_a_ride_into_the_past() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();

        let req = UpdateRideRequest {
            date: NaiveDate::from_ymd_opt(2030, 1, 9),
            ..Default::default()
        };
        assert!(matches!(req.into_changes(today), Err(AppError::Validation(_))));

        let req = UpdateRideRequest {
            date: Some(today),
            ..Default::default()
        };
        assert_eq!(req.into_changes(today).unwrap().date, Some(today));
    }
}
