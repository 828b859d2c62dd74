//! Persistence seam for users, rides and bookings.
//!
//! Seat accounting lives here rather than in the handlers: both backends
//! apply the seat delta and the booking write as one atomic step, so callers
//! never perform a read-then-write on `seats_available`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride::{self, Amenities};
use crate::entities::user;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("requested {requested} seats, {available} available")]
    InsufficientCapacity { requested: i32, available: i32 },

    /// A decision was attempted on a booking that already left `pending`.
    #[error("booking is already {0:?}")]
    NotPending(BookingStatus),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Search criteria for the public ride listing.
#[derive(Debug, Clone, Default)]
pub struct RideFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub min_seats: Option<i32>,
    pub driver_id: Option<Uuid>,
}

impl RideFilter {
    pub fn for_driver(driver_id: Uuid) -> Self {
        Self {
            driver_id: Some(driver_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, ride: &ride::Model) -> bool {
        if let Some(origin) = &self.origin {
            if !ride.origin.eq_ignore_ascii_case(origin) {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !ride.destination.eq_ignore_ascii_case(destination) {
                return false;
            }
        }
        if let Some(date) = self.date {
            if ride.date != date {
                return false;
            }
        }
        if let Some(min_seats) = self.min_seats {
            if ride.seats_available < min_seats {
                return false;
            }
        }
        if let Some(driver_id) = self.driver_id {
            if ride.driver_id != driver_id {
                return false;
            }
        }
        true
    }
}

/// Descriptive ride fields a driver may edit. Seat count is not among them.
#[derive(Debug, Clone, Default)]
pub struct RideChanges {
    pub origin: Option<String>,
    pub origin_detail: Option<String>,
    pub destination: Option<String>,
    pub destination_detail: Option<String>,
    pub date: Option<NaiveDate>,
    pub departure_time: Option<chrono::NaiveTime>,
    pub arrival_time: Option<chrono::NaiveTime>,
    pub price_per_seat: Option<i32>,
    pub car_model: Option<String>,
    pub amenities: Option<Vec<String>>,
}

impl RideChanges {
    pub fn apply(self, ride: &mut ride::Model) {
        if let Some(v) = self.origin {
            ride.origin = v;
        }
        if let Some(v) = self.origin_detail {
            ride.origin_detail = v;
        }
        if let Some(v) = self.destination {
            ride.destination = v;
        }
        if let Some(v) = self.destination_detail {
            ride.destination_detail = v;
        }
        if let Some(v) = self.date {
            ride.date = v;
        }
        if let Some(v) = self.departure_time {
            ride.departure_time = v;
        }
        if let Some(v) = self.arrival_time {
            ride.arrival_time = v;
        }
        if let Some(v) = self.price_per_seat {
            ride.price_per_seat = v;
        }
        if let Some(v) = self.car_model {
            ride.car_model = v;
        }
        if let Some(v) = self.amenities {
            ride.amenities = Amenities(v);
        }
    }
}

/// Which bookings a listing covers.
#[derive(Debug, Clone, Copy)]
pub enum BookingScope {
    All,
    /// Bookings made by this passenger.
    Passenger(Uuid),
    /// Bookings against rides owned by this driver.
    Driver(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub users: u64,
    pub rides: u64,
    pub bookings: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: user::Model) -> StoreResult<user::Model>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<user::Model>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<user::Model>>;
    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<user::Model>;
    async fn list_users(&self) -> StoreResult<Vec<user::Model>>;

    async fn insert_ride(&self, ride: ride::Model) -> StoreResult<ride::Model>;
    async fn find_ride(&self, id: Uuid) -> StoreResult<Option<ride::Model>>;
    /// Newest first.
    async fn list_rides(&self, filter: &RideFilter) -> StoreResult<Vec<ride::Model>>;
    async fn update_ride(&self, id: Uuid, changes: RideChanges) -> StoreResult<ride::Model>;

    /// Reserves `booking.seats_booked` seats on the ride and records the
    /// booking in one atomic step. Nothing is written when the ride is
    /// missing or has too few seats left.
    async fn create_booking(&self, booking: booking::Model) -> StoreResult<booking::Model>;
    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<booking::Model>>;
    /// Newest first.
    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<booking::Model>>;
    /// Moves a `pending` booking to `status`, restoring its seats to the ride
    /// when rejected. Fails with `NotPending` if another decision won.
    async fn decide_booking(&self, id: Uuid, status: BookingStatus) -> StoreResult<booking::Model>;

    async fn stats(&self) -> StoreResult<StoreStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};

    fn ride(origin: &str, destination: &str, seats: i32) -> ride::Model {
        ride::Model {
            id: Uuid::new_v4(),
            origin: origin.to_string(),
            origin_detail: "Central station".to_string(),
            destination: destination.to_string(),
            destination_detail: "Bus stand".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            departure_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            price_per_seat: 450,
            driver_id: Uuid::new_v4(),
            driver_name: "Ravi".to_string(),
            driver_rating: 4.5,
            car_model: "Swift".to_string(),
            seats_available: seats,
            verified: true,
            rating: 0.0,
            amenities: Amenities::default(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn route_match_ignores_case() {
        let r = ride("Chennai", "Bangalore", 3);
        let filter = RideFilter {
            origin: Some("chennai".into()),
            destination: Some("BANGALORE".into()),
            ..Default::default()
        };
        assert!(filter.matches(&r));
    }

    #[test]
    fn seat_minimum_excludes_full_rides() {
        let r = ride("Chennai", "Madurai", 1);
        let filter = RideFilter {
            min_seats: Some(2),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
        assert!(RideFilter::default().matches(&r));
    }

    #[test]
    fn changes_leave_seats_alone() {
        let mut r = ride("Chennai", "Madurai", 4);
        RideChanges {
            price_per_seat: Some(500),
            amenities: Some(vec!["AC".into()]),
            ..Default::default()
        }
        .apply(&mut r);
        assert_eq!(r.price_per_seat, 500);
        assert_eq!(r.amenities, Amenities(vec!["AC".into()]));
        assert_eq!(r.seats_available, 4);
    }
}
