use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookingScope, RideChanges, RideFilter, Store, StoreError, StoreResult, StoreStats};
use crate::entities::booking::{self, BookingStatus};
use crate::entities::{ride, user};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, user::Model>,
    rides: HashMap<Uuid, ride::Model>,
    bookings: HashMap<Uuid, booking::Model>,
}

/// In-process store. A single lock covers all tables, so every seat
/// adjustment and the booking write it belongs to happen together.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> sea_orm::prelude::DateTimeWithTimeZone) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: user::Model) -> StoreResult<user::Model> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<user::Model>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<user::Model>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<user::Model> {
        let mut tables = self.tables.lock().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound("User"))?;
        user.name = name.to_string();
        Ok(user.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<user::Model>> {
        let mut users: Vec<_> = self.tables.lock().await.users.values().cloned().collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn insert_ride(&self, ride: ride::Model) -> StoreResult<ride::Model> {
        self.tables.lock().await.rides.insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn find_ride(&self, id: Uuid) -> StoreResult<Option<ride::Model>> {
        Ok(self.tables.lock().await.rides.get(&id).cloned())
    }

    async fn list_rides(&self, filter: &RideFilter) -> StoreResult<Vec<ride::Model>> {
        let tables = self.tables.lock().await;
        let mut rides: Vec<_> = tables
            .rides
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut rides, |r| r.created_at);
        Ok(rides)
    }

    async fn update_ride(&self, id: Uuid, changes: RideChanges) -> StoreResult<ride::Model> {
        let mut tables = self.tables.lock().await;
        let ride = tables.rides.get_mut(&id).ok_or(StoreError::NotFound("Ride"))?;
        changes.apply(ride);
        Ok(ride.clone())
    }

    async fn create_booking(&self, booking: booking::Model) -> StoreResult<booking::Model> {
        let mut tables = self.tables.lock().await;
        let ride = tables
            .rides
            .get_mut(&booking.ride_id)
            .ok_or(StoreError::NotFound("Ride"))?;

        if ride.seats_available < booking.seats_booked {
            return Err(StoreError::InsufficientCapacity {
                requested: booking.seats_booked,
                available: ride.seats_available,
            });
        }
        ride.seats_available -= booking.seats_booked;

        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<booking::Model>> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<booking::Model>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| match scope {
                BookingScope::All => true,
                BookingScope::Passenger(id) => b.passenger_id == id,
                BookingScope::Driver(id) => tables
                    .rides
                    .get(&b.ride_id)
                    .is_some_and(|r| r.driver_id == id),
            })
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| b.created_at);
        Ok(bookings)
    }

    async fn decide_booking(&self, id: Uuid, status: BookingStatus) -> StoreResult<booking::Model> {
        let mut tables = self.tables.lock().await;
        let Tables { rides, bookings, .. } = &mut *tables;

        let booking = bookings.get_mut(&id).ok_or(StoreError::NotFound("Booking"))?;
        if !booking.status.can_transition_to(status) {
            return Err(StoreError::NotPending(booking.status));
        }

        if status == BookingStatus::Rejected {
            let ride = rides
                .get_mut(&booking.ride_id)
                .ok_or(StoreError::NotFound("Ride"))?;
            ride.seats_available += booking.seats_booked;
        }
        booking.status = status;

        Ok(booking.clone())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let tables = self.tables.lock().await;
        Ok(StoreStats {
            users: tables.users.len() as u64,
            rides: tables.rides.len() as u64,
            bookings: tables.bookings.len() as u64,
        })
    }
}
