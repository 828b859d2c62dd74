//! Booking workflow: seat reservation on creation and the driver's
//! accept/reject decision.
//!
//! Seat policy: seats are taken when a booking is created and handed back
//! when it is rejected. Acceptance leaves the counter alone. Every seat
//! change is applied by the store together with the booking write, and
//! notifications go out only after that write has committed.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PassengerDetail, PassengerList};
use crate::entities::ride;
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::notify::{driver_topic, passenger_topic, Notification, Notifier, PassengerContact, RideSummary};
use crate::store::{BookingScope, Store};
use crate::utils::validation::validate_passengers;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub ride_id: Uuid,
    pub seats_booked: i32,
    pub passengers: Vec<PassengerDetail>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    notifier: Notifier,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Reserve seats on a ride for the calling passenger.
    pub async fn create(&self, caller: &CurrentUser, request: NewBooking) -> AppResult<booking::Model> {
        validate_passengers(request.seats_booked, &request.passengers)?;

        let ride = self
            .store
            .find_ride(request.ride_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

        if ride.driver_id == caller.id {
            return Err(AppError::Forbidden("Drivers cannot book their own rides".to_string()));
        }

        let booking = booking::Model {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            passenger_id: caller.id,
            passengers: PassengerList(request.passengers),
            seats_booked: request.seats_booked,
            status: BookingStatus::Pending,
            created_at: Utc::now().into(),
        };

        let booking = self.store.create_booking(booking).await?;
        tracing::info!(
            booking_id = %booking.id,
            ride_id = %ride.id,
            seats = booking.seats_booked,
            "Booking created"
        );

        self.notifier.dispatch(
            driver_topic(ride.driver_id),
            Notification::NewBooking {
                booking_id: booking.id,
                ride: RideSummary::from(&ride),
                passenger: PassengerContact {
                    name: caller.name.clone(),
                    email: caller.email.clone(),
                    phone: booking.passengers.0.first().map(|p| p.phone.clone()),
                },
                seats_booked: booking.seats_booked,
                status: booking.status,
            },
        );

        Ok(booking)
    }

    /// Apply the ride owner's decision to a pending booking.
    pub async fn decide(
        &self,
        caller: &CurrentUser,
        booking_id: Uuid,
        target: &str,
    ) -> AppResult<booking::Model> {
        let target = BookingStatus::parse_decision(target).ok_or_else(|| {
            AppError::InvalidState(format!(
                "Invalid status '{}', expected 'accepted' or 'rejected'",
                target
            ))
        })?;

        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let ride = self
            .store
            .find_ride(booking.ride_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

        if ride.driver_id != caller.id {
            return Err(AppError::Forbidden(
                "Not authorized to update this booking".to_string(),
            ));
        }

        if !booking.status.can_transition_to(target) {
            return Err(AppError::InvalidState(format!(
                "Booking is already {}",
                booking.status.as_str()
            )));
        }

        // The store re-checks `pending` atomically; a concurrent decision
        // surfaces here as InvalidState.
        let updated = self.store.decide_booking(booking.id, target).await?;
        tracing::info!(
            booking_id = %updated.id,
            ride_id = %ride.id,
            status = updated.status.as_str(),
            seats_restored = if target == BookingStatus::Rejected { updated.seats_booked } else { 0 },
            "Booking decided"
        );

        self.notifier.dispatch(
            passenger_topic(updated.passenger_id),
            Notification::BookingStatusUpdated {
                booking_id: updated.id,
                status: updated.status,
                ride: RideSummary::from(&ride),
            },
        );

        Ok(updated)
    }

    /// Passengers see their own bookings, drivers see bookings on their
    /// rides, admins see everything. Each booking comes with its ride.
    pub async fn list_for(
        &self,
        caller: &CurrentUser,
    ) -> AppResult<Vec<(booking::Model, Option<ride::Model>)>> {
        let scope = match caller.role {
            UserRole::Passenger => BookingScope::Passenger(caller.id),
            UserRole::Driver => BookingScope::Driver(caller.id),
            UserRole::Admin => BookingScope::All,
        };

        let bookings = self.store.list_bookings(scope).await?;
        let mut result = Vec::with_capacity(bookings.len());
        for b in bookings {
            let ride = self.store.find_ride(b.ride_id).await?;
            result.push((b, ride));
        }
        Ok(result)
    }
}
