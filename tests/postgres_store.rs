//! Runs against a real Postgres when TEST_DATABASE_URL is set:
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use carpool_backend::db;
use carpool_backend::entities::booking::{self, BookingStatus, PassengerDetail, PassengerList};
use carpool_backend::entities::ride::{self, Amenities};
use carpool_backend::entities::user::{self, UserRole};
use carpool_backend::store::{BookingScope, PgStore, Store, StoreError};

async fn store() -> Option<PgStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let conn = db::connect(&url).await.expect("connect to test database");
    migration::Migrator::up(&conn, None)
        .await
        .expect("run migrations");
    Some(PgStore::new(conn))
}

fn person(role: UserRole) -> user::Model {
    let id = Uuid::new_v4();
    user::Model {
        id,
        email: format!("{}@example.com", id),
        password_hash: "not-a-real-hash".to_string(),
        name: "Test".to_string(),
        role,
        created_at: Utc::now().into(),
    }
}

fn ride_for(driver: &user::Model, seats: i32) -> ride::Model {
    ride::Model {
        id: Uuid::new_v4(),
        origin: "Chennai".to_string(),
        origin_detail: "Koyambedu".to_string(),
        destination: "Madurai".to_string(),
        destination_detail: "Mattuthavani".to_string(),
        date: NaiveDate::from_ymd_opt(2099, 3, 1).unwrap(),
        departure_time: NaiveTime::from_hms_opt(5, 45, 0).unwrap(),
        arrival_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        price_per_seat: 400,
        driver_id: driver.id,
        driver_name: driver.name.clone(),
        driver_rating: 0.0,
        car_model: "Swift".to_string(),
        seats_available: seats,
        verified: true,
        rating: 0.0,
        amenities: Amenities(vec![]),
        created_at: Utc::now().into(),
    }
}

fn booking_for(ride_id: Uuid, passenger_id: Uuid, seats: i32) -> booking::Model {
    let passengers = (0..seats)
        .map(|i| PassengerDetail {
            name: format!("P{}", i),
            aadhaar_number: "123412341234".to_string(),
            phone: "9876543210".to_string(),
            email: "p@example.com".to_string(),
        })
        .collect();

    booking::Model {
        id: Uuid::new_v4(),
        ride_id,
        passenger_id,
        passengers: PassengerList(passengers),
        seats_booked: seats,
        status: BookingStatus::Pending,
        created_at: Utc::now().into(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_reservations_respect_capacity() {
    let Some(store) = store().await else {
        return;
    };
    let store = Arc::new(store);

    let driver = store.insert_user(person(UserRole::Driver)).await.unwrap();
    let passenger = store.insert_user(person(UserRole::Passenger)).await.unwrap();
    let ride = store.insert_ride(ride_for(&driver, 5)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..12 {
        let store = store.clone();
        let (ride_id, passenger_id) = (ride.id, passenger.id);
        handles.push(tokio::spawn(async move {
            store.create_booking(booking_for(ride_id, passenger_id, 1)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(StoreError::InsufficientCapacity { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, 5);
    let ride = store.find_ride(ride.id).await.unwrap().unwrap();
    assert_eq!(ride.seats_available, 0);
}

#[tokio::test]
#[ignore]
async fn rejection_restores_seats_once() {
    let Some(store) = store().await else {
        return;
    };

    let driver = store.insert_user(person(UserRole::Driver)).await.unwrap();
    let passenger = store.insert_user(person(UserRole::Passenger)).await.unwrap();
    let ride = store.insert_ride(ride_for(&driver, 3)).await.unwrap();

    let booking = store
        .create_booking(booking_for(ride.id, passenger.id, 2))
        .await
        .unwrap();
    assert_eq!(store.find_ride(ride.id).await.unwrap().unwrap().seats_available, 1);

    let rejected = store
        .decide_booking(booking.id, BookingStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);
    assert_eq!(store.find_ride(ride.id).await.unwrap().unwrap().seats_available, 3);

    let again = store.decide_booking(booking.id, BookingStatus::Rejected).await;
    assert!(matches!(again, Err(StoreError::NotPending(BookingStatus::Rejected))));
    assert_eq!(store.find_ride(ride.id).await.unwrap().unwrap().seats_available, 3);

    let for_driver = store.list_bookings(BookingScope::Driver(driver.id)).await.unwrap();
    assert_eq!(for_driver.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn racing_registrations_with_one_email_conflict() {
    let Some(store) = store().await else {
        return;
    };
    let store = Arc::new(store);
    let email = format!("{}@example.com", Uuid::new_v4());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let mut user = person(UserRole::Passenger);
        user.email = email.clone();
        handles.push(tokio::spawn(async move { store.insert_user(user).await }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::Conflict(_)) => {}
            Err(e) => panic!("duplicate email surfaced as {}", e),
        }
    }
    assert_eq!(created, 1);
}
