//! Shared helpers for the HTTP and WebSocket integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use carpool_backend::{routes::create_router, store::MemoryStore, AppState, Config};

pub fn state() -> AppState {
    AppState::new(Arc::new(MemoryStore::new()), Config::for_tests())
}

pub fn app() -> Router {
    create_router(state())
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn register(app: &Router, name: &str, email: &str, role: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "correct-horse",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

pub fn ride_body(seats: i32) -> Value {
    json!({
        "from": "Chennai",
        "fromDetail": "Koyambedu",
        "to": "Bangalore",
        "toDetail": "Majestic",
        "date": "2099-06-01",
        "departureTime": "06:30",
        "arrivalTime": "12:15",
        "pricePerSeat": 650,
        "carModel": "Innova",
        "seatsAvailable": seats,
        "amenities": ["AC"],
    })
}

pub fn passenger(n: usize) -> Value {
    json!({
        "name": format!("Passenger {}", n),
        "aadhaarNumber": "123412341234",
        "phone": "9876543210",
        "email": format!("p{}@example.com", n),
    })
}

pub async fn publish_ride(app: &Router, driver_token: &str, seats: i32) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/rides",
        Some(driver_token),
        Some(ride_body(seats)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

pub async fn book(app: &Router, token: &str, ride_id: &str, seats: usize) -> (StatusCode, Value) {
    let passengers: Vec<Value> = (0..seats).map(passenger).collect();
    call(
        app,
        Method::POST,
        "/api/bookings",
        Some(token),
        Some(json!({
            "rideId": ride_id,
            "seatsBooked": seats,
            "passengers": passengers,
        })),
    )
    .await
}
