use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::handlers::{self, admin, bookings, driver, notifications, rides, users};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_passenger};
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

/// All API routes. The per-IP limiter needs peer addresses, so it is added
/// by the server binary around this router.
pub fn create_router(state: AppState) -> Router {
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let passenger_governor = create_role_governor(RateLimitedRole::Passenger);

    // Account routes
    let public_user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login));

    let profile_routes = Router::new()
        .route("/profile", get(users::profile).patch(users::update_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Ride search is public; publishing and editing need a driver
    let public_ride_routes = Router::new()
        .route("/", get(rides::list_rides))
        .route("/{id}", get(rides::get_ride));

    let driver_ride_routes = Router::new()
        .route("/", post(rides::create_ride))
        .route("/{id}", put(rides::update_ride))
        .layer(driver_governor.clone())
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let driver_routes = Router::new()
        .route("/rides", get(driver::my_rides))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Only passengers request seats; listing and decisions are scoped in
    // the booking service
    let passenger_booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .layer(passenger_governor)
        .layer(middleware::from_fn(require_passenger))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let booking_routes = Router::new()
        .route("/", get(bookings::list_bookings))
        .route("/{id}/status", patch(bookings::update_booking_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::list_users))
        .route("/rides", get(admin::list_rides))
        .route("/bookings", get(admin::list_bookings))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/notifications/ws", get(notifications::stream))
        .nest("/api/users", public_user_routes.merge(profile_routes))
        .nest("/api/rides", public_ride_routes.merge(driver_ride_routes))
        .nest("/api/driver", driver_routes)
        .nest("/api/bookings", passenger_booking_routes.merge(booking_routes))
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
