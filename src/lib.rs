pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};

use notify::Notifier;
use services::BookingService;
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub notifier: Notifier,
    pub bookings: BookingService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let notifier = Notifier::new(config.notify_channel_capacity);
        let bookings = BookingService::new(store.clone(), notifier.clone());
        Self {
            store,
            config,
            notifier,
            bookings,
        }
    }
}
