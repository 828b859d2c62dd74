//! Best-effort relay of booking events to connected drivers and passengers.
//!
//! Each user listens on one topic (`driver-{id}` or `passenger-{id}`) backed
//! by a `tokio::sync::broadcast` channel. Publishing never fails the caller:
//! events for topics nobody listens to are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::entities::booking::BookingStatus;
use crate::entities::ride;
use crate::entities::user::UserRole;

pub fn driver_topic(driver_id: Uuid) -> String {
    format!("driver-{}", driver_id)
}

pub fn passenger_topic(passenger_id: Uuid) -> String {
    format!("passenger-{}", passenger_id)
}

/// Topic a user's session subscribes to, if their role receives events.
pub fn topic_for(user_id: Uuid, role: UserRole) -> Option<String> {
    match role {
        UserRole::Driver => Some(driver_topic(user_id)),
        UserRole::Passenger => Some(passenger_topic(user_id)),
        UserRole::Admin => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSummary {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
    pub departure_time: NaiveTime,
}

impl From<&ride::Model> for RideSummary {
    fn from(ride: &ride::Model) -> Self {
        Self {
            from: ride.origin.clone(),
            to: ride.destination.clone(),
            date: ride.date,
            departure_time: ride.departure_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    NewBooking {
        booking_id: Uuid,
        ride: RideSummary,
        passenger: PassengerContact,
        seats_booked: i32,
        status: BookingStatus,
    },
    #[serde(rename_all = "camelCase")]
    BookingStatusUpdated {
        booking_id: Uuid,
        status: BookingStatus,
        ride: RideSummary,
    },
}

type Channels = Arc<RwLock<HashMap<String, broadcast::Sender<Notification>>>>;

#[derive(Clone)]
pub struct Notifier {
    channels: Channels,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver to current subscribers of `topic`. Returns how many received it.
    pub async fn publish(&self, topic: &str, event: Notification) -> usize {
        let delivered = {
            let channels = self.channels.read().await;
            match channels.get(topic) {
                Some(sender) => sender.send(event).unwrap_or(0),
                None => 0,
            }
        };

        if delivered == 0 {
            tracing::debug!(topic, "No subscriber for notification, dropped");
            self.prune(topic).await;
        }
        delivered
    }

    /// Fire-and-forget publish on a separate task, used after a mutation has
    /// been committed.
    pub fn dispatch(&self, topic: String, event: Notification) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.publish(&topic, event).await;
        });
    }

    /// Release a subscription and drop the topic once nobody else listens.
    pub async fn unsubscribe(&self, topic: &str, rx: broadcast::Receiver<Notification>) {
        drop(rx);
        self.prune(topic).await;
    }

    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }

    async fn prune(&self, topic: &str) {
        let mut channels = self.channels.write().await;
        if channels
            .get(topic)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(topic);
        }
    }
}
