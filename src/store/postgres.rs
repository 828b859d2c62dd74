use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, JoinType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{BookingScope, RideChanges, RideFilter, Store, StoreError, StoreResult, StoreStats};
use crate::entities::booking::{self, BookingStatus};
use crate::entities::{ride, user};

/// sea-orm backed store. Seat adjustments are conditional `UPDATE`s run in
/// the same transaction as the booking write they belong to.
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: user::Model) -> StoreResult<user::Model> {
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(&user.email))
            .one(&self.db)
            .await?;

        if existing.is_some() {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }

        let new_user = user::ActiveModel {
            id: Set(user.id),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            name: Set(user.name),
            role: Set(user.role),
            created_at: Set(user.created_at),
        };

        // A concurrent registration can still win the race to the unique index
        match new_user.insert(&self.db).await {
            Ok(created) => Ok(created),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::Conflict("Email already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<user::Model> {
        let user = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("User"))?;

        let mut active: user::ActiveModel = user.into();
        active.name = Set(name.to_string());
        Ok(active.update(&self.db).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<user::Model>> {
        Ok(user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn insert_ride(&self, ride: ride::Model) -> StoreResult<ride::Model> {
        let new_ride = ride::ActiveModel {
            id: Set(ride.id),
            origin: Set(ride.origin),
            origin_detail: Set(ride.origin_detail),
            destination: Set(ride.destination),
            destination_detail: Set(ride.destination_detail),
            date: Set(ride.date),
            departure_time: Set(ride.departure_time),
            arrival_time: Set(ride.arrival_time),
            price_per_seat: Set(ride.price_per_seat),
            driver_id: Set(ride.driver_id),
            driver_name: Set(ride.driver_name),
            driver_rating: Set(ride.driver_rating),
            car_model: Set(ride.car_model),
            seats_available: Set(ride.seats_available),
            verified: Set(ride.verified),
            rating: Set(ride.rating),
            amenities: Set(ride.amenities),
            created_at: Set(ride.created_at),
        };

        Ok(new_ride.insert(&self.db).await?)
    }

    async fn find_ride(&self, id: Uuid) -> StoreResult<Option<ride::Model>> {
        Ok(ride::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_rides(&self, filter: &RideFilter) -> StoreResult<Vec<ride::Model>> {
        let mut query = ride::Entity::find();

        if let Some(origin) = &filter.origin {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(ride::Column::Origin))).eq(origin.to_lowercase()),
            );
        }
        if let Some(destination) = &filter.destination {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(ride::Column::Destination)))
                    .eq(destination.to_lowercase()),
            );
        }
        if let Some(date) = filter.date {
            query = query.filter(ride::Column::Date.eq(date));
        }
        if let Some(min_seats) = filter.min_seats {
            query = query.filter(ride::Column::SeatsAvailable.gte(min_seats));
        }
        if let Some(driver_id) = filter.driver_id {
            query = query.filter(ride::Column::DriverId.eq(driver_id));
        }

        Ok(query
            .order_by_desc(ride::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn update_ride(&self, id: Uuid, changes: RideChanges) -> StoreResult<ride::Model> {
        let ride = ride::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound("Ride"))?;

        // Only columns marked `Set` are written, so a concurrent seat
        // adjustment is never overwritten by a stale counter.
        let mut active: ride::ActiveModel = ride.into();
        if let Some(v) = changes.origin {
            active.origin = Set(v);
        }
        if let Some(v) = changes.origin_detail {
            active.origin_detail = Set(v);
        }
        if let Some(v) = changes.destination {
            active.destination = Set(v);
        }
        if let Some(v) = changes.destination_detail {
            active.destination_detail = Set(v);
        }
        if let Some(v) = changes.date {
            active.date = Set(v);
        }
        if let Some(v) = changes.departure_time {
            active.departure_time = Set(v);
        }
        if let Some(v) = changes.arrival_time {
            active.arrival_time = Set(v);
        }
        if let Some(v) = changes.price_per_seat {
            active.price_per_seat = Set(v);
        }
        if let Some(v) = changes.car_model {
            active.car_model = Set(v);
        }
        if let Some(v) = changes.amenities {
            active.amenities = Set(ride::Amenities(v));
        }

        Ok(active.update(&self.db).await?)
    }

    async fn create_booking(&self, booking: booking::Model) -> StoreResult<booking::Model> {
        let txn = self.db.begin().await?;

        let reserved = ride::Entity::update_many()
            .col_expr(
                ride::Column::SeatsAvailable,
                Expr::col(ride::Column::SeatsAvailable).sub(booking.seats_booked),
            )
            .filter(ride::Column::Id.eq(booking.ride_id))
            .filter(ride::Column::SeatsAvailable.gte(booking.seats_booked))
            .exec(&txn)
            .await?;

        if reserved.rows_affected == 0 {
            let ride = ride::Entity::find_by_id(booking.ride_id).one(&txn).await?;
            txn.rollback().await?;
            return Err(match ride {
                None => StoreError::NotFound("Ride"),
                Some(r) => StoreError::InsufficientCapacity {
                    requested: booking.seats_booked,
                    available: r.seats_available,
                },
            });
        }

        let new_booking = booking::ActiveModel {
            id: Set(booking.id),
            ride_id: Set(booking.ride_id),
            passenger_id: Set(booking.passenger_id),
            passengers: Set(booking.passengers),
            seats_booked: Set(booking.seats_booked),
            status: Set(booking.status),
            created_at: Set(booking.created_at),
        };
        let created = new_booking.insert(&txn).await?;

        txn.commit().await?;
        Ok(created)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<booking::Model>> {
        Ok(booking::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<booking::Model>> {
        let query = booking::Entity::find().order_by_desc(booking::Column::CreatedAt);

        let query = match scope {
            BookingScope::All => query,
            BookingScope::Passenger(id) => query.filter(booking::Column::PassengerId.eq(id)),
            BookingScope::Driver(id) => query
                .join(JoinType::InnerJoin, booking::Relation::Ride.def())
                .filter(ride::Column::DriverId.eq(id)),
        };

        Ok(query.all(&self.db).await?)
    }

    async fn decide_booking(&self, id: Uuid, status: BookingStatus) -> StoreResult<booking::Model> {
        let txn = self.db.begin().await?;

        let decided = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(status.as_str()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(BookingStatus::Pending))
            .exec(&txn)
            .await?;

        if decided.rows_affected == 0 {
            let current = booking::Entity::find_by_id(id).one(&txn).await?;
            txn.rollback().await?;
            return Err(match current {
                None => StoreError::NotFound("Booking"),
                Some(b) => StoreError::NotPending(b.status),
            });
        }

        let updated = booking::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound("Booking"))?;

        if status == BookingStatus::Rejected {
            let restored = ride::Entity::update_many()
                .col_expr(
                    ride::Column::SeatsAvailable,
                    Expr::col(ride::Column::SeatsAvailable).add(updated.seats_booked),
                )
                .filter(ride::Column::Id.eq(updated.ride_id))
                .exec(&txn)
                .await?;

            if restored.rows_affected == 0 {
                txn.rollback().await?;
                return Err(StoreError::NotFound("Ride"));
            }
        }

        txn.commit().await?;
        Ok(updated)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            users: user::Entity::find().count(&self.db).await?,
            rides: ride::Entity::find().count(&self.db).await?,
            bookings: booking::Entity::find().count(&self.db).await?,
        })
    }
}
