use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::RideId).not_null())
                    .col(uuid(Booking::PassengerId).not_null())
                    .col(json(Booking::Passengers).not_null())
                    .col(
                        integer(Booking::SeatsBooked)
                            .not_null()
                            .check(Expr::col(Booking::SeatsBooked).gt(0)),
                    )
                    // pending | accepted | rejected
                    .col(string_len(Booking::Status, 16).not_null().default("pending"))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_ride")
                            .from(Booking::Table, Booking::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_passenger")
                            .from(Booking::Table, Booking::PassengerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_ride")
                    .table(Booking::Table)
                    .col(Booking::RideId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    RideId,
    PassengerId,
    Passengers,
    SeatsBooked,
    Status,
    CreatedAt,
}
