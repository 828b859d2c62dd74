use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(uuid(Ride::Id).primary_key())
                    .col(string_len(Ride::Origin, 100).not_null())
                    .col(string_len(Ride::OriginDetail, 255).not_null())
                    .col(string_len(Ride::Destination, 100).not_null())
                    .col(string_len(Ride::DestinationDetail, 255).not_null())
                    .col(date(Ride::Date).not_null())
                    .col(time(Ride::DepartureTime).not_null())
                    .col(time(Ride::ArrivalTime).not_null())
                    .col(integer(Ride::PricePerSeat).not_null())
                    .col(uuid(Ride::DriverId).not_null())
                    .col(string_len(Ride::DriverName, 100).not_null())
                    .col(double(Ride::DriverRating).not_null().default(0.0))
                    .col(string_len(Ride::CarModel, 100).not_null())
                    .col(
                        integer(Ride::SeatsAvailable)
                            .not_null()
                            .check(Expr::col(Ride::SeatsAvailable).gte(0)),
                    )
                    .col(boolean(Ride::Verified).not_null().default(true))
                    .col(double(Ride::Rating).not_null().default(0.0))
                    .col(json(Ride::Amenities).not_null())
                    .col(
                        timestamp_with_time_zone(Ride::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_driver")
                            .from(Ride::Table, Ride::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_route_date")
                    .table(Ride::Table)
                    .col(Ride::Origin)
                    .col(Ride::Destination)
                    .col(Ride::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    Id,
    Origin,
    OriginDetail,
    Destination,
    DestinationDetail,
    Date,
    DepartureTime,
    ArrivalTime,
    PricePerSeat,
    DriverId,
    DriverName,
    DriverRating,
    CarModel,
    SeatsAvailable,
    Verified,
    Rating,
    Amenities,
    CreatedAt,
}
