use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260801_000002_create_companies::Company;
use super::m20260801_000003_create_fleet::Seat;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Route::Table)
                    .if_not_exists()
                    .col(uuid(Route::Id).primary_key())
                    .col(uuid(Route::CompanyId).not_null())
                    .col(string_len(Route::Origin, 100).not_null())
                    .col(string_len(Route::Destiny, 100).not_null())
                    .col(
                        timestamp_with_time_zone(Route::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Route::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_company")
                            .from(Route::Table, Route::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(uuid(Trip::Id).primary_key())
                    .col(uuid(Trip::RouteId).not_null())
                    .col(uuid(Trip::SeatId).not_null())
                    .col(double(Trip::BasePrice).not_null().default(0.0))
                    .col(timestamp_with_time_zone(Trip::DateDeparture).not_null())
                    .col(
                        timestamp_with_time_zone(Trip::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Trip::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_route")
                            .from(Trip::Table, Trip::RouteId)
                            .to(Route::Table, Route::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_seat")
                            .from(Trip::Table, Trip::SeatId)
                            .to(Seat::Table, Seat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Seat availability enum, the authoritative state of one bookable unit
        manager
            .create_type(
                Type::create()
                    .as_enum(SeatState::Enum)
                    .values([SeatState::Disponible, SeatState::Reservado, SeatState::Ocupado])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TripSeat::Table)
                    .if_not_exists()
                    .col(uuid(TripSeat::Id).primary_key())
                    .col(uuid(TripSeat::TripId).not_null())
                    .col(uuid(TripSeat::SeatId).not_null())
                    .col(
                        ColumnDef::new(TripSeat::State)
                            .custom(SeatState::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(TripSeat::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(TripSeat::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_seat_trip")
                            .from(TripSeat::Table, TripSeat::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_seat_seat")
                            .from(TripSeat::Table, TripSeat::SeatId)
                            .to(Seat::Table, Seat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_trip_seat_trip_seat")
                    .table(TripSeat::Table)
                    .col(TripSeat::TripId)
                    .col(TripSeat::SeatId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TripSeat::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(SeatState::Enum).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Route::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Route {
    Table,
    Id,
    CompanyId,
    Origin,
    Destiny,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Trip {
    Table,
    Id,
    RouteId,
    SeatId,
    BasePrice,
    DateDeparture,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum TripSeat {
    Table,
    Id,
    TripId,
    SeatId,
    State,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SeatState {
    #[sea_orm(iden = "seat_state")]
    Enum,
    #[sea_orm(iden = "disponible")]
    Disponible,
    #[sea_orm(iden = "reservado")]
    Reservado,
    #[sea_orm(iden = "ocupado")]
    Ocupado,
}
