use sea_orm_migration::{prelude::*, schema::*};

use super::m20260801_000002_create_companies::Company;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ship::Table)
                    .if_not_exists()
                    .col(uuid(Ship::Id).primary_key())
                    .col(uuid(Ship::CompanyId).not_null())
                    .col(string_len(Ship::Name, 100).not_null())
                    .col(integer(Ship::ConstructionYear).not_null())
                    .col(
                        timestamp_with_time_zone(Ship::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Ship::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ship_company")
                            .from(Ship::Table, Ship::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SeatType::Table)
                    .if_not_exists()
                    .col(uuid(SeatType::Id).primary_key())
                    .col(uuid(SeatType::ShipId).not_null())
                    .col(double(SeatType::AdditionalPrice).not_null().default(0.0))
                    .col(
                        timestamp_with_time_zone(SeatType::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(SeatType::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_type_ship")
                            .from(SeatType::Table, SeatType::ShipId)
                            .to(Ship::Table, Ship::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Seat::Table)
                    .if_not_exists()
                    .col(uuid(Seat::Id).primary_key())
                    .col(uuid(Seat::SeatTypeId).not_null())
                    .col(integer(Seat::Number).not_null())
                    .col(
                        timestamp_with_time_zone(Seat::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Seat::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_seat_type")
                            .from(Seat::Table, Seat::SeatTypeId)
                            .to(SeatType::Table, SeatType::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Seat::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SeatType::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ship::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ship {
    Table,
    Id,
    CompanyId,
    Name,
    ConstructionYear,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SeatType {
    Table,
    Id,
    ShipId,
    AdditionalPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Seat {
    Table,
    Id,
    SeatTypeId,
    Number,
    CreatedAt,
    UpdatedAt,
}
