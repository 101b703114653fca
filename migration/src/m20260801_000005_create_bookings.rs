use sea_orm_migration::{prelude::*, schema::*};

use super::m20260801_000001_create_users::User;
use super::m20260801_000004_create_network::TripSeat;

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
                    // One live booking per seat; cancelled and expired holds are
                    // deleted, so a plain unique key enforces the invariant.
                    .col(uuid(Booking::TripSeatId).not_null().unique_key())
                    .col(uuid(Booking::UserId).not_null())
                    .col(boolean(Booking::Paid).not_null().default(false))
                    .col(timestamp_with_time_zone(Booking::ExpiresAt).not_null())
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_trip_seat")
                            .from(Booking::Table, Booking::TripSeatId)
                            .to(TripSeat::Table, TripSeat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentMethod::Table)
                    .if_not_exists()
                    .col(uuid(PaymentMethod::Id).primary_key())
                    .col(string_len(PaymentMethod::Name, 100).not_null())
                    .col(string_len(PaymentMethod::Description, 1000).not_null())
                    .col(
                        timestamp_with_time_zone(PaymentMethod::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(PaymentMethod::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid_null(Payment::MethodId))
                    .col(uuid(Payment::BookingId).not_null())
                    .col(double(Payment::Amount).not_null())
                    .col(
                        timestamp_with_time_zone(Payment::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Payment::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_method")
                            .from(Payment::Table, Payment::MethodId)
                            .to(PaymentMethod::Table, PaymentMethod::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_booking")
                            .from(Payment::Table, Payment::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentMethod::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    TripSeatId,
    UserId,
    Paid,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PaymentMethod {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Payment {
    Table,
    Id,
    MethodId,
    BookingId,
    Amount,
    CreatedAt,
    UpdatedAt,
}
