use sea_orm_migration::{prelude::*, schema::*};

use super::m20260801_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(uuid(Company::Id).primary_key())
                    .col(string_len(Company::Name, 100).not_null())
                    .col(string_len_null(Company::Email, 255))
                    .col(string_len(Company::Address, 100).not_null())
                    .col(string_len(Company::PhoneNumber, 15).not_null())
                    .col(string_null(Company::Logo))
                    .col(string_len(Company::Description, 1000).not_null())
                    .col(
                        timestamp_with_time_zone(Company::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Company::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rol::Table)
                    .if_not_exists()
                    .col(uuid(Rol::Id).primary_key())
                    .col(string_len(Rol::Name, 100).not_null())
                    .col(
                        timestamp_with_time_zone(Rol::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Rol::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserCompany::Table)
                    .if_not_exists()
                    .col(uuid(UserCompany::Id).primary_key())
                    .col(uuid(UserCompany::CompanyId).not_null())
                    .col(uuid(UserCompany::UserId).not_null())
                    .col(uuid_null(UserCompany::RolId))
                    .col(
                        timestamp_with_time_zone(UserCompany::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(UserCompany::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_company_company")
                            .from(UserCompany::Table, UserCompany::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_company_user")
                            .from(UserCompany::Table, UserCompany::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_company_rol")
                            .from(UserCompany::Table, UserCompany::RolId)
                            .to(Rol::Table, Rol::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(uuid(Notification::Id).primary_key())
                    .col(uuid(Notification::UserId).not_null())
                    .col(string_len(Notification::Topic, 100).not_null())
                    .col(string_len(Notification::Body, 1000).not_null())
                    .col(
                        timestamp_with_time_zone(Notification::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Notification::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_user")
                            .from(Notification::Table, Notification::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserCompany::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rol::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Company::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Company {
    Table,
    Id,
    Name,
    Email,
    Address,
    PhoneNumber,
    Logo,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Rol {
    Table,
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum UserCompany {
    Table,
    Id,
    CompanyId,
    UserId,
    RolId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Notification {
    Table,
    Id,
    UserId,
    Topic,
    Body,
    CreatedAt,
    UpdatedAt,
}
