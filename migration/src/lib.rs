pub use sea_orm_migration::prelude::*;

mod m20260801_000001_create_users;
mod m20260801_000002_create_companies;
mod m20260801_000003_create_fleet;
mod m20260801_000004_create_network;
mod m20260801_000005_create_bookings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_users::Migration),
            Box::new(m20260801_000002_create_companies::Migration),
            Box::new(m20260801_000003_create_fleet::Migration),
            Box::new(m20260801_000004_create_network::Migration),
            Box::new(m20260801_000005_create_bookings::Migration),
        ]
    }
}
