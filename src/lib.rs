pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod routes;
pub mod utils;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use ledger::ReservationPolicy;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
}

impl AppState {
    pub fn reservation_policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            hold_minutes: self.config.reservation_hold_minutes,
            sweep_interval_secs: self.config.reservation_sweep_secs,
        }
    }
}
