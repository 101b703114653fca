use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub server_host: String,
    pub server_port: u16,
    pub reservation_hold_minutes: i64,
    pub reservation_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            access_token_minutes: env::var("ACCESS_TOKEN_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("ACCESS_TOKEN_MINUTES must be a number"),
            refresh_token_days: env::var("REFRESH_TOKEN_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .expect("REFRESH_TOKEN_DAYS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            reservation_hold_minutes: env::var("RESERVATION_HOLD_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("RESERVATION_HOLD_MINUTES must be a number"),
            reservation_sweep_secs: env::var("RESERVATION_SWEEP_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("RESERVATION_SWEEP_SECS must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
