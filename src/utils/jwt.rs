use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user id
    pub username: String,
    pub kind: TokenKind,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn create_token(
    user_id: Uuid,
    username: &str,
    kind: TokenKind,
    secret: &str,
    lifetime: Duration,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        kind,
        exp: (now + lifetime).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn create_access_token(user_id: Uuid, username: &str, config: &Config) -> AppResult<String> {
    create_token(
        user_id,
        username,
        TokenKind::Access,
        &config.jwt_secret,
        Duration::minutes(config.access_token_minutes),
    )
}

pub fn create_token_pair(user_id: Uuid, username: &str, config: &Config) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access: create_access_token(user_id, username, config)?,
        refresh: create_token(
            user_id,
            username,
            TokenKind::Refresh,
            &config.jwt_secret,
            Duration::days(config.refresh_token_days),
        )?,
    })
}

pub fn verify_token(token: &str, secret: &str, expected: TokenKind) -> AppResult<Claims> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if claims.kind != expected {
        return Err(AppError::Unauthorized("Wrong token type".to_string()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            reservation_hold_minutes: 15,
            reservation_sweep_secs: 60,
        }
    }

    #[test]
    fn test_pair_roundtrip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let pair = create_token_pair(user_id, "alice", &config).unwrap();

        let access = verify_token(&pair.access, &config.jwt_secret, TokenKind::Access).unwrap();
        assert_eq!(access.sub, user_id);
        assert_eq!(access.username, "alice");

        let refresh = verify_token(&pair.refresh, &config.jwt_secret, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.sub, user_id);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let config = test_config();
        let pair = create_token_pair(Uuid::new_v4(), "bob", &config).unwrap();

        let err = verify_token(&pair.refresh, &config.jwt_secret, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = test_config();
        let pair = create_token_pair(Uuid::new_v4(), "carol", &config).unwrap();

        assert!(verify_token(&pair.access, "other-secret", TokenKind::Access).is_err());
    }
}
