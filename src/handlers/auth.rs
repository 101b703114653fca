use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::utils::jwt::{create_access_token, create_token_pair, verify_token, TokenKind};
use crate::utils::validate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Register a new user account. The confirmation password is checked and
/// discarded, never stored.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let mut errors = FieldErrors::new();
    if payload.username.trim().is_empty() {
        errors.add("username", "Username is required.");
    }
    if payload.email.trim().is_empty() {
        errors.add("email", "Email is required.");
    }
    if let Err(msg) = validate::passwords_match(&payload.password, &payload.password2) {
        errors.add("password", msg);
    }

    if errors.is_empty() {
        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(&payload.username))
            .one(&state.db)
            .await?;
        if taken.is_some() {
            errors.add("username", "A user with that username already exists.");
        }

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(&payload.email))
            .one(&state.db)
            .await?;
        if taken.is_some() {
            errors.add("email", "A user with that email already exists.");
        }
    }
    errors.into_result()?;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(payload.username.clone()),
        email: Set(payload.email.clone()),
        password_hash: Set(password_hash),
        ..Default::default()
    };
    new_user.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User registered successfully" })),
    ))
}

/// Login with username and password, returning an access/refresh token pair
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let account = user::Entity::find()
        .filter(user::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    let parsed_hash = PasswordHash::new(&account.password_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid username or password".to_string()))?;

    let pair = create_token_pair(account.id, &account.username, &state.config)?;

    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: UserInfo {
            id: account.id,
            username: account.username,
            email: account.email,
        },
    }))
}

/// Exchange a refresh token for a fresh access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let claims = verify_token(&payload.refresh, &state.config.jwt_secret, TokenKind::Refresh)?;

    // The account may have been deleted since the refresh token was issued
    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    let access = create_access_token(account.id, &account.username, &state.config)?;
    Ok(Json(RefreshResponse { access }))
}
