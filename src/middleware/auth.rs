use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, TokenKind};
use crate::AppState;

/// Extract and validate the JWT access token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret, TokenKind::Access)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Authenticated-or-read-only: safe methods pass through untouched, mutating
/// methods require a valid access token.
pub async fn write_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    if request.method().is_safe() {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let claims = verify_token(token, &state.config.jwt_secret, TokenKind::Access)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
