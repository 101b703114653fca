use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
    Select, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{booking, payment, payment_method, route, seat, trip, trip_seat, user};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::ledger;
use crate::utils::jwt::Claims;
use crate::utils::validate;
use crate::AppState;

// ============ Bookings ============

#[derive(Debug, Default, Deserialize)]
pub struct BookingListParams {
    #[serde(rename = "tripSeat")]
    pub trip_seat: Option<Uuid>,
    #[serde(rename = "tripSeat_id")]
    pub trip_seat_id: Option<Uuid>,
    pub user: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub user_username: Option<String>,
    pub user_email: Option<String>,
    pub paid: Option<bool>,
    pub trip_id: Option<Uuid>,
    pub seat_number: Option<i32>,
    pub company: Option<Uuid>,
    pub origin: Option<String>,
    pub destiny: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn filtered_bookings(params: &BookingListParams) -> Select<booking::Entity> {
    let mut query = booking::Entity::find();

    let needs_route =
        params.company.is_some() || params.origin.is_some() || params.destiny.is_some();
    let needs_trip_seat = params.trip_id.is_some() || params.seat_number.is_some() || needs_route;

    if needs_trip_seat {
        query = query.join(JoinType::InnerJoin, booking::Relation::TripSeat.def());
    }
    if needs_route {
        query = query
            .join(JoinType::InnerJoin, trip_seat::Relation::Trip.def())
            .join(JoinType::InnerJoin, trip::Relation::Route.def());
    }
    if params.seat_number.is_some() {
        query = query.join(JoinType::InnerJoin, trip_seat::Relation::Seat.def());
    }
    if params.user_username.is_some() || params.user_email.is_some() {
        query = query.join(JoinType::InnerJoin, booking::Relation::User.def());
    }

    if let Some(id) = params.trip_seat.or(params.trip_seat_id) {
        query = query.filter(booking::Column::TripSeatId.eq(id));
    }
    if let Some(id) = params.user.or(params.user_id) {
        query = query.filter(booking::Column::UserId.eq(id));
    }
    if let Some(v) = &params.user_username {
        query = query.filter(user::Column::Username.contains(v));
    }
    if let Some(v) = &params.user_email {
        query = query.filter(user::Column::Email.contains(v));
    }
    if let Some(paid) = params.paid {
        query = query.filter(booking::Column::Paid.eq(paid));
    }
    if let Some(id) = params.trip_id {
        query = query.filter(trip_seat::Column::TripId.eq(id));
    }
    if let Some(number) = params.seat_number {
        query = query.filter(seat::Column::Number.eq(number));
    }
    if let Some(id) = params.company {
        query = query.filter(route::Column::CompanyId.eq(id));
    }
    if let Some(v) = &params.origin {
        query = query.filter(route::Column::Origin.contains(v));
    }
    if let Some(v) = &params.destiny {
        query = query.filter(route::Column::Destiny.contains(v));
    }
    if let Some(t) = params.created_after {
        query = query.filter(booking::Column::CreatedAt.gte(t));
    }
    if let Some(t) = params.created_before {
        query = query.filter(booking::Column::CreatedAt.lte(t));
    }

    query
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<BookingListParams>,
) -> AppResult<Json<Vec<booking::Model>>> {
    Ok(Json(filtered_bookings(&params).all(&state.db).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<booking::Model>> {
    let found = booking::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(rename = "tripSeat_id")]
    pub trip_seat_id: Uuid,
}

/// Claim an available seat for the authenticated user. Races on the same seat
/// leave exactly one winner; the rest get a conflict.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<booking::Model>> {
    let created = ledger::reserve(
        &state.db,
        &state.reservation_policy(),
        payload.trip_seat_id,
        claims.sub,
    )
    .await?;
    Ok(Json(created))
}

/// Cancel an unpaid booking; the seat goes back on sale
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    ledger::cancel(&state.db, id, claims.sub).await?;
    Ok(Json(serde_json::json!({ "message": "Booking cancelled" })))
}

// ============ Payment methods ============

#[derive(Debug, Default, Deserialize)]
pub struct PaymentMethodListParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn filtered_payment_methods(
    params: &PaymentMethodListParams,
) -> Select<payment_method::Entity> {
    let mut query = payment_method::Entity::find();

    if let Some(v) = &params.name {
        query = query.filter(payment_method::Column::Name.contains(v));
    }
    if let Some(v) = &params.description {
        query = query.filter(payment_method::Column::Description.contains(v));
    }
    if let Some(t) = params.created_after {
        query = query.filter(payment_method::Column::CreatedAt.gte(t));
    }
    if let Some(t) = params.created_before {
        query = query.filter(payment_method::Column::CreatedAt.lte(t));
    }

    query
}

pub async fn list_payment_methods(
    State(state): State<AppState>,
    Query(params): Query<PaymentMethodListParams>,
) -> AppResult<Json<Vec<payment_method::Model>>> {
    Ok(Json(filtered_payment_methods(&params).all(&state.db).await?))
}

pub async fn get_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<payment_method::Model>> {
    let found = payment_method::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment method not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentMethodRequest {
    pub name: String,
    pub description: String,
}

pub async fn create_payment_method(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentMethodRequest>,
) -> AppResult<Json<payment_method::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::max_length(&payload.name, 100, "Name") {
        errors.add("name", msg);
    }
    if let Err(msg) = validate::max_length(&payload.description, 1000, "Description") {
        errors.add("description", msg);
    }
    errors.into_result()?;

    let created = payment_method::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentMethodRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentMethodRequest>,
) -> AppResult<Json<payment_method::Model>> {
    let found = payment_method::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment method not found".to_string()))?;

    let mut errors = FieldErrors::new();
    if let Some(name) = &payload.name {
        if let Err(msg) = validate::max_length(name, 100, "Name") {
            errors.add("name", msg);
        }
    }
    if let Some(description) = &payload.description {
        if let Err(msg) = validate::max_length(description, 1000, "Description") {
            errors.add("description", msg);
        }
    }
    errors.into_result()?;

    let mut active: payment_method::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = payment_method::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Payment method not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Payment method deleted" })))
}

// ============ Payments ============

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListParams {
    pub method: Option<Uuid>,
    pub method_id: Option<Uuid>,
    pub method_name: Option<String>,
    pub booking: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub user: Option<Uuid>,
    pub user_username: Option<String>,
    pub trip_id: Option<Uuid>,
    pub company: Option<Uuid>,
    pub has_method: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn filtered_payments(params: &PaymentListParams) -> Select<payment::Entity> {
    let mut query = payment::Entity::find();

    if params.method_name.is_some() {
        query = query.join(JoinType::InnerJoin, payment::Relation::Method.def());
    }
    let needs_booking =
        params.user.is_some() || params.user_username.is_some() || params.trip_id.is_some()
            || params.company.is_some();
    if needs_booking {
        query = query.join(JoinType::InnerJoin, payment::Relation::Booking.def());
    }
    if params.user_username.is_some() {
        query = query.join(JoinType::InnerJoin, booking::Relation::User.def());
    }
    if params.trip_id.is_some() || params.company.is_some() {
        query = query.join(JoinType::InnerJoin, booking::Relation::TripSeat.def());
    }
    if params.company.is_some() {
        query = query
            .join(JoinType::InnerJoin, trip_seat::Relation::Trip.def())
            .join(JoinType::InnerJoin, trip::Relation::Route.def());
    }

    if let Some(id) = params.method.or(params.method_id) {
        query = query.filter(payment::Column::MethodId.eq(id));
    }
    if let Some(v) = &params.method_name {
        query = query.filter(payment_method::Column::Name.contains(v));
    }
    if let Some(id) = params.booking.or(params.booking_id) {
        query = query.filter(payment::Column::BookingId.eq(id));
    }
    if let Some(id) = params.user {
        query = query.filter(booking::Column::UserId.eq(id));
    }
    if let Some(v) = &params.user_username {
        query = query.filter(user::Column::Username.contains(v));
    }
    if let Some(id) = params.trip_id {
        query = query.filter(trip_seat::Column::TripId.eq(id));
    }
    if let Some(id) = params.company {
        query = query.filter(route::Column::CompanyId.eq(id));
    }
    if let Some(flag) = params.has_method {
        query = if flag {
            query.filter(payment::Column::MethodId.is_not_null())
        } else {
            query.filter(payment::Column::MethodId.is_null())
        };
    }
    if let Some(t) = params.created_after {
        query = query.filter(payment::Column::CreatedAt.gte(t));
    }
    if let Some(t) = params.created_before {
        query = query.filter(payment::Column::CreatedAt.lte(t));
    }

    query
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
) -> AppResult<Json<Vec<payment::Model>>> {
    Ok(Json(filtered_payments(&params).all(&state.db).await?))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<payment::Model>> {
    let found = payment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub booking_id: Uuid,
    pub method_id: Option<Uuid>,
    pub amount: f64,
}

/// Settle a booking. Replays return the stored payment instead of charging
/// twice.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<payment::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::non_negative_price(payload.amount, "Amount") {
        errors.add("amount", msg);
    }
    errors.into_result()?;

    let settled = ledger::confirm_payment(
        &state.db,
        payload.booking_id,
        payload.method_id,
        payload.amount,
    )
    .await?;
    Ok(Json(settled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_booking_origin_filter_joins_to_route() {
        let params = BookingListParams {
            origin: Some("Palma".to_string()),
            ..Default::default()
        };

        let sql = filtered_bookings(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("INNER JOIN \"trip_seat\""));
        assert!(sql.contains("INNER JOIN \"trip\""));
        assert!(sql.contains("INNER JOIN \"route\""));
        assert!(sql.contains("LIKE '%Palma%'"));
    }

    #[test]
    fn test_paid_filter_needs_no_join() {
        let params = BookingListParams {
            paid: Some(true),
            ..Default::default()
        };

        let sql = filtered_bookings(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"paid\" = TRUE"));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn test_has_method_false_matches_detached_payments() {
        let params = PaymentListParams {
            has_method: Some(false),
            ..Default::default()
        };

        let sql = filtered_payments(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"method_id\" IS NULL"));
    }
}
