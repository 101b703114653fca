use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, QueryFilter, QuerySelect,
    RelationTrait, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::trip_seat::SeatState;
use crate::entities::{company, route, seat, seat_type, trip, trip_seat};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::utils::validate;
use crate::AppState;

// ============ Routes ============

#[derive(Debug, Default, Deserialize)]
pub struct RouteListParams {
    pub company: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub origin: Option<String>,
    pub destiny: Option<String>,
    pub origin_exact: Option<String>,
    pub destiny_exact: Option<String>,
    pub route_search: Option<String>,
}

fn filtered_routes(params: &RouteListParams) -> Select<route::Entity> {
    let mut query = route::Entity::find();

    if params.company_name.is_some() {
        query = query.join(JoinType::InnerJoin, route::Relation::Company.def());
    }
    if let Some(id) = params.company.or(params.company_id) {
        query = query.filter(route::Column::CompanyId.eq(id));
    }
    if let Some(v) = &params.company_name {
        query = query.filter(company::Column::Name.contains(v));
    }
    if let Some(v) = &params.origin {
        query = query.filter(route::Column::Origin.contains(v));
    }
    if let Some(v) = &params.destiny {
        query = query.filter(route::Column::Destiny.contains(v));
    }
    if let Some(v) = &params.origin_exact {
        query = query.filter(route::Column::Origin.eq(v));
    }
    if let Some(v) = &params.destiny_exact {
        query = query.filter(route::Column::Destiny.eq(v));
    }
    if let Some(v) = &params.route_search {
        // Matches either end of the route
        query = query.filter(
            Condition::any()
                .add(route::Column::Origin.contains(v))
                .add(route::Column::Destiny.contains(v)),
        );
    }

    query
}

pub async fn list_routes(
    State(state): State<AppState>,
    Query(params): Query<RouteListParams>,
) -> AppResult<Json<Vec<route::Model>>> {
    Ok(Json(filtered_routes(&params).all(&state.db).await?))
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<route::Model>> {
    let found = route::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    pub company_id: Uuid,
    pub origin: String,
    pub destiny: String,
}

pub async fn create_route(
    State(state): State<AppState>,
    Json(payload): Json<CreateRouteRequest>,
) -> AppResult<Json<route::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::distinct_route_ends(&payload.origin, &payload.destiny) {
        errors.add("destiny", msg);
    }
    if let Err(msg) = validate::max_length(&payload.origin, 100, "Origin") {
        errors.add("origin", msg);
    }
    if let Err(msg) = validate::max_length(&payload.destiny, 100, "Destiny") {
        errors.add("destiny", msg);
    }
    errors.into_result()?;

    company::Entity::find_by_id(payload.company_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    let created = route::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(payload.company_id),
        origin: Set(payload.origin),
        destiny: Set(payload.destiny),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRouteRequest {
    pub origin: Option<String>,
    pub destiny: Option<String>,
}

pub async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRouteRequest>,
) -> AppResult<Json<route::Model>> {
    let found = route::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;

    let origin = payload.origin.as_deref().unwrap_or(&found.origin);
    let destiny = payload.destiny.as_deref().unwrap_or(&found.destiny);

    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::distinct_route_ends(origin, destiny) {
        errors.add("destiny", msg);
    }
    if let Err(msg) = validate::max_length(origin, 100, "Origin") {
        errors.add("origin", msg);
    }
    if let Err(msg) = validate::max_length(destiny, 100, "Destiny") {
        errors.add("destiny", msg);
    }
    errors.into_result()?;

    let mut active: route::ActiveModel = found.into();
    if let Some(origin) = payload.origin {
        active.origin = Set(origin);
    }
    if let Some(destiny) = payload.destiny {
        active.destiny = Set(destiny);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = route::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Route not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Route deleted" })))
}

// ============ Trips ============

#[derive(Debug, Default, Deserialize)]
pub struct TripListParams {
    pub route: Option<Uuid>,
    pub route_id: Option<Uuid>,
    pub origin: Option<String>,
    pub destiny: Option<String>,
    pub company: Option<Uuid>,
    pub company_name: Option<String>,
    pub seat: Option<Uuid>,
    pub seat_id: Option<Uuid>,
    pub seat_number: Option<i32>,
    pub ship: Option<Uuid>,
    #[serde(rename = "basePrice")]
    pub base_price: Option<f64>,
    #[serde(rename = "basePrice_min")]
    pub base_price_min: Option<f64>,
    #[serde(rename = "basePrice_max")]
    pub base_price_max: Option<f64>,
    #[serde(rename = "dateDeparture")]
    pub date_departure: Option<DateTime<Utc>>,
    #[serde(rename = "dateDeparture_min")]
    pub date_departure_min: Option<DateTime<Utc>>,
    #[serde(rename = "dateDeparture_max")]
    pub date_departure_max: Option<DateTime<Utc>>,
}

fn filtered_trips(params: &TripListParams) -> Select<trip::Entity> {
    let mut query = trip::Entity::find();

    let needs_route =
        params.origin.is_some() || params.destiny.is_some() || params.company.is_some();
    if needs_route || params.company_name.is_some() {
        query = query.join(JoinType::InnerJoin, trip::Relation::Route.def());
    }
    if params.company_name.is_some() {
        query = query.join(JoinType::InnerJoin, route::Relation::Company.def());
    }
    if params.seat_number.is_some() || params.ship.is_some() {
        query = query.join(JoinType::InnerJoin, trip::Relation::Seat.def());
    }
    if params.ship.is_some() {
        query = query.join(JoinType::InnerJoin, seat::Relation::SeatType.def());
    }

    if let Some(id) = params.route.or(params.route_id) {
        query = query.filter(trip::Column::RouteId.eq(id));
    }
    if let Some(v) = &params.origin {
        query = query.filter(route::Column::Origin.contains(v));
    }
    if let Some(v) = &params.destiny {
        query = query.filter(route::Column::Destiny.contains(v));
    }
    if let Some(id) = params.company {
        query = query.filter(route::Column::CompanyId.eq(id));
    }
    if let Some(v) = &params.company_name {
        query = query.filter(company::Column::Name.contains(v));
    }
    if let Some(id) = params.seat.or(params.seat_id) {
        query = query.filter(trip::Column::SeatId.eq(id));
    }
    if let Some(number) = params.seat_number {
        query = query.filter(seat::Column::Number.eq(number));
    }
    if let Some(id) = params.ship {
        query = query.filter(seat_type::Column::ShipId.eq(id));
    }
    if let Some(price) = params.base_price {
        query = query.filter(trip::Column::BasePrice.eq(price));
    }
    if let Some(price) = params.base_price_min {
        query = query.filter(trip::Column::BasePrice.gte(price));
    }
    if let Some(price) = params.base_price_max {
        query = query.filter(trip::Column::BasePrice.lte(price));
    }
    if let Some(t) = params.date_departure {
        query = query.filter(trip::Column::DateDeparture.eq(t));
    }
    if let Some(t) = params.date_departure_min {
        query = query.filter(trip::Column::DateDeparture.gte(t));
    }
    if let Some(t) = params.date_departure_max {
        query = query.filter(trip::Column::DateDeparture.lte(t));
    }

    query
}

pub async fn list_trips(
    State(state): State<AppState>,
    Query(params): Query<TripListParams>,
) -> AppResult<Json<Vec<trip::Model>>> {
    Ok(Json(filtered_trips(&params).all(&state.db).await?))
}

pub async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<trip::Model>> {
    let found = trip::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub route_id: Uuid,
    pub seat_id: Uuid,
    #[serde(rename = "basePrice", default)]
    pub base_price: f64,
    #[serde(rename = "dateDeparture")]
    pub date_departure: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TripCreatedResponse {
    pub trip: trip::Model,
    /// Bookable seats materialized for this sailing
    pub seats_created: usize,
}

/// Schedule a sailing. Creates the trip and one `disponible` trip seat for
/// every seat on the ship the seat template belongs to, in one transaction.
pub async fn create_trip(
    State(state): State<AppState>,
    Json(payload): Json<CreateTripRequest>,
) -> AppResult<Json<TripCreatedResponse>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::non_negative_price(payload.base_price, "Base price") {
        errors.add("basePrice", msg);
    }
    errors.into_result()?;

    route::Entity::find_by_id(payload.route_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;

    let template = seat::Entity::find_by_id(payload.seat_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;

    let template_type = seat_type::Entity::find_by_id(template.seat_type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat type not found".to_string()))?;

    // Every seat on the ship becomes one bookable unit for this sailing
    let ship_seats = seat::Entity::find()
        .join(JoinType::InnerJoin, seat::Relation::SeatType.def())
        .filter(seat_type::Column::ShipId.eq(template_type.ship_id))
        .all(&state.db)
        .await?;

    let txn = state.db.begin().await?;

    let created = trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        route_id: Set(payload.route_id),
        seat_id: Set(payload.seat_id),
        base_price: Set(payload.base_price),
        date_departure: Set(payload.date_departure.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let seats_created = ship_seats.len();
    let units = ship_seats.into_iter().map(|s| trip_seat::ActiveModel {
        id: Set(Uuid::new_v4()),
        trip_id: Set(created.id),
        seat_id: Set(s.id),
        state: Set(SeatState::Disponible),
        ..Default::default()
    });
    trip_seat::Entity::insert_many(units)
        .on_empty_do_nothing()
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(trip_id = %created.id, seats = seats_created, "Sailing scheduled");
    Ok(Json(TripCreatedResponse {
        trip: created,
        seats_created,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTripRequest {
    pub route_id: Option<Uuid>,
    #[serde(rename = "basePrice")]
    pub base_price: Option<f64>,
    #[serde(rename = "dateDeparture")]
    pub date_departure: Option<DateTime<Utc>>,
}

pub async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTripRequest>,
) -> AppResult<Json<trip::Model>> {
    let found = trip::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let mut active: trip::ActiveModel = found.into();
    if let Some(route_id) = payload.route_id {
        route::Entity::find_by_id(route_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;
        active.route_id = Set(route_id);
    }
    if let Some(price) = payload.base_price {
        let mut errors = FieldErrors::new();
        if let Err(msg) = validate::non_negative_price(price, "Base price") {
            errors.add("basePrice", msg);
        }
        errors.into_result()?;
        active.base_price = Set(price);
    }
    if let Some(t) = payload.date_departure {
        active.date_departure = Set(t.into());
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = trip::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Trip not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Trip deleted" })))
}

// ============ Trip seats ============

#[derive(Debug, Default, Deserialize)]
pub struct TripSeatListParams {
    pub trip: Option<Uuid>,
    pub trip_id: Option<Uuid>,
    pub seat: Option<Uuid>,
    pub seat_id: Option<Uuid>,
    pub seat_number: Option<i32>,
    pub ship: Option<Uuid>,
    pub company: Option<Uuid>,
    pub origin: Option<String>,
    pub destiny: Option<String>,
    pub state: Option<SeatState>,
    pub available_seats: Option<bool>,
}

fn filtered_trip_seats(params: &TripSeatListParams) -> Select<trip_seat::Entity> {
    let mut query = trip_seat::Entity::find();

    let needs_route =
        params.company.is_some() || params.origin.is_some() || params.destiny.is_some();
    if needs_route {
        query = query
            .join(JoinType::InnerJoin, trip_seat::Relation::Trip.def())
            .join(JoinType::InnerJoin, trip::Relation::Route.def());
    }
    if params.seat_number.is_some() || params.ship.is_some() {
        query = query.join(JoinType::InnerJoin, trip_seat::Relation::Seat.def());
    }
    if params.ship.is_some() {
        query = query.join(JoinType::InnerJoin, seat::Relation::SeatType.def());
    }

    if let Some(id) = params.trip.or(params.trip_id) {
        query = query.filter(trip_seat::Column::TripId.eq(id));
    }
    if let Some(id) = params.seat.or(params.seat_id) {
        query = query.filter(trip_seat::Column::SeatId.eq(id));
    }
    if let Some(number) = params.seat_number {
        query = query.filter(seat::Column::Number.eq(number));
    }
    if let Some(id) = params.ship {
        query = query.filter(seat_type::Column::ShipId.eq(id));
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
    if let Some(state) = params.state {
        query = query.filter(trip_seat::Column::State.eq(state));
    }
    if let Some(flag) = params.available_seats {
        query = if flag {
            query.filter(trip_seat::Column::State.eq(SeatState::Disponible))
        } else {
            query.filter(trip_seat::Column::State.ne(SeatState::Disponible))
        };
    }

    query
}

pub async fn list_trip_seats(
    State(state): State<AppState>,
    Query(params): Query<TripSeatListParams>,
) -> AppResult<Json<Vec<trip_seat::Model>>> {
    Ok(Json(filtered_trip_seats(&params).all(&state.db).await?))
}

pub async fn get_trip_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<trip_seat::Model>> {
    let found = trip_seat::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip seat not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateTripSeatRequest {
    pub trip_id: Uuid,
    pub seat_id: Uuid,
}

/// Add a single bookable unit to an existing sailing. New units always start
/// `disponible`; later transitions belong to the reservation ledger.
pub async fn create_trip_seat(
    State(state): State<AppState>,
    Json(payload): Json<CreateTripSeatRequest>,
) -> AppResult<Json<trip_seat::Model>> {
    trip::Entity::find_by_id(payload.trip_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
    seat::Entity::find_by_id(payload.seat_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;

    let existing = trip_seat::Entity::find()
        .filter(trip_seat::Column::TripId.eq(payload.trip_id))
        .filter(trip_seat::Column::SeatId.eq(payload.seat_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "This seat is already materialized for the trip".to_string(),
        ));
    }

    let created = trip_seat::ActiveModel {
        id: Set(Uuid::new_v4()),
        trip_id: Set(payload.trip_id),
        seat_id: Set(payload.seat_id),
        state: Set(SeatState::Disponible),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

pub async fn delete_trip_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = trip_seat::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Trip seat not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Trip seat deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_route_search_matches_either_end() {
        let params = RouteListParams {
            route_search: Some("Ibiza".to_string()),
            ..Default::default()
        };

        let sql = filtered_routes(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"origin\" LIKE '%Ibiza%'"));
        assert!(sql.contains("\"destiny\" LIKE '%Ibiza%'"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_base_price_bounds() {
        let params = TripListParams {
            base_price_min: Some(50.0),
            base_price_max: Some(150.0),
            ..Default::default()
        };

        let sql = filtered_trips(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"base_price\" >= 50"));
        assert!(sql.contains("\"base_price\" <= 150"));
    }

    #[test]
    fn test_available_seats_shortcut() {
        let params = TripSeatListParams {
            available_seats: Some(true),
            ..Default::default()
        };

        let sql = filtered_trip_seats(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"state\" = "));
        assert!(sql.contains("disponible"));
    }

    #[test]
    fn test_trip_seat_company_filter_joins_trip_and_route() {
        let params = TripSeatListParams {
            company: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let sql = filtered_trip_seats(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("INNER JOIN \"trip\""));
        assert!(sql.contains("INNER JOIN \"route\""));
    }
}
