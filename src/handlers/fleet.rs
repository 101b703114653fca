use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
    Select, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{company, seat, seat_type, ship};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::utils::validate;
use crate::AppState;

// ============ Ships ============

#[derive(Debug, Default, Deserialize)]
pub struct ShipListParams {
    pub company: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub name: Option<String>,
    pub construction_year: Option<i32>,
    pub construction_year_min: Option<i32>,
    pub construction_year_max: Option<i32>,
}

fn filtered_ships(params: &ShipListParams) -> Select<ship::Entity> {
    let mut query = ship::Entity::find();

    if params.company_name.is_some() {
        query = query.join(JoinType::InnerJoin, ship::Relation::Company.def());
    }
    if let Some(id) = params.company.or(params.company_id) {
        query = query.filter(ship::Column::CompanyId.eq(id));
    }
    if let Some(v) = &params.company_name {
        query = query.filter(company::Column::Name.contains(v));
    }
    if let Some(v) = &params.name {
        query = query.filter(ship::Column::Name.contains(v));
    }
    if let Some(year) = params.construction_year {
        query = query.filter(ship::Column::ConstructionYear.eq(year));
    }
    if let Some(year) = params.construction_year_min {
        query = query.filter(ship::Column::ConstructionYear.gte(year));
    }
    if let Some(year) = params.construction_year_max {
        query = query.filter(ship::Column::ConstructionYear.lte(year));
    }

    query
}

pub async fn list_ships(
    State(state): State<AppState>,
    Query(params): Query<ShipListParams>,
) -> AppResult<Json<Vec<ship::Model>>> {
    Ok(Json(filtered_ships(&params).all(&state.db).await?))
}

pub async fn get_ship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ship::Model>> {
    let found = ship::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ship not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateShipRequest {
    pub company_id: Uuid,
    pub name: String,
    pub construction_year: i32,
}

pub async fn create_ship(
    State(state): State<AppState>,
    Json(payload): Json<CreateShipRequest>,
) -> AppResult<Json<ship::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::max_length(&payload.name, 100, "Name") {
        errors.add("name", msg);
    }
    if let Err(msg) = validate::construction_year(payload.construction_year) {
        errors.add("construction_year", msg);
    }
    errors.into_result()?;

    company::Entity::find_by_id(payload.company_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    let created = ship::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(payload.company_id),
        name: Set(payload.name),
        construction_year: Set(payload.construction_year),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateShipRequest {
    pub name: Option<String>,
    pub construction_year: Option<i32>,
}

pub async fn update_ship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShipRequest>,
) -> AppResult<Json<ship::Model>> {
    let found = ship::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ship not found".to_string()))?;

    let mut errors = FieldErrors::new();
    if let Some(name) = &payload.name {
        if let Err(msg) = validate::max_length(name, 100, "Name") {
            errors.add("name", msg);
        }
    }
    if let Some(year) = payload.construction_year {
        if let Err(msg) = validate::construction_year(year) {
            errors.add("construction_year", msg);
        }
    }
    errors.into_result()?;

    let mut active: ship::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(year) = payload.construction_year {
        active.construction_year = Set(year);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_ship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = ship::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Ship not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Ship deleted" })))
}

// ============ Seat types ============

#[derive(Debug, Default, Deserialize)]
pub struct SeatTypeListParams {
    pub ship: Option<Uuid>,
    pub ship_id: Option<Uuid>,
    pub ship_name: Option<String>,
    pub ship_company: Option<Uuid>,
    #[serde(rename = "aditionalPrice")]
    pub additional_price: Option<f64>,
    #[serde(rename = "aditionalPrice_min")]
    pub additional_price_min: Option<f64>,
    #[serde(rename = "aditionalPrice_max")]
    pub additional_price_max: Option<f64>,
    pub is_free: Option<bool>,
}

fn filtered_seat_types(params: &SeatTypeListParams) -> Select<seat_type::Entity> {
    let mut query = seat_type::Entity::find();

    if params.ship_name.is_some() || params.ship_company.is_some() {
        query = query.join(JoinType::InnerJoin, seat_type::Relation::Ship.def());
    }
    if let Some(id) = params.ship.or(params.ship_id) {
        query = query.filter(seat_type::Column::ShipId.eq(id));
    }
    if let Some(v) = &params.ship_name {
        query = query.filter(ship::Column::Name.contains(v));
    }
    if let Some(id) = params.ship_company {
        query = query.filter(ship::Column::CompanyId.eq(id));
    }
    if let Some(price) = params.additional_price {
        query = query.filter(seat_type::Column::AdditionalPrice.eq(price));
    }
    if let Some(price) = params.additional_price_min {
        query = query.filter(seat_type::Column::AdditionalPrice.gte(price));
    }
    if let Some(price) = params.additional_price_max {
        query = query.filter(seat_type::Column::AdditionalPrice.lte(price));
    }
    if let Some(flag) = params.is_free {
        query = if flag {
            query.filter(seat_type::Column::AdditionalPrice.eq(0.0))
        } else {
            query.filter(seat_type::Column::AdditionalPrice.ne(0.0))
        };
    }

    query
}

pub async fn list_seat_types(
    State(state): State<AppState>,
    Query(params): Query<SeatTypeListParams>,
) -> AppResult<Json<Vec<seat_type::Model>>> {
    Ok(Json(filtered_seat_types(&params).all(&state.db).await?))
}

pub async fn get_seat_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<seat_type::Model>> {
    let found = seat_type::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat type not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateSeatTypeRequest {
    pub ship_id: Uuid,
    #[serde(rename = "aditionalPrice", default)]
    pub additional_price: f64,
}

pub async fn create_seat_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateSeatTypeRequest>,
) -> AppResult<Json<seat_type::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::non_negative_price(payload.additional_price, "Additional price") {
        errors.add("aditionalPrice", msg);
    }
    errors.into_result()?;

    ship::Entity::find_by_id(payload.ship_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ship not found".to_string()))?;

    let created = seat_type::ActiveModel {
        id: Set(Uuid::new_v4()),
        ship_id: Set(payload.ship_id),
        additional_price: Set(payload.additional_price),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSeatTypeRequest {
    #[serde(rename = "aditionalPrice")]
    pub additional_price: Option<f64>,
}

pub async fn update_seat_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSeatTypeRequest>,
) -> AppResult<Json<seat_type::Model>> {
    let found = seat_type::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat type not found".to_string()))?;

    let mut active: seat_type::ActiveModel = found.into();
    if let Some(price) = payload.additional_price {
        let mut errors = FieldErrors::new();
        if let Err(msg) = validate::non_negative_price(price, "Additional price") {
            errors.add("aditionalPrice", msg);
        }
        errors.into_result()?;
        active.additional_price = Set(price);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_seat_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = seat_type::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Seat type not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Seat type deleted" })))
}

// ============ Seats ============

#[derive(Debug, Default, Deserialize)]
pub struct SeatListParams {
    #[serde(rename = "seatType")]
    pub seat_type: Option<Uuid>,
    #[serde(rename = "seatType_id")]
    pub seat_type_id: Option<Uuid>,
    pub ship: Option<Uuid>,
    pub ship_name: Option<String>,
    pub company: Option<Uuid>,
    pub number: Option<i32>,
    pub number_min: Option<i32>,
    pub number_max: Option<i32>,
}

fn filtered_seats(params: &SeatListParams) -> Select<seat::Entity> {
    let mut query = seat::Entity::find();

    let needs_ship = params.ship_name.is_some() || params.company.is_some();
    if params.ship.is_some() || needs_ship {
        query = query.join(JoinType::InnerJoin, seat::Relation::SeatType.def());
    }
    if needs_ship {
        query = query.join(JoinType::InnerJoin, seat_type::Relation::Ship.def());
    }

    if let Some(id) = params.seat_type.or(params.seat_type_id) {
        query = query.filter(seat::Column::SeatTypeId.eq(id));
    }
    if let Some(id) = params.ship {
        query = query.filter(seat_type::Column::ShipId.eq(id));
    }
    if let Some(v) = &params.ship_name {
        query = query.filter(ship::Column::Name.contains(v));
    }
    if let Some(id) = params.company {
        query = query.filter(ship::Column::CompanyId.eq(id));
    }
    if let Some(number) = params.number {
        query = query.filter(seat::Column::Number.eq(number));
    }
    if let Some(number) = params.number_min {
        query = query.filter(seat::Column::Number.gte(number));
    }
    if let Some(number) = params.number_max {
        query = query.filter(seat::Column::Number.lte(number));
    }

    query
}

pub async fn list_seats(
    State(state): State<AppState>,
    Query(params): Query<SeatListParams>,
) -> AppResult<Json<Vec<seat::Model>>> {
    Ok(Json(filtered_seats(&params).all(&state.db).await?))
}

pub async fn get_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<seat::Model>> {
    let found = seat::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateSeatRequest {
    #[serde(rename = "seatType_id")]
    pub seat_type_id: Uuid,
    pub number: i32,
}

pub async fn create_seat(
    State(state): State<AppState>,
    Json(payload): Json<CreateSeatRequest>,
) -> AppResult<Json<seat::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::positive_seat_number(payload.number) {
        errors.add("number", msg);
    }
    errors.into_result()?;

    seat_type::Entity::find_by_id(payload.seat_type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat type not found".to_string()))?;

    let created = seat::ActiveModel {
        id: Set(Uuid::new_v4()),
        seat_type_id: Set(payload.seat_type_id),
        number: Set(payload.number),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSeatRequest {
    pub number: Option<i32>,
}

pub async fn update_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSeatRequest>,
) -> AppResult<Json<seat::Model>> {
    let found = seat::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;

    let mut active: seat::ActiveModel = found.into();
    if let Some(number) = payload.number {
        let mut errors = FieldErrors::new();
        if let Err(msg) = validate::positive_seat_number(number) {
            errors.add("number", msg);
        }
        errors.into_result()?;
        active.number = Set(number);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = seat::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Seat not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Seat deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_construction_year_bounds_in_sql() {
        let params = ShipListParams {
            construction_year_min: Some(1990),
            construction_year_max: Some(2010),
            ..Default::default()
        };

        let sql = filtered_ships(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"construction_year\" >= 1990"));
        assert!(sql.contains("\"construction_year\" <= 2010"));
    }

    #[test]
    fn test_is_free_matches_zero_surcharge() {
        let params = SeatTypeListParams {
            is_free: Some(true),
            ..Default::default()
        };

        let sql = filtered_seat_types(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"additional_price\" = 0"));
    }

    #[test]
    fn test_seat_company_filter_joins_through_ship() {
        let params = SeatListParams {
            company: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let sql = filtered_seats(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("INNER JOIN \"seat_type\""));
        assert!(sql.contains("INNER JOIN \"ship\""));
        assert!(sql.contains("\"company_id\" ="));
    }
}
