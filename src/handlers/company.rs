use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, QueryFilter, QuerySelect,
    RelationTrait, Select, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{company, rol, user, user_company};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::utils::validate;
use crate::AppState;

// ============ Companies ============

#[derive(Debug, Default, Deserialize)]
pub struct CompanyListParams {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub has_logo: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn filtered_companies(params: &CompanyListParams) -> Select<company::Entity> {
    let mut query = company::Entity::find();

    if let Some(v) = &params.name {
        query = query.filter(company::Column::Name.contains(v));
    }
    if let Some(v) = &params.email {
        query = query.filter(company::Column::Email.contains(v));
    }
    if let Some(v) = &params.address {
        query = query.filter(company::Column::Address.contains(v));
    }
    if let Some(v) = &params.phone_number {
        query = query.filter(company::Column::PhoneNumber.contains(v));
    }
    if let Some(v) = &params.description {
        query = query.filter(company::Column::Description.contains(v));
    }
    if let Some(flag) = params.has_logo {
        query = if flag {
            query
                .filter(company::Column::Logo.is_not_null())
                .filter(company::Column::Logo.ne(""))
        } else {
            query.filter(
                Condition::any()
                    .add(company::Column::Logo.is_null())
                    .add(company::Column::Logo.eq("")),
            )
        };
    }
    if let Some(t) = params.created_after {
        query = query.filter(company::Column::CreatedAt.gte(t));
    }
    if let Some(t) = params.created_before {
        query = query.filter(company::Column::CreatedAt.lte(t));
    }

    query
}

pub async fn list_companies(
    State(state): State<AppState>,
    Query(params): Query<CompanyListParams>,
) -> AppResult<Json<Vec<company::Model>>> {
    Ok(Json(filtered_companies(&params).all(&state.db).await?))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<company::Model>> {
    let found = company::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub email: Option<String>,
    pub address: String,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub logo: Option<String>,
    pub description: String,
}

fn check_company_fields(
    name: &str,
    address: &str,
    phone_number: &str,
    description: &str,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::max_length(name, 100, "Name") {
        errors.add("name", msg);
    }
    if let Err(msg) = validate::max_length(address, 100, "Address") {
        errors.add("address", msg);
    }
    if let Err(msg) = validate::max_length(phone_number, 15, "Phone number") {
        errors.add("phoneNumber", msg);
    }
    if let Err(msg) = validate::max_length(description, 1000, "Description") {
        errors.add("description", msg);
    }
    errors
}

pub async fn create_company(
    State(state): State<AppState>,
    Json(payload): Json<CreateCompanyRequest>,
) -> AppResult<Json<company::Model>> {
    check_company_fields(
        &payload.name,
        &payload.address,
        &payload.phone_number,
        &payload.description,
    )
    .into_result()?;

    let created = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        email: Set(payload.email),
        address: Set(payload.address),
        phone_number: Set(payload.phone_number),
        logo: Set(payload.logo),
        description: Set(payload.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
}

pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> AppResult<Json<company::Model>> {
    let found = company::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    check_company_fields(
        payload.name.as_deref().unwrap_or(&found.name),
        payload.address.as_deref().unwrap_or(&found.address),
        payload.phone_number.as_deref().unwrap_or(&found.phone_number),
        payload.description.as_deref().unwrap_or(&found.description),
    )
    .into_result()?;

    let mut active: company::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(email) = payload.email {
        active.email = Set(Some(email));
    }
    if let Some(address) = payload.address {
        active.address = Set(address);
    }
    if let Some(phone_number) = payload.phone_number {
        active.phone_number = Set(phone_number);
    }
    if let Some(logo) = payload.logo {
        active.logo = Set(Some(logo));
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

/// Delete a company. Ships, routes, trips and their seats go with it through
/// the FK cascade.
pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = company::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Company not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Company deleted" })))
}

// ============ Roles ============

#[derive(Debug, Default, Deserialize)]
pub struct RolListParams {
    pub name: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn filtered_roles(params: &RolListParams) -> Select<rol::Entity> {
    let mut query = rol::Entity::find();

    if let Some(v) = &params.name {
        query = query.filter(rol::Column::Name.contains(v));
    }
    if let Some(t) = params.created_after {
        query = query.filter(rol::Column::CreatedAt.gte(t));
    }
    if let Some(t) = params.created_before {
        query = query.filter(rol::Column::CreatedAt.lte(t));
    }

    query
}

pub async fn list_roles(
    State(state): State<AppState>,
    Query(params): Query<RolListParams>,
) -> AppResult<Json<Vec<rol::Model>>> {
    Ok(Json(filtered_roles(&params).all(&state.db).await?))
}

pub async fn get_rol(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<rol::Model>> {
    let found = rol::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Rol not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateRolRequest {
    pub name: String,
}

pub async fn create_rol(
    State(state): State<AppState>,
    Json(payload): Json<CreateRolRequest>,
) -> AppResult<Json<rol::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::max_length(&payload.name, 100, "Name") {
        errors.add("name", msg);
    }
    errors.into_result()?;

    let created = rol::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolRequest {
    pub name: Option<String>,
}

pub async fn update_rol(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolRequest>,
) -> AppResult<Json<rol::Model>> {
    let found = rol::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Rol not found".to_string()))?;

    let mut active: rol::ActiveModel = found.into();
    if let Some(name) = payload.name {
        let mut errors = FieldErrors::new();
        if let Err(msg) = validate::max_length(&name, 100, "Name") {
            errors.add("name", msg);
        }
        errors.into_result()?;
        active.name = Set(name);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_rol(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = rol::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Rol not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Rol deleted" })))
}

// ============ Memberships (user ↔ company) ============

#[derive(Debug, Default, Deserialize)]
pub struct MembershipListParams {
    pub empresa: Option<Uuid>,
    pub empresa_id: Option<Uuid>,
    pub empresa_name: Option<String>,
    pub user: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub user_username: Option<String>,
    pub user_email: Option<String>,
    pub rol: Option<Uuid>,
    pub rol_id: Option<Uuid>,
    pub rol_name: Option<String>,
    pub has_rol: Option<bool>,
}

fn filtered_memberships(params: &MembershipListParams) -> Select<user_company::Entity> {
    let mut query = user_company::Entity::find();

    if params.empresa_name.is_some() {
        query = query.join(JoinType::InnerJoin, user_company::Relation::Company.def());
    }
    if params.user_username.is_some() || params.user_email.is_some() {
        query = query.join(JoinType::InnerJoin, user_company::Relation::User.def());
    }
    if params.rol_name.is_some() {
        query = query.join(JoinType::InnerJoin, user_company::Relation::Rol.def());
    }

    if let Some(id) = params.empresa.or(params.empresa_id) {
        query = query.filter(user_company::Column::CompanyId.eq(id));
    }
    if let Some(v) = &params.empresa_name {
        query = query.filter(company::Column::Name.contains(v));
    }
    if let Some(id) = params.user.or(params.user_id) {
        query = query.filter(user_company::Column::UserId.eq(id));
    }
    if let Some(v) = &params.user_username {
        query = query.filter(user::Column::Username.contains(v));
    }
    if let Some(v) = &params.user_email {
        query = query.filter(user::Column::Email.contains(v));
    }
    if let Some(id) = params.rol.or(params.rol_id) {
        query = query.filter(user_company::Column::RolId.eq(id));
    }
    if let Some(v) = &params.rol_name {
        query = query.filter(rol::Column::Name.contains(v));
    }
    if let Some(flag) = params.has_rol {
        query = if flag {
            query.filter(user_company::Column::RolId.is_not_null())
        } else {
            query.filter(user_company::Column::RolId.is_null())
        };
    }

    query
}

pub async fn list_memberships(
    State(state): State<AppState>,
    Query(params): Query<MembershipListParams>,
) -> AppResult<Json<Vec<user_company::Model>>> {
    Ok(Json(filtered_memberships(&params).all(&state.db).await?))
}

pub async fn get_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<user_company::Model>> {
    let found = user_company::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateMembershipRequest {
    pub empresa_id: Uuid,
    pub user_id: Uuid,
    pub rol_id: Option<Uuid>,
}

pub async fn create_membership(
    State(state): State<AppState>,
    Json(payload): Json<CreateMembershipRequest>,
) -> AppResult<Json<user_company::Model>> {
    company::Entity::find_by_id(payload.empresa_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;
    user::Entity::find_by_id(payload.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if let Some(rol_id) = payload.rol_id {
        rol::Entity::find_by_id(rol_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Rol not found".to_string()))?;
    }

    let created = user_company::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(payload.empresa_id),
        user_id: Set(payload.user_id),
        rol_id: Set(payload.rol_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMembershipRequest {
    pub rol_id: Option<Uuid>,
}

pub async fn update_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMembershipRequest>,
) -> AppResult<Json<user_company::Model>> {
    let found = user_company::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

    if let Some(rol_id) = payload.rol_id {
        rol::Entity::find_by_id(rol_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Rol not found".to_string()))?;
    }

    let mut active: user_company::ActiveModel = found.into();
    active.rol_id = Set(payload.rol_id);
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = user_company::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Membership not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Membership deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_has_logo_true_excludes_empty() {
        let params = CompanyListParams {
            has_logo: Some(true),
            ..Default::default()
        };

        let sql = filtered_companies(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"logo\" IS NOT NULL"));
        assert!(sql.contains("<>"));
    }

    #[test]
    fn test_has_logo_false_matches_null_or_empty() {
        let params = CompanyListParams {
            has_logo: Some(false),
            ..Default::default()
        };

        let sql = filtered_companies(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("\"logo\" IS NULL"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_membership_rol_name_joins_rol() {
        let params = MembershipListParams {
            rol_name: Some("captain".to_string()),
            ..Default::default()
        };

        let sql = filtered_memberships(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("INNER JOIN \"rol\""));
        assert!(sql.contains("LIKE '%captain%'"));
    }
}
