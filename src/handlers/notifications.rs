use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
    Select, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{notification, user};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::utils::validate;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListParams {
    pub user: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub user_username: Option<String>,
    pub topic: Option<String>,
    pub body: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

fn filtered(params: &NotificationListParams) -> Select<notification::Entity> {
    let mut query = notification::Entity::find();

    if params.user_username.is_some() {
        query = query.join(JoinType::InnerJoin, notification::Relation::User.def());
    }
    if let Some(id) = params.user.or(params.user_id) {
        query = query.filter(notification::Column::UserId.eq(id));
    }
    if let Some(v) = &params.user_username {
        query = query.filter(user::Column::Username.contains(v));
    }
    if let Some(v) = &params.topic {
        query = query.filter(notification::Column::Topic.contains(v));
    }
    if let Some(v) = &params.body {
        query = query.filter(notification::Column::Body.contains(v));
    }
    if let Some(t) = params.created_after {
        query = query.filter(notification::Column::CreatedAt.gte(t));
    }
    if let Some(t) = params.created_before {
        query = query.filter(notification::Column::CreatedAt.lte(t));
    }

    query
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<NotificationListParams>,
) -> AppResult<Json<Vec<notification::Model>>> {
    Ok(Json(filtered(&params).all(&state.db).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<notification::Model>> {
    let found = notification::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub topic: String,
    pub body: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> AppResult<Json<notification::Model>> {
    let mut errors = FieldErrors::new();
    if let Err(msg) = validate::max_length(&payload.topic, 100, "Topic") {
        errors.add("topic", msg);
    }
    if let Err(msg) = validate::max_length(&payload.body, 1000, "Body") {
        errors.add("body", msg);
    }
    errors.into_result()?;

    user::Entity::find_by_id(payload.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let created = notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        topic: Set(payload.topic),
        body: Set(payload.body),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRequest {
    pub topic: Option<String>,
    pub body: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateNotificationRequest>,
) -> AppResult<Json<notification::Model>> {
    let found = notification::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    let mut errors = FieldErrors::new();
    if let Some(topic) = &payload.topic {
        if let Err(msg) = validate::max_length(topic, 100, "Topic") {
            errors.add("topic", msg);
        }
    }
    if let Some(body) = &payload.body {
        if let Err(msg) = validate::max_length(body, 1000, "Body") {
            errors.add("body", msg);
        }
    }
    errors.into_result()?;

    let mut active: notification::ActiveModel = found.into();
    if let Some(topic) = payload.topic {
        active.topic = Set(topic);
    }
    if let Some(body) = payload.body {
        active.body = Set(body);
    }
    active.updated_at = Set(Utc::now().into());

    Ok(Json(active.update(&state.db).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = notification::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Notification deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_filters_compose_as_conjunction() {
        let params = NotificationListParams {
            topic: Some("delay".to_string()),
            created_after: Some(Utc::now()),
            ..Default::default()
        };

        let sql = filtered(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("LIKE '%delay%'"));
        assert!(sql.contains("\"created_at\" >="));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn test_username_filter_joins_user() {
        let params = NotificationListParams {
            user_username: Some("alice".to_string()),
            ..Default::default()
        };

        let sql = filtered(&params).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("INNER JOIN \"user\""));
        assert!(sql.contains("LIKE '%alice%'"));
    }
}
