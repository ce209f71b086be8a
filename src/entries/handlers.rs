use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::goals::handlers::parse_date_param;
use crate::state::AppState;
use crate::store::Entry;

use super::dto::{DaySaveRequest, DaySaveResponse, MealFields};
use super::service;

#[instrument(skip(state, payload))]
pub async fn save_day(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
    Json(payload): Json<DaySaveRequest>,
) -> Result<Json<DaySaveResponse>, AppError> {
    let date = parse_date_param(&date)?;
    let response = service::save_day(&state, user_id, date, payload.rows).await?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Entry>>, AppError> {
    Ok(Json(service::list_history(&state, user_id).await?))
}

#[instrument(skip(state, fields))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(fields): Json<MealFields>,
) -> Result<Json<Entry>, AppError> {
    Ok(Json(service::update_meal(&state, user_id, id, fields).await?))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Entry>, AppError> {
    Ok(Json(service::delete_meal(&state, user_id, id).await?))
}
