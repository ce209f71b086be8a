use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::goals::handlers::parse_date_param;
use crate::state::AppState;
use crate::store::{Entry, Recipe};

use super::dto::{LogRecipeRequest, RecipePayload};
use super::service;

#[instrument(skip(state))]
pub async fn my_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(service::my_recipes(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn public_recipes(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(service::public_recipes(&state).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<Recipe>), AppError> {
    let fields = payload.validate()?;
    let recipe = service::create_recipe(&state, user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<Recipe>, AppError> {
    let fields = payload.validate()?;
    Ok(Json(service::update_recipe(&state, user_id, id, fields).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_recipe(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn log_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LogRecipeRequest>,
) -> Result<(StatusCode, Json<Entry>), AppError> {
    let date = parse_date_param(&payload.date)?;
    let entry = service::log_recipe(&state, user_id, id, date, payload.servings_eaten).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
