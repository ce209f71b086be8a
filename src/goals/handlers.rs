use axum::{
    extract::{Path, State},
    Json,
};
use time::Date;
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{date_fmt, GoalSet};

use super::dto::{DayView, GoalEditResponse};
use super::engine;

pub(crate) fn parse_date_param(raw: &str) -> Result<Date, AppError> {
    date_fmt::parse(raw)
        .map_err(|_| AppError::Validation(vec![format!("invalid date: {raw} (want YYYY-MM-DD)")]))
}

#[instrument(skip(state))]
pub async fn day_view(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> Result<Json<DayView>, AppError> {
    let date = parse_date_param(&date)?;
    let goals = engine::resolve_goals_for_date(&state, user_id, date).await?;
    let entries = engine::fetch_day_entries(&state, user_id, date).await?;
    Ok(Json(DayView::build(date, goals, entries)))
}

#[instrument(skip(state, new_goals))]
pub async fn edit_day_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
    Json(new_goals): Json<GoalSet>,
) -> Result<Json<GoalEditResponse>, AppError> {
    let date = parse_date_param(&date)?;
    let outcome = engine::apply_goal_edit(&state, user_id, date, new_goals).await?;
    Ok(Json(outcome.into()))
}

#[instrument(skip(state))]
pub async fn get_default_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<GoalSet>, AppError> {
    let goals = engine::fetch_default_goals(&state, user_id).await?;
    Ok(Json(goals))
}

#[instrument(skip(state, goals))]
pub async fn put_default_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(goals): Json<GoalSet>,
) -> Result<Json<GoalSet>, AppError> {
    engine::save_default_goals(&state, user_id, goals).await?;
    Ok(Json(goals))
}
