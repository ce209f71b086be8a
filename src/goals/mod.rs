use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod engine;
pub mod handlers;

pub use engine::{progress, remaining, resolve_goals_for_date, OverrideMap};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/days/:date", get(handlers::day_view))
        .route("/days/:date/goals", put(handlers::edit_day_goals))
        .route(
            "/goals/default",
            get(handlers::get_default_goals).put(handlers::put_default_goals),
        )
}
