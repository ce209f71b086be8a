use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/days/:date/entries", post(handlers::save_day))
        .route("/entries", get(handlers::list_history))
        .route(
            "/entries/:id",
            put(handlers::update_meal).delete(handlers::delete_meal),
        )
}
