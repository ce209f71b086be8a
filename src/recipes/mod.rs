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
        .route("/recipes", get(handlers::my_recipes).post(handlers::create_recipe))
        .route("/recipes/public", get(handlers::public_recipes))
        .route(
            "/recipes/:id",
            put(handlers::update_recipe).delete(handlers::delete_recipe),
        )
        .route("/recipes/:id/log", post(handlers::log_recipe))
}
