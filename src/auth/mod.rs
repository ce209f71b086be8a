use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/me", get(handlers::get_me))
        .route("/admin/pending", get(handlers::pending_users))
        .route("/admin/approve/:user_id", post(handlers::approve_user_route))
}
