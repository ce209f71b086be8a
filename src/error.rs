use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Every failure a user action can surface. All of them are terminal for the
/// triggering request; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("backend unreachable: {0}")]
    Connection(String),
    #[error("{0}")]
    Auth(String),
    #[error("account pending admin approval")]
    PendingApproval,
    #[error("daily write quota exceeded")]
    QuotaExceeded,
    #[error("validation failed")]
    Validation(Vec<String>),
    #[error("store write failed: {0}")]
    StoreWrite(String),
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Connection(msg) => AppError::Connection(msg),
            StoreError::Write(msg) => AppError::StoreWrite(msg),
            StoreError::NotFound => AppError::NotFound,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::PendingApproval => StatusCode::FORBIDDEN,
            AppError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreWrite(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }
        let body = match &self {
            AppError::Validation(problems) => {
                json!({ "error": self.to_string(), "details": problems })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reports_every_problem() {
        let err = AppError::Validation(vec![
            "row 1: missing description".into(),
            "row 3: negative calories".into(),
        ]);
        match &err {
            AppError::Validation(problems) => assert_eq!(problems.len(), 2),
            _ => unreachable!(),
        }
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let e: AppError = StoreError::Write("insert failed".into()).into();
        assert!(matches!(e, AppError::StoreWrite(_)));
        let e: AppError = StoreError::Connection("refused".into()).into();
        assert!(matches!(e, AppError::Connection(_)));
        let e: AppError = StoreError::NotFound.into();
        assert!(matches!(e, AppError::NotFound));
    }
}
