use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crates::domain::value_objects::validation::FieldError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::usecases::errors::UseCaseError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable")]
    Unavailable,

    #[error(transparent)]
    UseCase(#[from] UseCaseError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string(), None),
            AppError::UseCase(UseCaseError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                "validation failed".to_string(),
                Some(errors),
            ),
            AppError::UseCase(UseCaseError::Internal(err)) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::UseCase(err) => (err.status_code(), err.to_string(), None),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
            details,
        });

        (status, body).into_response()
    }
}
