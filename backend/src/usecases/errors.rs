use axum::http::StatusCode;
use crates::domain::{
    repositories::constraint_violations::ConstraintViolation,
    value_objects::validation::FieldError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UseCaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            UseCaseError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            UseCaseError::Conflict(_) => StatusCode::CONFLICT,
            UseCaseError::BadRequest(_) | UseCaseError::Validation(_) => StatusCode::BAD_REQUEST,
            UseCaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Keeps constraint violations from surfacing as 500s.
    pub fn from_write(err: anyhow::Error, conflict_message: &str) -> Self {
        match ConstraintViolation::find(&err) {
            Some(ConstraintViolation::Unique(_)) => UseCaseError::Conflict(conflict_message.to_string()),
            Some(ConstraintViolation::ForeignKey(constraint)) => UseCaseError::Conflict(format!(
                "operation conflicts with related records ({constraint})"
            )),
            None => UseCaseError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;
