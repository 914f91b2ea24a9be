use axum::{
    Json, async_trait,
    extract::{FromRequest, Request},
};
use crates::domain::value_objects::validation::field_errors;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{axum_http::error_responses::AppError, usecases::errors::UseCaseError};

/// JSON body that has passed its model's `validator` rules.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::UseCase(UseCaseError::Validation(field_errors(&errors))))?;

        Ok(ValidatedJson(value))
    }
}
