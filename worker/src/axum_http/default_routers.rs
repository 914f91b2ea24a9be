use axum::{Json, http::StatusCode, response::IntoResponse};
use backend::axum_http::error_responses::ErrorResponse;
use tracing::info;

pub async fn not_found() -> impl IntoResponse {
    info!("worker router: not_found handler invoked");
    let status = StatusCode::NOT_FOUND;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message: "NOT_FOUND".to_string(),
            details: None,
        }),
    )
        .into_response()
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
