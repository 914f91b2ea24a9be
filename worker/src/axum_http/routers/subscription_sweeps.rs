use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::post,
};
use backend::axum_http::{error_responses::AppError, routers::payments::PgPaymentUseCase};
use chrono::Utc;
use tracing::warn;

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/subscriptions/auto-renewals" \
//     -H "Authorization: Bearer $INTERNAL_SWEEP_TOKEN"

pub fn routes(usecase: Arc<PgPaymentUseCase>, internal_token: Option<String>) -> Router {
    Router::new()
        .route("/expiring", post(check_expiring))
        .route("/auto-renewals", post(process_auto_renewals))
        .route_layer(from_fn_with_state(
            internal_token.map(Arc::<str>::from),
            require_sweep_token,
        ))
        .with_state(usecase)
}

pub async fn check_expiring(State(usecase): State<Arc<PgPaymentUseCase>>) -> impl IntoResponse {
    match usecase.check_expiring_subscriptions(Utc::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn process_auto_renewals(
    State(usecase): State<Arc<PgPaymentUseCase>>,
) -> impl IntoResponse {
    match usecase.process_auto_renewals(Utc::now()).await {
        Ok(results) => Json(results).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// 503 while no token is configured, 401 for a missing or different one.
pub async fn require_sweep_token(
    State(expected): State<Option<Arc<str>>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected else {
        warn!("sweeps: INTERNAL_SWEEP_TOKEN is not configured");
        return AppError::Unavailable.into_response();
    };

    if !authorized(request.headers(), &expected) {
        warn!(path = %request.uri().path(), "sweeps: rejected internal call");
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}

fn authorized(headers: &HeaderMap, expected_token: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected_token)
}
