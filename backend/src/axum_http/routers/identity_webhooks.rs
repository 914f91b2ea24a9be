use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use crates::{
    domain::repositories::{
        notification_outbox::NotificationOutboxRepository, users::UserRepository,
    },
    identity::webhook_signature::IdentityWebhookVerifier,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{notification_outbox::NotificationOutboxPostgres, users::UserPostgres},
    },
};
use tracing::warn;

use crate::{
    axum_http::error_responses::AppError,
    usecases::identity_sync::{IdentitySyncUseCase, IdentityWebhookEvent},
};

pub struct IdentityWebhookState<U, O>
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    usecase: IdentitySyncUseCase<U, O>,
    /// `None` only outside production, where deliveries are accepted unsigned.
    verifier: Option<IdentityWebhookVerifier>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, webhook_secret: Option<&str>) -> Router {
    let usecase = IdentitySyncUseCase::new(
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(&db_pool))),
    );
    let verifier = webhook_secret.map(IdentityWebhookVerifier::new);
    if verifier.is_none() {
        warn!("identity webhooks: no signing secret configured, signatures are not checked");
    }

    Router::new()
        .route("/", post(identity_webhook))
        .with_state(Arc::new(IdentityWebhookState { usecase, verifier }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub async fn identity_webhook<U, O>(
    State(state): State<Arc<IdentityWebhookState<U, O>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    if let Some(verifier) = &state.verifier {
        if let Err(err) = verifier.verify(
            header(&headers, "svix-id"),
            header(&headers, "svix-timestamp"),
            header(&headers, "svix-signature"),
            &body,
            Utc::now(),
        ) {
            warn!(reason = %err, "identity webhooks: signature rejected");
            return AppError::Unauthorized.into_response();
        }
    }

    let event: IdentityWebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            return AppError::BadRequest(format!("invalid event payload: {err}")).into_response();
        }
    };

    match state.usecase.handle(event).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
