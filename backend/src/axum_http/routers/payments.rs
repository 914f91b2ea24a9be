use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::value_objects::{
        enums::payment_methods::PaymentMethod,
        subscriptions::{
            CancelSubscriptionModel, CreatePreferenceCommand, CreatePreferenceModel,
            RenewSubscriptionModel,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            invoices::InvoicePostgres, listing_activation::ListingActivationPostgres,
            notification_outbox::NotificationOutboxPostgres, payments::PaymentPostgres,
            plans::PlanPostgres, subscriptions::SubscriptionPostgres, users::UserPostgres,
            webhook_receipts::WebhookReceiptPostgres,
        },
    },
    payments::mercado_pago_client::MercadoPagoClient,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{error_responses::AppError, validated_json::ValidatedJson},
    config::config_model::{MercadoPago, Subscription},
    usecases::payments::{GatewayWebhookRequest, PaymentSettings, PaymentUseCase},
};

pub type PgPaymentUseCase = PaymentUseCase<
    PlanPostgres,
    UserPostgres,
    SubscriptionPostgres,
    PaymentPostgres,
    InvoicePostgres,
    ListingActivationPostgres,
    WebhookReceiptPostgres,
    NotificationOutboxPostgres,
    MercadoPagoClient,
>;

/// Wires the payment lifecycle to Postgres and the gateway. Shared with the
/// worker's sweep endpoints.
pub fn build_usecase(
    db_pool: Arc<PgPoolSquad>,
    mercado_pago: &MercadoPago,
    subscription: &Subscription,
) -> PgPaymentUseCase {
    let gateway = MercadoPagoClient::new(
        mercado_pago.access_token.clone(),
        mercado_pago.webhook_secret.clone(),
    );

    PaymentUseCase::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(InvoicePostgres::new(Arc::clone(&db_pool))),
        Arc::new(ListingActivationPostgres::new(Arc::clone(&db_pool))),
        Arc::new(WebhookReceiptPostgres::new(Arc::clone(&db_pool))),
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(&db_pool))),
        Arc::new(gateway),
        PaymentSettings {
            eager_activation: subscription.eager_activation,
            notification_url: mercado_pago.notification_url.clone(),
            default_callback_url: subscription.default_callback_url.clone(),
        },
    )
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    mercado_pago: &MercadoPago,
    subscription: &Subscription,
) -> Router {
    let usecase = build_usecase(db_pool, mercado_pago, subscription);

    Router::new()
        .route("/plans", get(list_plans))
        .route("/preference", post(create_preference))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/:id/renew", post(renew_subscription))
        .route("/subscriptions/:id/cancel", post(cancel_subscription))
        .route("/invoices", get(list_invoices))
        .route("/webhook", post(payment_webhook))
        .with_state(Arc::new(usecase))
}

fn payment_method(raw: &str) -> Result<PaymentMethod, AppError> {
    PaymentMethod::from_str(raw)
        .ok_or_else(|| AppError::BadRequest(format!("unsupported payment method {raw}")))
}

pub async fn list_plans(State(usecase): State<Arc<PgPaymentUseCase>>) -> impl IntoResponse {
    match usecase.list_active_plans().await {
        Ok(plans) => Json(plans).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn create_preference(
    State(usecase): State<Arc<PgPaymentUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    ValidatedJson(model): ValidatedJson<CreatePreferenceModel>,
) -> impl IntoResponse {
    info!(%user_id, plan_id = %model.plan_id, "payments: preference request received");
    let payment_method = match payment_method(&model.payment_method) {
        Ok(method) => method,
        Err(err) => return err.into_response(),
    };

    let command = CreatePreferenceCommand {
        plan_id: model.plan_id,
        user_id,
        callback_url: usecase.callback_or_default(model.callback_url),
        payment_method,
        business_id: model.business_id,
        professional_id: model.professional_id,
        card_token: model.card_token,
        coupon_code: model.coupon_code,
    };

    match usecase.create_payment_preference(command).await {
        Ok(preference) => (StatusCode::CREATED, Json(preference)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn list_subscriptions(
    State(usecase): State<Arc<PgPaymentUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse {
    match usecase.list_subscriptions_for_user(user_id).await {
        Ok(subscriptions) => Json(subscriptions).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn list_invoices(
    State(usecase): State<Arc<PgPaymentUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse {
    match usecase.list_invoices_for_user(user_id).await {
        Ok(invoices) => Json(invoices).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn renew_subscription(
    State(usecase): State<Arc<PgPaymentUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(subscription_id): Path<Uuid>,
    ValidatedJson(model): ValidatedJson<RenewSubscriptionModel>,
) -> impl IntoResponse {
    let payment_method = match payment_method(&model.payment_method) {
        Ok(method) => method,
        Err(err) => return err.into_response(),
    };

    match usecase
        .renew_subscription(
            subscription_id,
            Some(user_id),
            payment_method,
            model.callback_url,
        )
        .await
    {
        Ok(renewal) => (StatusCode::CREATED, Json(renewal)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn cancel_subscription(
    State(usecase): State<Arc<PgPaymentUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(subscription_id): Path<Uuid>,
    ValidatedJson(model): ValidatedJson<CancelSubscriptionModel>,
) -> impl IntoResponse {
    match usecase
        .cancel_subscription(subscription_id, user_id, model)
        .await
    {
        Ok(subscription) => Json(subscription).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// The gateway sends the topic and payment id as query parameters, as
/// `type`/`data.id` or the older `topic`/`id`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    topic: Option<String>,
    #[serde(rename = "data.id")]
    data_id: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<WebhookBodyData>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookBodyData {
    id: Option<serde_json::Value>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn webhook_request(query: WebhookQuery, headers: &HeaderMap, body: &[u8]) -> GatewayWebhookRequest {
    let body: WebhookBody = serde_json::from_slice(body).unwrap_or_default();
    let body_id = body.data.and_then(|data| data.id).map(|id| match id {
        serde_json::Value::String(id) => id,
        other => other.to_string(),
    });

    GatewayWebhookRequest {
        topic: query.kind.or(query.topic).or(body.kind),
        data_id: query.data_id.or(query.id).or(body_id),
        signature: header_value(headers, "x-signature"),
        request_id: header_value(headers, "x-request-id"),
    }
}

pub async fn payment_webhook(
    State(usecase): State<Arc<PgPaymentUseCase>>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = webhook_request(query, &headers, &body);
    info!(topic = ?request.topic, data_id = ?request.data_id, "payments: webhook received");

    match usecase.handle_gateway_notification(request).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn webhook_query_takes_precedence_over_body() {
        let mut headers = HeaderMap::new();
        headers.insert("x-signature", HeaderValue::from_static("ts=1,v1=abc"));
        headers.insert("x-request-id", HeaderValue::from_static("req-1"));
        let query = WebhookQuery {
            kind: Some("payment".to_string()),
            data_id: Some("123".to_string()),
            ..Default::default()
        };

        let request = webhook_request(query, &headers, br#"{"type":"other","data":{"id":"999"}}"#);

        assert_eq!(request.topic.as_deref(), Some("payment"));
        assert_eq!(request.data_id.as_deref(), Some("123"));
        assert_eq!(request.signature.as_deref(), Some("ts=1,v1=abc"));
        assert_eq!(request.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn webhook_falls_back_to_body_with_numeric_id() {
        let request = webhook_request(
            WebhookQuery::default(),
            &HeaderMap::new(),
            br#"{"type":"payment","data":{"id":4567}}"#,
        );

        assert_eq!(request.topic.as_deref(), Some("payment"));
        assert_eq!(request.data_id.as_deref(), Some("4567"));
        assert!(request.signature.is_none());
    }

    #[test]
    fn legacy_topic_and_id_are_accepted() {
        let query = WebhookQuery {
            topic: Some("merchant_order".to_string()),
            id: Some("77".to_string()),
            ..Default::default()
        };

        let request = webhook_request(query, &HeaderMap::new(), b"");

        assert_eq!(request.topic.as_deref(), Some("merchant_order"));
        assert_eq!(request.data_id.as_deref(), Some("77"));
    }
}
