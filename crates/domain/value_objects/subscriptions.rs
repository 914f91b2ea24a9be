use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::{
    entities::{invoices::InvoiceEntity, subscriptions::SubscriptionEntity},
    value_objects::{
        enums::{payment_methods::PaymentMethod, subscription_statuses::SubscriptionStatus},
        validation::{invalid, known_payment_method, not_blank},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "single_listing_target", skip_on_field_errors = false))]
pub struct CreatePreferenceModel {
    pub plan_id: Uuid,
    #[validate(custom(function = "known_payment_method"))]
    pub payment_method: String,
    #[validate(url)]
    pub callback_url: Option<String>,
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub card_token: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 64))]
    pub coupon_code: Option<String>,
}

fn single_listing_target(model: &CreatePreferenceModel) -> Result<(), ValidationError> {
    if model.business_id.is_some() && model.professional_id.is_some() {
        return Err(invalid(
            "business_id",
            "only one of business_id or professional_id may be set",
        ));
    }
    Ok(())
}

/// Checkout input once the caller and defaults are known.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePreferenceCommand {
    pub plan_id: Uuid,
    pub user_id: Uuid,
    pub callback_url: String,
    pub payment_method: PaymentMethod,
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub card_token: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreferenceDto {
    pub preference_id: String,
    pub init_point: String,
    pub subscription_id: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenewalDto {
    pub preference_id: String,
    pub init_point: String,
    pub subscription_id: Uuid,
    pub projected_ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenewSubscriptionModel {
    #[validate(custom(function = "known_payment_method"))]
    pub payment_method: String,
    #[validate(url)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "reason_with_feedback", skip_on_field_errors = false))]
pub struct CancelSubscriptionModel {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub reason: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub feedback: Option<String>,
}

fn reason_with_feedback(model: &CancelSubscriptionModel) -> Result<(), ValidationError> {
    if model.feedback.is_some() && model.reason.is_none() {
        return Err(invalid("reason", "is required when feedback is given"));
    }
    Ok(())
}

/// Payment state pushed by (or fetched from) the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub id: String,
    pub status: String,
    pub external_reference: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub success: bool,
    pub duplicate: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub auto_renew: bool,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionEntity> for SubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            status: value.status(),
            id: value.id,
            plan_id: value.plan_id,
            business_id: value.business_id,
            professional_id: value.professional_id,
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            auto_renew: value.auto_renew,
            canceled_at: value.canceled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InvoiceDto {
    pub id: Uuid,
    pub invoice_number: String,
    pub subscription_id: Uuid,
    pub amount_minor: i32,
    pub issued_at: DateTime<Utc>,
}

impl From<InvoiceEntity> for InvoiceDto {
    fn from(value: InvoiceEntity) -> Self {
        Self {
            id: value.id,
            invoice_number: value.invoice_number,
            subscription_id: value.subscription_id,
            amount_minor: value.amount_minor,
            issued_at: value.issued_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpiringSubscriptionsReport {
    pub checked: usize,
    pub notified: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutoRenewalOutcome {
    Renewed { preference_id: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutoRenewalResult {
    pub subscription_id: Uuid,
    #[serde(flatten)]
    pub outcome: AutoRenewalOutcome,
}
