use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{
    entities::notification_outbox::InsertOutboxMessageEntity,
    value_objects::enums::notification_kinds::{NotificationKind, OutboxStatus},
};

/// A notification waiting to be written to the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundNotification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub payload: serde_json::Value,
}

impl OutboundNotification {
    pub fn welcome(recipient: &str, name: &str) -> Self {
        Self {
            kind: NotificationKind::Welcome,
            recipient: recipient.to_string(),
            payload: json!({ "name": name }),
        }
    }

    pub fn payment_confirmed(
        recipient: &str,
        plan_name: &str,
        invoice_number: &str,
        amount_minor: i32,
        currency: &str,
    ) -> Self {
        Self {
            kind: NotificationKind::PaymentConfirmed,
            recipient: recipient.to_string(),
            payload: json!({
                "plan_name": plan_name,
                "invoice_number": invoice_number,
                "amount_minor": amount_minor,
                "currency": currency,
            }),
        }
    }

    pub fn subscription_canceled(recipient: &str, plan_name: &str) -> Self {
        Self {
            kind: NotificationKind::SubscriptionCanceled,
            recipient: recipient.to_string(),
            payload: json!({ "plan_name": plan_name }),
        }
    }

    pub fn subscription_expiring(recipient: &str, plan_name: &str, ends_at: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::SubscriptionExpiring,
            recipient: recipient.to_string(),
            payload: json!({
                "plan_name": plan_name,
                "ends_at": ends_at.to_rfc3339(),
            }),
        }
    }

    pub fn to_entity(&self, now: DateTime<Utc>) -> InsertOutboxMessageEntity {
        InsertOutboxMessageEntity {
            kind: self.kind.to_string(),
            recipient: self.recipient.clone(),
            payload: self.payload.clone(),
            status: OutboxStatus::Pending.as_str().to_string(),
            next_attempt_at: now,
        }
    }
}
