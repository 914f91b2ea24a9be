use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::notification_outbox::OutboxMessageEntity,
    repositories::mailer::EmailMessage,
    value_objects::enums::notification_kinds::NotificationKind,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct WelcomePayload {
    name: String,
}

#[derive(Deserialize)]
struct PaymentConfirmedPayload {
    plan_name: String,
    invoice_number: String,
    amount_minor: i64,
    currency: String,
}

#[derive(Deserialize)]
struct PlanPayload {
    plan_name: String,
}

#[derive(Deserialize)]
struct ExpiringPayload {
    plan_name: String,
    ends_at: DateTime<Utc>,
}

/// Renders an outbox row into a plain-text email. Fails on an unknown kind
/// or a payload that does not match its kind.
pub fn render(message: &OutboxMessageEntity) -> Result<EmailMessage> {
    let kind = NotificationKind::from_str(&message.kind)
        .with_context(|| format!("unknown notification kind {}", message.kind))?;

    let (subject, text) = match kind {
        NotificationKind::Welcome => {
            let payload: WelcomePayload = payload(message)?;
            (
                "Welcome to the marketplace".to_string(),
                format!(
                    "Hi {},\n\nYour account is ready. You can now publish your business, \
                     professional profile or job offers.\n",
                    payload.name
                ),
            )
        }
        NotificationKind::PaymentConfirmed => {
            let payload: PaymentConfirmedPayload = payload(message)?;
            (
                format!("Payment confirmed: {}", payload.plan_name),
                format!(
                    "We received your payment of {} for the {} plan.\n\
                     Invoice number: {}\n",
                    format_amount(payload.amount_minor, &payload.currency),
                    payload.plan_name,
                    payload.invoice_number
                ),
            )
        }
        NotificationKind::SubscriptionCanceled => {
            let payload: PlanPayload = payload(message)?;
            (
                format!("Subscription canceled: {}", payload.plan_name),
                format!(
                    "Your {} subscription was canceled and will not renew.\n",
                    payload.plan_name
                ),
            )
        }
        NotificationKind::SubscriptionExpiring => {
            let payload: ExpiringPayload = payload(message)?;
            (
                format!("Your {} subscription is ending soon", payload.plan_name),
                format!(
                    "Your {} subscription ends on {}. Renew it to keep your listing visible.\n",
                    payload.plan_name,
                    payload.ends_at.format("%Y-%m-%d")
                ),
            )
        }
    };

    Ok(EmailMessage {
        to: message.recipient.clone(),
        subject,
        text,
    })
}

fn payload<T: for<'de> Deserialize<'de>>(message: &OutboxMessageEntity) -> Result<T> {
    serde_json::from_value(message.payload.clone())
        .with_context(|| format!("invalid {} payload", message.kind))
}

/// `12345, "BRL"` renders as `BRL 123.45`.
pub fn format_amount(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{currency} {sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn message(kind: &str, payload: serde_json::Value) -> OutboxMessageEntity {
        OutboxMessageEntity {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            recipient: "owner@example.com".to_string(),
            payload,
            status: "sending".to_string(),
            attempts: 0,
            last_error: None,
            next_attempt_at: Utc::now(),
            claimed_at: None,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }

    #[test]
    fn renders_payment_confirmation() {
        let email = render(&message(
            "payment_confirmed",
            json!({
                "plan_name": "Business Pro",
                "invoice_number": "INV-20260101-0001",
                "amount_minor": 4990,
                "currency": "BRL",
            }),
        ))
        .unwrap();

        assert_eq!(email.to, "owner@example.com");
        assert_eq!(email.subject, "Payment confirmed: Business Pro");
        assert!(email.text.contains("BRL 49.90"));
        assert!(email.text.contains("INV-20260101-0001"));
    }

    #[test]
    fn renders_expiry_notice_with_date() {
        let email = render(&message(
            "subscription_expiring",
            json!({ "plan_name": "Basic", "ends_at": "2026-03-04T10:00:00+00:00" }),
        ))
        .unwrap();

        assert!(email.text.contains("2026-03-04"));
    }

    #[test]
    fn unknown_kind_and_bad_payload_fail() {
        assert!(render(&message("sms", json!({}))).is_err());
        assert!(render(&message("welcome", json!({ "nombre": "x" }))).is_err());
    }

    #[test]
    fn formats_minor_units() {
        assert_eq!(format_amount(5, "USD"), "USD 0.05");
        assert_eq!(format_amount(-1250, "BRL"), "BRL -12.50");
    }
}
