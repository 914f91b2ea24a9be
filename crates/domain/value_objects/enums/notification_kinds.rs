use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    PaymentConfirmed,
    SubscriptionCanceled,
    SubscriptionExpiring,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Welcome => "welcome",
            NotificationKind::PaymentConfirmed => "payment_confirmed",
            NotificationKind::SubscriptionCanceled => "subscription_canceled",
            NotificationKind::SubscriptionExpiring => "subscription_expiring",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "welcome" => Some(NotificationKind::Welcome),
            "payment_confirmed" => Some(NotificationKind::PaymentConfirmed),
            "subscription_canceled" => Some(NotificationKind::SubscriptionCanceled),
            "subscription_expiring" => Some(NotificationKind::SubscriptionExpiring),
            _ => None,
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery state of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sending,
    Delivered,
    Dead,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sending => "sending",
            OutboxStatus::Delivered => "delivered",
            OutboxStatus::Dead => "dead",
        }
    }
}
