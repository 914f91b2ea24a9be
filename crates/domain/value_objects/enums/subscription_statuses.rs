use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    PendingPayment,
    Active,
    Canceled,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::PendingPayment => "pending_payment",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Unknown values read back from storage are treated as canceled so they
    /// never count as a live subscription.
    pub fn from_str(value: &str) -> Self {
        match value {
            "pending_payment" => SubscriptionStatus::PendingPayment,
            "active" => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Canceled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled)
    }

    /// Initial status for a subscription created at checkout.
    pub fn initial(eager_activation: bool) -> Self {
        if eager_activation {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::PendingPayment
        }
    }
}
