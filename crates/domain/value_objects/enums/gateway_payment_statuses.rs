use super::{payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus};

/// Payment status as reported by the gateway in notifications and lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Approved,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Pending,
    InProcess,
    Other(String),
}

impl GatewayPaymentStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => GatewayPaymentStatus::Approved,
            "rejected" => GatewayPaymentStatus::Rejected,
            "cancelled" | "canceled" => GatewayPaymentStatus::Cancelled,
            "refunded" => GatewayPaymentStatus::Refunded,
            "charged_back" => GatewayPaymentStatus::ChargedBack,
            "pending" => GatewayPaymentStatus::Pending,
            "in_process" => GatewayPaymentStatus::InProcess,
            other => GatewayPaymentStatus::Other(other.to_string()),
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            GatewayPaymentStatus::Approved => PaymentStatus::Paid,
            GatewayPaymentStatus::Rejected | GatewayPaymentStatus::Cancelled => {
                PaymentStatus::Failed
            }
            GatewayPaymentStatus::Refunded | GatewayPaymentStatus::ChargedBack => {
                PaymentStatus::Refunded
            }
            GatewayPaymentStatus::Pending
            | GatewayPaymentStatus::InProcess
            | GatewayPaymentStatus::Other(_) => PaymentStatus::Pending,
        }
    }

    /// `None` keeps the subscription in its current state.
    pub fn subscription_status(&self) -> Option<SubscriptionStatus> {
        match self.payment_status() {
            PaymentStatus::Paid => Some(SubscriptionStatus::Active),
            PaymentStatus::Failed | PaymentStatus::Refunded => Some(SubscriptionStatus::Canceled),
            PaymentStatus::Pending => None,
        }
    }
}
