use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Pix,
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Boleto => "boleto",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "credit_card" => Some(PaymentMethod::CreditCard),
            "pix" => Some(PaymentMethod::Pix),
            "boleto" => Some(PaymentMethod::Boleto),
            _ => None,
        }
    }

    /// Gateway payment types hidden from the checkout so only this instrument
    /// can be used.
    pub fn excluded_payment_types(&self) -> Vec<&'static str> {
        match self {
            PaymentMethod::CreditCard => vec!["ticket", "bank_transfer", "atm"],
            PaymentMethod::Pix => vec!["credit_card", "debit_card", "ticket", "atm"],
            PaymentMethod::Boleto => vec!["credit_card", "debit_card", "bank_transfer", "atm"],
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_method_keeps_its_own_payment_type_available() {
        assert!(!PaymentMethod::CreditCard
            .excluded_payment_types()
            .contains(&"credit_card"));
        assert!(!PaymentMethod::Pix
            .excluded_payment_types()
            .contains(&"bank_transfer"));
        assert!(!PaymentMethod::Boleto.excluded_payment_types().contains(&"ticket"));
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert_eq!(PaymentMethod::from_str("paypal"), None);
        assert_eq!(PaymentMethod::from_str("pix"), Some(PaymentMethod::Pix));
    }
}
