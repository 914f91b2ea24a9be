use std::fmt::Display;

use thiserror::Error;
use uuid::Uuid;

/// Correlates a gateway payment with the subscription that created it.
///
/// Checkout payments use `sub_<subscription id>`; renewal payments use
/// `renew_<subscription id>_<unix seconds>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalReference {
    Subscription(Uuid),
    Renewal { subscription_id: Uuid, issued_at: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid external reference: {0}")]
pub struct InvalidExternalReference(pub String);

impl ExternalReference {
    pub fn parse(raw: &str) -> Result<Self, InvalidExternalReference> {
        let invalid = || InvalidExternalReference(raw.to_string());

        if let Some(rest) = raw.strip_prefix("sub_") {
            let id = Uuid::parse_str(rest).map_err(|_| invalid())?;
            return Ok(ExternalReference::Subscription(id));
        }

        if let Some(rest) = raw.strip_prefix("renew_") {
            let (id, issued_at) = rest.rsplit_once('_').ok_or_else(invalid)?;
            let subscription_id = Uuid::parse_str(id).map_err(|_| invalid())?;
            let issued_at = issued_at.parse::<i64>().map_err(|_| invalid())?;
            return Ok(ExternalReference::Renewal {
                subscription_id,
                issued_at,
            });
        }

        Err(invalid())
    }

    pub fn subscription_id(&self) -> Uuid {
        match self {
            ExternalReference::Subscription(id) => *id,
            ExternalReference::Renewal {
                subscription_id, ..
            } => *subscription_id,
        }
    }

    pub fn is_renewal(&self) -> bool {
        matches!(self, ExternalReference::Renewal { .. })
    }
}

impl Display for ExternalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalReference::Subscription(id) => write!(f, "sub_{id}"),
            ExternalReference::Renewal {
                subscription_id,
                issued_at,
            } => write!(f, "renew_{subscription_id}_{issued_at}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkout_and_renewal_references() {
        let id = Uuid::new_v4();

        assert_eq!(
            ExternalReference::parse(&format!("sub_{id}")),
            Ok(ExternalReference::Subscription(id))
        );

        let renewal = ExternalReference::parse(&format!("renew_{id}_1767225600")).unwrap();
        assert_eq!(renewal.subscription_id(), id);
        assert!(renewal.is_renewal());
        assert_eq!(renewal.to_string(), format!("renew_{id}_1767225600"));
    }

    #[test]
    fn rejects_malformed_references() {
        for raw in ["", "sub_", "sub_not-a-uuid", "order_123", "renew_abc", "renew_{}_x"] {
            assert!(ExternalReference::parse(raw).is_err(), "{raw}");
        }
    }
}
