use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::repositories::constraint_violations::ConstraintViolation;

pub mod admin_stats;
pub mod blog_posts;
pub mod businesses;
pub mod invoices;
pub mod job_applications;
pub mod jobs;
pub mod listing_activation;
pub mod notification_outbox;
pub mod payments;
pub mod plans;
pub mod professionals;
pub mod reviews;
pub mod subscriptions;
pub mod users;
pub mod webhook_receipts;

/// Wraps constraint failures in [`ConstraintViolation`] so use cases can map
/// them to conflicts.
pub(crate) fn write_error(err: DieselError) -> anyhow::Error {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let constraint = info.constraint_name().unwrap_or("unknown").to_string();
            anyhow::Error::new(ConstraintViolation::Unique(constraint)).context(err.to_string())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            let constraint = info.constraint_name().unwrap_or("unknown").to_string();
            anyhow::Error::new(ConstraintViolation::ForeignKey(constraint)).context(err.to_string())
        }
        _ => anyhow::Error::new(err),
    }
}

pub(crate) fn contains_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
