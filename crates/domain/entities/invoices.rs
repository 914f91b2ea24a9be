use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::invoices;

/// Unique constraint that keeps a payment to a single invoice.
pub const ONE_INVOICE_PER_PAYMENT: &str = "invoices_payment_id_key";

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoices)]
pub struct InvoiceEntity {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: String,
    pub amount_minor: i32,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub payment_id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: String,
    pub amount_minor: i32,
    pub issued_at: DateTime<Utc>,
}

impl InsertInvoiceEntity {
    /// `INV-<unix millis>-<first 8 hex digits of the payment id>`.
    pub fn invoice_number(payment_id: Uuid, issued_at: DateTime<Utc>) -> String {
        let payment = payment_id.simple().to_string();
        format!(
            "INV-{}-{}",
            issued_at.timestamp_millis(),
            payment[..8].to_ascii_uppercase()
        )
    }
}
