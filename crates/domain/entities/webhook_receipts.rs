use diesel::prelude::*;

use crate::infra::db::postgres::schema::webhook_receipts;

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = webhook_receipts)]
pub struct InsertWebhookReceiptEntity {
    pub source: String,
    pub event_key: String,
}
