use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, dsl::exists, insert_into, prelude::*, select};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::webhook_receipts},
};
use domain::{
    entities::webhook_receipts::InsertWebhookReceiptEntity,
    repositories::webhook_receipts::WebhookReceiptRepository,
};

pub struct WebhookReceiptPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl WebhookReceiptPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WebhookReceiptRepository for WebhookReceiptPostgres {
    async fn exists(&self, source: String, event_key: String) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(
            webhook_receipts::table
                .filter(webhook_receipts::source.eq(source))
                .filter(webhook_receipts::event_key.eq(event_key)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn record(&self, source: String, event_key: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(webhook_receipts::table)
            .values(&InsertWebhookReceiptEntity { source, event_key })
            .on_conflict((webhook_receipts::source, webhook_receipts::event_key))
            .do_nothing()
            .execute(&mut conn)?;

        Ok(())
    }
}
