use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::notification_outbox},
};
use domain::{
    entities::notification_outbox::{InsertOutboxMessageEntity, OutboxMessageEntity},
    repositories::notification_outbox::NotificationOutboxRepository,
    value_objects::enums::notification_kinds::OutboxStatus,
};

pub struct NotificationOutboxPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl NotificationOutboxPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl NotificationOutboxRepository for NotificationOutboxPostgres {
    async fn enqueue(&self, insert_message_entity: InsertOutboxMessageEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let id = insert_into(notification_outbox::table)
            .values(&insert_message_entity)
            .returning(notification_outbox::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(id)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let claimed = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let due = notification_outbox::status
                .eq(OutboxStatus::Pending.as_str())
                .and(notification_outbox::next_attempt_at.le(now));
            let abandoned = notification_outbox::status
                .eq(OutboxStatus::Sending.as_str())
                .and(notification_outbox::claimed_at.le(stale_before));

            let due_ids = notification_outbox::table
                .filter(due.or(abandoned))
                .order(notification_outbox::next_attempt_at.asc())
                .limit(limit)
                .select(notification_outbox::id)
                .for_update()
                .skip_locked()
                .load::<Uuid>(conn)?;

            if due_ids.is_empty() {
                return Ok(Vec::new());
            }

            update(notification_outbox::table)
                .filter(notification_outbox::id.eq_any(&due_ids))
                .set((
                    notification_outbox::status.eq(OutboxStatus::Sending.as_str()),
                    notification_outbox::claimed_at.eq(Some(now)),
                ))
                .returning(OutboxMessageEntity::as_returning())
                .get_results::<OutboxMessageEntity>(conn)
        })?;

        Ok(claimed)
    }

    async fn mark_delivered(&self, message_id: Uuid, delivered_at: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(notification_outbox::table)
            .filter(notification_outbox::id.eq(message_id))
            .set((
                notification_outbox::status.eq(OutboxStatus::Delivered.as_str()),
                notification_outbox::attempts.eq(notification_outbox::attempts + 1),
                notification_outbox::delivered_at.eq(Some(delivered_at)),
                notification_outbox::last_error.eq(None::<String>),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn reschedule(
        &self,
        message_id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        error: String,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(notification_outbox::table)
            .filter(notification_outbox::id.eq(message_id))
            .set((
                notification_outbox::status.eq(OutboxStatus::Pending.as_str()),
                notification_outbox::attempts.eq(attempts),
                notification_outbox::next_attempt_at.eq(next_attempt_at),
                notification_outbox::last_error.eq(Some(error)),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_dead(&self, message_id: Uuid, attempts: i32, error: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(notification_outbox::table)
            .filter(notification_outbox::id.eq(message_id))
            .set((
                notification_outbox::status.eq(OutboxStatus::Dead.as_str()),
                notification_outbox::attempts.eq(attempts),
                notification_outbox::last_error.eq(Some(error)),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
