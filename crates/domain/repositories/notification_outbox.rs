use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::notification_outbox::{
    InsertOutboxMessageEntity, OutboxMessageEntity,
};

#[automock]
#[async_trait]
pub trait NotificationOutboxRepository {
    async fn enqueue(&self, insert_message_entity: InsertOutboxMessageEntity) -> Result<Uuid>;
    /// Locks up to `limit` due rows and marks them as being sent. Rows still
    /// `sending` from a claim made before `stale_before` are taken over too.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxMessageEntity>>;
    async fn mark_delivered(&self, message_id: Uuid, delivered_at: DateTime<Utc>) -> Result<()>;
    async fn reschedule(
        &self,
        message_id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        error: String,
    ) -> Result<()>;
    async fn mark_dead(&self, message_id: Uuid, attempts: i32, error: String) -> Result<()>;
}
