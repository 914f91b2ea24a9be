use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        cancellation_reasons::InsertCancellationReasonEntity,
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn create(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;
    /// Any subscription for the business that is not canceled.
    async fn find_open_for_business(&self, business_id: Uuid)
    -> Result<Option<SubscriptionEntity>>;
    async fn find_open_for_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>>;
    async fn update_status(&self, subscription_id: Uuid, status: SubscriptionStatus)
    -> Result<()>;
    async fn extend_period(&self, subscription_id: Uuid, ends_at: DateTime<Utc>) -> Result<()>;
    /// Marks the subscription canceled and turns auto renewal off.
    async fn cancel(&self, subscription_id: Uuid, canceled_at: DateTime<Utc>) -> Result<()>;
    async fn record_cancellation_reason(
        &self,
        insert_reason_entity: InsertCancellationReasonEntity,
    ) -> Result<()>;
    async fn list_active_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;
    async fn list_auto_renewals_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;
    async fn count_active_for_plan(&self, plan_id: Uuid) -> Result<i64>;
}
