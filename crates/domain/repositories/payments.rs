use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::{
    InsertPaymentEntity, PaymentEntity, UpdatePaymentStatusEntity,
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn create(&self, insert_payment_entity: InsertPaymentEntity) -> Result<PaymentEntity>;
    async fn find_latest_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<PaymentEntity>>;
    async fn update_status(
        &self,
        payment_id: Uuid,
        changes: UpdatePaymentStatusEntity,
    ) -> Result<()>;
}
