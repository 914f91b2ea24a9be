use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

/// Ownership lookups for checkout, and promotion of a paid listing to
/// approved and featured.
#[automock]
#[async_trait]
pub trait ListingActivationRepository {
    async fn business_owner(&self, business_id: Uuid) -> Result<Option<Uuid>>;
    async fn professional_owner(&self, professional_id: Uuid) -> Result<Option<Uuid>>;
    async fn activate_business(&self, business_id: Uuid) -> Result<()>;
    async fn activate_professional(&self, professional_id: Uuid) -> Result<()>;
}
