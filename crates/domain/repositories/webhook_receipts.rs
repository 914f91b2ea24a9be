use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait WebhookReceiptRepository {
    async fn exists(&self, source: String, event_key: String) -> Result<bool>;
    /// Recording an already known key is a no-op.
    async fn record(&self, source: String, event_key: String) -> Result<()>;
}
