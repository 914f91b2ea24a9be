use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[automock]
#[async_trait]
pub trait Mailer {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}
