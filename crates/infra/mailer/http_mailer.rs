use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::domain::repositories::mailer::{EmailMessage, Mailer};

#[derive(Debug, Clone)]
pub struct HttpMailerConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends plain-text email through a transactional email HTTP API.
pub struct HttpMailer {
    http: reqwest::Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    pub fn new(config: HttpMailerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&SendEmailRequest {
                from: &self.config.from,
                to: &message.to,
                subject: &message.subject,
                text: &message.text,
            })
            .send()
            .await
            .context("failed to call email API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                response_body = %body,
                "mailer: email API rejected message"
            );
            anyhow::bail!("email API returned status {status}");
        }

        info!(subject = %message.subject, "mailer: email accepted");
        Ok(())
    }
}
