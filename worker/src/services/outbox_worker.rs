use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::notification_outbox::OutboxMessageEntity,
    repositories::{mailer::Mailer, notification_outbox::NotificationOutboxRepository},
};
use tracing::{error, info, warn};

use super::email_templates;
use crate::config::config_model::Outbox;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub claimed: usize,
    pub delivered: usize,
    pub rescheduled: usize,
    pub dead: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Rescheduled,
    Dead,
}

/// Drains the notification outbox through the mailer.
pub struct OutboxWorker<O, M>
where
    O: NotificationOutboxRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    outbox_repo: Arc<O>,
    mailer: Arc<M>,
    settings: Outbox,
}

impl<O, M> OutboxWorker<O, M>
where
    O: NotificationOutboxRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    pub fn new(outbox_repo: Arc<O>, mailer: Arc<M>, settings: Outbox) -> Self {
        Self {
            outbox_repo,
            mailer,
            settings,
        }
    }

    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!(
            poll_interval_secs = self.settings.poll_interval_secs,
            batch_size = self.settings.batch_size,
            claim_lease_secs = self.settings.claim_lease_secs,
            "outbox: worker started"
        );

        loop {
            match self.process_batch(Utc::now()).await {
                Ok(report) if report.claimed > 0 => info!(?report, "outbox: batch processed"),
                Ok(_) => {}
                Err(e) => error!("outbox: error while claiming due messages: {}", e),
            }

            tokio::time::sleep(Duration::from_secs(self.settings.poll_interval_secs)).await;
        }
    }

    pub async fn process_batch(&self, now: DateTime<Utc>) -> Result<BatchReport> {
        let stale_before = now - chrono::Duration::seconds(self.settings.claim_lease_secs);
        let messages = self
            .outbox_repo
            .claim_due(now, stale_before, self.settings.batch_size)
            .await?;

        let mut report = BatchReport {
            claimed: messages.len(),
            ..Default::default()
        };

        for message in messages {
            match self.deliver(&message, now).await {
                Ok(Delivery::Delivered) => report.delivered += 1,
                Ok(Delivery::Rescheduled) => report.rescheduled += 1,
                Ok(Delivery::Dead) => report.dead += 1,
                Err(e) => error!(
                    message_id = %message.id,
                    db_error = ?e,
                    "outbox: failed to record delivery outcome"
                ),
            }
        }

        Ok(report)
    }

    async fn deliver(&self, message: &OutboxMessageEntity, now: DateTime<Utc>) -> Result<Delivery> {
        let attempts = message.attempts + 1;

        // A message that cannot be rendered never will be.
        let email = match email_templates::render(message) {
            Ok(email) => email,
            Err(e) => {
                error!(message_id = %message.id, kind = %message.kind, error = ?e, "outbox: undeliverable message");
                self.outbox_repo
                    .mark_dead(message.id, attempts, format!("{e:#}"))
                    .await?;
                return Ok(Delivery::Dead);
            }
        };

        let error = match self.mailer.send(email).await {
            Ok(()) => {
                self.outbox_repo.mark_delivered(message.id, now).await?;
                info!(message_id = %message.id, kind = %message.kind, "outbox: delivered");
                return Ok(Delivery::Delivered);
            }
            Err(e) => format!("{e:#}"),
        };

        if attempts >= self.settings.max_attempts {
            error!(message_id = %message.id, attempts, error = %error, "outbox: giving up on message");
            self.outbox_repo.mark_dead(message.id, attempts, error).await?;
            return Ok(Delivery::Dead);
        }

        let next_attempt_at = now + backoff(self.settings.backoff_base_secs, message.attempts);
        warn!(
            message_id = %message.id,
            attempts,
            %next_attempt_at,
            error = %error,
            "outbox: delivery failed, rescheduled"
        );
        self.outbox_repo
            .reschedule(message.id, attempts, next_attempt_at, error)
            .await?;
        Ok(Delivery::Rescheduled)
    }
}

/// `base * 2^attempts`, where `attempts` counts the failures before this one.
pub fn backoff(base_secs: i64, attempts: i32) -> chrono::Duration {
    let factor = 2i64.checked_pow(attempts.max(0) as u32).unwrap_or(i64::MAX);
    let secs = base_secs.saturating_mul(factor).min(MAX_BACKOFF_SECS);
    chrono::Duration::seconds(secs)
}

const MAX_BACKOFF_SECS: i64 = 7 * 24 * 60 * 60;
