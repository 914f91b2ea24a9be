use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity},
    repositories::{notification_outbox::NotificationOutboxRepository, users::UserRepository},
    value_objects::{
        enums::{user_roles::UserRole, user_statuses::UserStatus},
        notifications::OutboundNotification,
        users::ProviderUserProfile,
    },
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::errors::{UseCaseError, UseCaseResult};

/// Event envelope posted by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: IdentityEventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityEventData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ProviderEmailAddress>,
    pub primary_email_address_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEmailAddress {
    pub id: Option<String>,
    pub email_address: String,
}

impl IdentityEventData {
    pub fn profile(&self) -> ProviderUserProfile {
        let primary = self
            .primary_email_address_id
            .as_deref()
            .and_then(|primary| {
                self.email_addresses
                    .iter()
                    .find(|address| address.id.as_deref() == Some(primary))
            })
            .or_else(|| self.email_addresses.first());

        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        ProviderUserProfile {
            external_id: self.id.clone(),
            email: primary.map(|address| address.email_address.trim().to_ascii_lowercase()),
            name: (!name.is_empty()).then_some(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "user_id", rename_all = "snake_case")]
pub enum SyncOutcome {
    Created(Uuid),
    Linked(Uuid),
    Updated(Uuid),
    Deactivated(Uuid),
    Ignored,
}

/// Finds the local user for a provider profile by external id, then by
/// email (storing the external id), and creates one as a last resort.
pub async fn link_or_create_user<U, O>(
    user_repo: &U,
    outbox_repo: &O,
    profile: &ProviderUserProfile,
) -> UseCaseResult<(UserEntity, SyncOutcome)>
where
    U: UserRepository + Send + Sync + ?Sized,
    O: NotificationOutboxRepository + Send + Sync + ?Sized,
{
    if let Some(user) = user_repo
        .find_by_external_id(profile.external_id.clone())
        .await
        .map_err(internal("find by external id"))?
    {
        return Ok((user, SyncOutcome::Ignored));
    }

    let email = profile
        .email
        .clone()
        .ok_or_else(|| UseCaseError::BadRequest("identity has no email address".to_string()))?;

    if let Some(user) = user_repo
        .find_by_email(email.clone())
        .await
        .map_err(internal("find by email"))?
    {
        let linked = user_repo
            .update(
                user.id,
                UpdateUserEntity {
                    external_id: Some(profile.external_id.clone()),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| UseCaseError::from_write(err, "external id already linked"))?;
        info!(user_id = %linked.id, "identity: linked existing user to provider account");
        return Ok((linked.clone(), SyncOutcome::Linked(linked.id)));
    }

    let name = profile
        .name
        .clone()
        .unwrap_or_else(|| email.split('@').next().unwrap_or("user").to_string());
    let created = user_repo
        .create(InsertUserEntity {
            external_id: Some(profile.external_id.clone()),
            name: name.clone(),
            email: email.clone(),
            role: UserRole::User.as_str().to_string(),
            status: UserStatus::Approved.as_str().to_string(),
            is_active: true,
        })
        .await
        .map_err(|err| UseCaseError::from_write(err, "user already exists"))?;

    if let Err(err) = outbox_repo
        .enqueue(OutboundNotification::welcome(&email, &name).to_entity(Utc::now()))
        .await
    {
        error!(user_id = %created.id, db_error = ?err, "identity: failed to enqueue welcome email");
    }

    info!(user_id = %created.id, "identity: created user from provider account");
    Ok((created.clone(), SyncOutcome::Created(created.id)))
}

fn internal(action: &'static str) -> impl Fn(anyhow::Error) -> UseCaseError {
    move |err| {
        error!(action, db_error = ?err, "identity: user lookup failed");
        UseCaseError::Internal(err)
    }
}

/// Applies identity-provider user lifecycle events to local users.
pub struct IdentitySyncUseCase<U, O>
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    outbox_repo: Arc<O>,
}

impl<U, O> IdentitySyncUseCase<U, O>
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, outbox_repo: Arc<O>) -> Self {
        Self {
            user_repo,
            outbox_repo,
        }
    }

    pub async fn handle(&self, event: IdentityWebhookEvent) -> UseCaseResult<SyncOutcome> {
        let profile = event.data.profile();
        if profile.external_id.is_empty() {
            return Err(UseCaseError::BadRequest(
                "event has no user id".to_string(),
            ));
        }

        let outcome = match event.event_type.as_str() {
            "user.created" => {
                link_or_create_user(self.user_repo.as_ref(), self.outbox_repo.as_ref(), &profile)
                    .await?
                    .1
            }
            "user.updated" => self.update(&profile).await?,
            "user.deleted" => self.deactivate(&profile.external_id).await?,
            other => {
                info!(event_type = other, "identity: ignoring webhook event");
                SyncOutcome::Ignored
            }
        };

        info!(event_type = %event.event_type, outcome = ?outcome, "identity: webhook applied");
        Ok(outcome)
    }

    async fn update(&self, profile: &ProviderUserProfile) -> UseCaseResult<SyncOutcome> {
        let Some(user) = self.find(&profile.external_id).await? else {
            warn!(external_id = %profile.external_id, "identity: update for unknown user");
            return Ok(SyncOutcome::Ignored);
        };

        let user = self
            .user_repo
            .update(
                user.id,
                UpdateUserEntity {
                    name: profile.name.clone(),
                    email: profile.email.clone(),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| UseCaseError::from_write(err, "email already in use"))?;

        Ok(SyncOutcome::Updated(user.id))
    }

    async fn deactivate(&self, external_id: &str) -> UseCaseResult<SyncOutcome> {
        let Some(user) = self.find(external_id).await? else {
            return Ok(SyncOutcome::Ignored);
        };

        self.user_repo
            .update(
                user.id,
                UpdateUserEntity {
                    is_active: Some(false),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(internal("deactivate"))?;

        Ok(SyncOutcome::Deactivated(user.id))
    }

    async fn find(&self, external_id: &str) -> UseCaseResult<Option<UserEntity>> {
        self.user_repo
            .find_by_external_id(external_id.to_string())
            .await
            .map_err(internal("find by external id"))
    }
}
