use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use crates::{
    domain::{
        entities::users::UserEntity,
        repositories::{notification_outbox::NotificationOutboxRepository, users::UserRepository},
        value_objects::users::ProviderUserProfile,
    },
    identity::{
        jwks::JwksCache,
        legacy_session::{HttpSessionLookup, LegacySessionVerifier},
        revocation::RevocationStore,
        signed_token::{SignedTokenVerifier, SigningKeys},
        verifier::{CredentialKind, ExternalIdentity, IdentityFailure, VerifierChain},
    },
};
use tracing::{error, info, warn};

use super::{AuthRejection, AuthUser};
use crate::{
    config::config_model::Auth,
    usecases::{errors::UseCaseError, identity_sync::link_or_create_user},
};

/// Turns a bearer credential into a local user. Object-safe so the
/// middleware can hold it without knowing the repository types.
#[async_trait]
pub trait IdentityResolution: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<AuthUser, AuthRejection>;
    async fn revoke(&self, credential: &str);
}

pub struct IdentityResolver<U, O>
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    chain: VerifierChain,
    revocations: Arc<dyn RevocationStore>,
    revocation_ttl: Duration,
    user_repo: Arc<U>,
    outbox_repo: Arc<O>,
}

impl<U, O> IdentityResolver<U, O>
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    pub fn new(
        chain: VerifierChain,
        revocations: Arc<dyn RevocationStore>,
        revocation_ttl: Duration,
        user_repo: Arc<U>,
        outbox_repo: Arc<O>,
    ) -> Self {
        Self {
            chain,
            revocations,
            revocation_ttl,
            user_repo,
            outbox_repo,
        }
    }

    async fn local_user(&self, identity: &ExternalIdentity) -> Result<UserEntity, AuthRejection> {
        match identity.kind {
            CredentialKind::Signed => {
                let profile = ProviderUserProfile {
                    external_id: identity.external_id.clone(),
                    email: identity.email.as_deref().map(str::to_ascii_lowercase),
                    name: identity.name.clone(),
                };
                link_or_create_user(self.user_repo.as_ref(), self.outbox_repo.as_ref(), &profile)
                    .await
                    .map(|(user, _)| user)
                    .map_err(|err| match err {
                        UseCaseError::BadRequest(_) => {
                            AuthRejection::Failed(IdentityFailure::UserNotFound)
                        }
                        other => {
                            error!(
                                external_id = %identity.external_id,
                                error = ?other,
                                "auth: failed to resolve local user"
                            );
                            AuthRejection::Internal
                        }
                    })
            }
            // Legacy sessions never create users.
            CredentialKind::Legacy => self
                .user_repo
                .find_by_external_id(identity.external_id.clone())
                .await
                .map_err(|err| {
                    error!(
                        external_id = %identity.external_id,
                        db_error = ?err,
                        "auth: failed to look up user"
                    );
                    AuthRejection::Internal
                })?
                .ok_or(AuthRejection::Failed(IdentityFailure::UserNotFound)),
        }
    }
}

#[async_trait]
impl<U, O> IdentityResolution for IdentityResolver<U, O>
where
    U: UserRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
{
    async fn resolve(&self, credential: &str) -> Result<AuthUser, AuthRejection> {
        if self.revocations.is_revoked(credential).await {
            return Err(AuthRejection::Failed(IdentityFailure::Revoked));
        }

        let identity = self
            .chain
            .verify(credential)
            .await
            .map_err(AuthRejection::Failed)?;

        let user = self.local_user(&identity).await?;
        if !user.is_active {
            warn!(user_id = %user.id, "auth: inactive user presented a valid credential");
            return Err(AuthRejection::Failed(IdentityFailure::Inactive));
        }

        Ok(AuthUser {
            user_id: user.id,
            external_id: identity.external_id,
            role: user.role(),
            email: user.email,
        })
    }

    async fn revoke(&self, credential: &str) {
        self.revocations.revoke(credential, self.revocation_ttl).await;
    }
}

/// Verifier strategies in the order they are tried: signed tokens first,
/// then the provider's session lookup when it is configured.
pub fn verifier_chain(auth: &Auth) -> VerifierChain {
    let mut chain = VerifierChain::default();

    let keys = match (&auth.jwt_secret, &auth.jwks_url) {
        (Some(secret), _) => Some(SigningKeys::shared_secret(secret)),
        (None, Some(url)) => Some(SigningKeys::Jwks(Arc::new(JwksCache::new(url.clone())))),
        (None, None) => None,
    };
    if let Some(keys) = keys {
        chain.push(Arc::new(
            SignedTokenVerifier::new(keys)
                .with_issuer(auth.issuer.clone())
                .with_audience(auth.audience.clone())
                .with_legacy_prefixes(auth.legacy_token_prefixes.clone()),
        ));
    }

    if let (Some(api_url), Some(secret_key)) = (&auth.legacy_api_url, &auth.legacy_secret_key) {
        let lookup = Arc::new(HttpSessionLookup::new(api_url.clone(), secret_key.clone()));
        chain.push(Arc::new(LegacySessionVerifier::new(lookup)));
    }

    if chain.is_empty() {
        warn!("auth: no credential verifier configured, every bearer credential will be rejected");
    } else {
        info!("auth: credential verifiers configured");
    }
    chain
}
