use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::verifier::{CredentialKind, CredentialVerifier, ExternalIdentity, IdentityFailure, Verification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookupOutcome {
    Active(ProviderSession),
    Expired,
    Unknown,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn lookup(&self, token: String) -> Result<SessionLookupOutcome>;
}

#[derive(Serialize)]
struct VerifySessionRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct VerifySessionResponse {
    user_id: String,
    status: String,
    #[serde(default)]
    email: Option<String>,
}

/// Asks the provider's backend API whether an opaque session token is live.
pub struct HttpSessionLookup {
    http: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl HttpSessionLookup {
    pub fn new(api_url: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }
}

#[async_trait]
impl SessionLookup for HttpSessionLookup {
    async fn lookup(&self, token: String) -> Result<SessionLookupOutcome> {
        let response = self
            .http
            .post(format!("{}/v1/sessions/verify", self.api_url))
            .bearer_auth(&self.secret_key)
            .json(&VerifySessionRequest { token: &token })
            .send()
            .await
            .context("failed to call session verification API")?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                return Ok(SessionLookupOutcome::Unknown);
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(%status, body = %body, "identity: session verification failed");
                anyhow::bail!("session verification returned status {status}");
            }
        }

        let session: VerifySessionResponse = response
            .json()
            .await
            .context("failed to parse session verification response")?;

        Ok(match session.status.as_str() {
            "active" => SessionLookupOutcome::Active(ProviderSession {
                user_id: session.user_id,
                email: session.email,
            }),
            "expired" | "ended" | "revoked" | "removed" => SessionLookupOutcome::Expired,
            _ => SessionLookupOutcome::Unknown,
        })
    }
}

pub struct LegacySessionVerifier {
    lookup: Arc<dyn SessionLookup>,
}

impl LegacySessionVerifier {
    pub fn new(lookup: Arc<dyn SessionLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl CredentialVerifier for LegacySessionVerifier {
    fn name(&self) -> &'static str {
        "legacy_session"
    }

    async fn verify(&self, credential: &str) -> Verification {
        match self.lookup.lookup(credential.to_string()).await {
            Ok(SessionLookupOutcome::Active(session)) => Verification::Verified(ExternalIdentity {
                external_id: session.user_id,
                email: session.email,
                name: None,
                kind: CredentialKind::Legacy,
            }),
            Ok(SessionLookupOutcome::Expired) => Verification::Rejected(IdentityFailure::Expired),
            Ok(SessionLookupOutcome::Unknown) => Verification::Rejected(IdentityFailure::Invalid),
            Err(err) => {
                warn!(error = ?err, "identity: legacy session lookup failed");
                Verification::Rejected(IdentityFailure::ProviderUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn active_session_yields_legacy_identity() {
        let mut lookup = MockSessionLookup::new();
        lookup
            .expect_lookup()
            .with(eq("sess_123".to_string()))
            .times(1)
            .returning(|_| {
                Ok(SessionLookupOutcome::Active(ProviderSession {
                    user_id: "user_9".to_string(),
                    email: None,
                }))
            });

        let verifier = LegacySessionVerifier::new(Arc::new(lookup));
        match verifier.verify("sess_123").await {
            Verification::Verified(identity) => {
                assert_eq!(identity.external_id, "user_9");
                assert_eq!(identity.kind, CredentialKind::Legacy);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_lookup_outcomes_to_failures() {
        let mut lookup = MockSessionLookup::new();
        lookup
            .expect_lookup()
            .with(eq("old".to_string()))
            .returning(|_| Ok(SessionLookupOutcome::Expired));
        lookup
            .expect_lookup()
            .with(eq("bogus".to_string()))
            .returning(|_| Ok(SessionLookupOutcome::Unknown));
        lookup
            .expect_lookup()
            .with(eq("down".to_string()))
            .returning(|_| Err(anyhow::anyhow!("connection refused")));

        let verifier = LegacySessionVerifier::new(Arc::new(lookup));
        assert_eq!(
            verifier.verify("old").await,
            Verification::Rejected(IdentityFailure::Expired)
        );
        assert_eq!(
            verifier.verify("bogus").await,
            Verification::Rejected(IdentityFailure::Invalid)
        );
        assert_eq!(
            verifier.verify("down").await,
            Verification::Rejected(IdentityFailure::ProviderUnavailable)
        );
    }
}
