use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Self-contained signed token verified locally.
    Signed,
    /// Opaque session token verified by asking the provider.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub kind: CredentialKind,
}

/// Reason a credential could not be turned into a local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityFailure {
    #[error("revoked")]
    Revoked,
    #[error("expired")]
    Expired,
    #[error("malformed")]
    Malformed,
    #[error("invalid credential")]
    Invalid,
    #[error("user not found")]
    UserNotFound,
    #[error("inactive")]
    Inactive,
    #[error("identity provider unavailable")]
    ProviderUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(ExternalIdentity),
    NotApplicable,
    /// Later verifiers may still accept the credential.
    Rejected(IdentityFailure),
    /// The credential is recognised and bad; no later verifier is asked.
    Refused(IdentityFailure),
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn verify(&self, credential: &str) -> Verification;
}

/// Tries each verifier in order. A refusal ends the walk; otherwise the last
/// rejection is reported.
#[derive(Clone, Default)]
pub struct VerifierChain {
    verifiers: Vec<Arc<dyn CredentialVerifier>>,
}

impl VerifierChain {
    pub fn new(verifiers: Vec<Arc<dyn CredentialVerifier>>) -> Self {
        Self { verifiers }
    }

    pub fn push(&mut self, verifier: Arc<dyn CredentialVerifier>) {
        self.verifiers.push(verifier);
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    pub async fn verify(&self, credential: &str) -> Result<ExternalIdentity, IdentityFailure> {
        let mut last_failure = None;

        for verifier in &self.verifiers {
            match verifier.verify(credential).await {
                Verification::Verified(identity) => {
                    debug!(
                        verifier = verifier.name(),
                        external_id = %identity.external_id,
                        "identity: credential verified"
                    );
                    return Ok(identity);
                }
                Verification::NotApplicable => continue,
                Verification::Rejected(failure) => {
                    debug!(
                        verifier = verifier.name(),
                        reason = %failure,
                        "identity: credential rejected"
                    );
                    last_failure = Some(failure);
                }
                Verification::Refused(failure) => {
                    debug!(
                        verifier = verifier.name(),
                        reason = %failure,
                        "identity: credential refused"
                    );
                    return Err(failure);
                }
            }
        }

        Err(last_failure.unwrap_or(IdentityFailure::Malformed))
    }
}
