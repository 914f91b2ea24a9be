use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use serde::Deserialize;
use tracing::warn;

use super::jwks::JwksCache;
use super::verifier::{CredentialKind, CredentialVerifier, ExternalIdentity, IdentityFailure, Verification};

#[derive(Debug, Deserialize)]
struct ProviderClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub enum SigningKeys {
    SharedSecret(DecodingKey),
    Jwks(Arc<JwksCache>),
}

impl SigningKeys {
    pub fn shared_secret(secret: &str) -> Self {
        Self::SharedSecret(DecodingKey::from_secret(secret.as_bytes()))
    }
}

/// Verifies provider-issued JWTs. Tokens carrying a legacy prefix or not
/// made of three segments are left for the next strategy.
pub struct SignedTokenVerifier {
    keys: SigningKeys,
    issuer: Option<String>,
    audience: Option<String>,
    legacy_prefixes: Vec<String>,
}

impl SignedTokenVerifier {
    pub fn new(keys: SigningKeys) -> Self {
        Self {
            keys,
            issuer: None,
            audience: None,
            legacy_prefixes: Vec::new(),
        }
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_legacy_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.legacy_prefixes = prefixes;
        self
    }

    pub fn looks_signed(&self, token: &str) -> bool {
        if self
            .legacy_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && token.starts_with(prefix.as_str()))
        {
            return false;
        }

        let segments: Vec<&str> = token.split('.').collect();
        segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty())
    }

    async fn key_for(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), IdentityFailure> {
        match &self.keys {
            SigningKeys::SharedSecret(key) => Ok((key.clone(), Algorithm::HS256)),
            SigningKeys::Jwks(cache) => {
                let kid = kid.ok_or(IdentityFailure::Malformed)?;
                match cache.decoding_key(kid).await {
                    Ok(Some(key)) => Ok((key, Algorithm::RS256)),
                    Ok(None) => Err(IdentityFailure::Invalid),
                    Err(err) => {
                        warn!(error = ?err, "identity: failed to load signing keys");
                        Err(IdentityFailure::ProviderUnavailable)
                    }
                }
            }
        }
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

#[async_trait]
impl CredentialVerifier for SignedTokenVerifier {
    fn name(&self) -> &'static str {
        "signed_token"
    }

    async fn verify(&self, credential: &str) -> Verification {
        if !self.looks_signed(credential) {
            return Verification::NotApplicable;
        }

        let header = match decode_header(credential) {
            Ok(header) => header,
            Err(_) => return Verification::Rejected(IdentityFailure::Malformed),
        };

        let (key, algorithm) = match self.key_for(header.kid.as_deref()).await {
            Ok(found) => found,
            Err(failure) => return Verification::Rejected(failure),
        };

        if header.alg != algorithm {
            return Verification::Refused(IdentityFailure::Invalid);
        }

        match decode::<ProviderClaims>(credential, &key, &self.validation(algorithm)) {
            Ok(data) => Verification::Verified(ExternalIdentity {
                external_id: data.claims.sub,
                email: data.claims.email,
                name: data.claims.name,
                kind: CredentialKind::Signed,
            }),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Verification::Refused(IdentityFailure::Expired),
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidAlgorithm => Verification::Refused(IdentityFailure::Invalid),
                _ => Verification::Rejected(IdentityFailure::Malformed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    const SECRET: &str = "test-signing-secret";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        email: &'a str,
        iss: &'a str,
        exp: usize,
    }

    fn token(secret: &str, issuer: &str, exp_offset: Duration) -> String {
        let claims = Claims {
            sub: "user_2abc",
            email: "ana@example.com",
            iss: issuer,
            exp: (Utc::now() + exp_offset).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> SignedTokenVerifier {
        SignedTokenVerifier::new(SigningKeys::shared_secret(SECRET))
            .with_issuer(Some("https://issuer.test".to_string()))
            .with_legacy_prefixes(vec!["sess_".to_string()])
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let token = token(SECRET, "https://issuer.test", Duration::hours(1));

        match verifier().verify(&token).await {
            Verification::Verified(identity) => {
                assert_eq!(identity.external_id, "user_2abc");
                assert_eq!(identity.email.as_deref(), Some("ana@example.com"));
                assert_eq!(identity.kind, CredentialKind::Signed);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let token = token(SECRET, "https://issuer.test", Duration::hours(-2));
        assert_eq!(
            verifier().verify(&token).await,
            Verification::Refused(IdentityFailure::Expired)
        );
    }

    #[tokio::test]
    async fn wrong_secret_or_issuer_is_invalid() {
        let forged = token("another-secret", "https://issuer.test", Duration::hours(1));
        assert_eq!(
            verifier().verify(&forged).await,
            Verification::Refused(IdentityFailure::Invalid)
        );

        let foreign = token(SECRET, "https://elsewhere.test", Duration::hours(1));
        assert_eq!(
            verifier().verify(&foreign).await,
            Verification::Refused(IdentityFailure::Invalid)
        );
    }

    #[tokio::test]
    async fn legacy_and_opaque_tokens_are_not_applicable() {
        let verifier = verifier();
        assert_eq!(verifier.verify("sess_a.b.c").await, Verification::NotApplicable);
        assert_eq!(verifier.verify("opaque-token").await, Verification::NotApplicable);
    }

    #[tokio::test]
    async fn garbage_in_three_segments_is_malformed() {
        assert_eq!(
            verifier().verify("aaa.bbb.ccc").await,
            Verification::Rejected(IdentityFailure::Malformed)
        );
    }
}
