use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub e: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn decoding_key(&self, kid: &str) -> Result<Option<DecodingKey>> {
        let Some(jwk) = self
            .keys
            .iter()
            .find(|jwk| jwk.kty == "RSA" && jwk.kid.as_deref() == Some(kid))
        else {
            return Ok(None);
        };

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .with_context(|| format!("invalid RSA components for kid {kid}"))?;
        Ok(Some(key))
    }
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
}

/// Issuer signing keys fetched over HTTP and kept for `ttl`.
pub struct JwksCache {
    http: reqwest::Client,
    url: String,
    ttl: Duration,
    cached: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            ttl: DEFAULT_JWKS_TTL,
            cached: RwLock::new(None),
        }
    }

    pub fn with_keys(url: String, set: JwkSet) -> Self {
        Self {
            cached: RwLock::new(Some(CachedKeys {
                set,
                fetched_at: Instant::now(),
            })),
            ..Self::new(url)
        }
    }

    /// An unknown `kid` in a fresh cache is not refetched.
    pub async fn decoding_key(&self, kid: &str) -> Result<Option<DecodingKey>> {
        {
            let cached = self.cached.read().await;
            if let Some(keys) = cached.as_ref() {
                if keys.fetched_at.elapsed() < self.ttl {
                    return keys.set.decoding_key(kid);
                }
            }
        }

        let set = self.fetch().await?;
        let key = set.decoding_key(kid)?;
        *self.cached.write().await = Some(CachedKeys {
            set,
            fetched_at: Instant::now(),
        });
        Ok(key)
    }

    async fn fetch(&self) -> Result<JwkSet> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("failed to fetch JWKS")?;

        if !response.status().is_success() {
            anyhow::bail!("JWKS endpoint returned status {}", response.status());
        }

        let set: JwkSet = response.json().await.context("failed to parse JWKS")?;
        info!(key_count = set.keys.len(), "identity: JWKS refreshed");
        Ok(set)
    }
}
