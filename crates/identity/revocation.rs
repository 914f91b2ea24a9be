use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn is_revoked(&self, token: &str) -> bool;
    async fn revoke(&self, token: &str, ttl: Duration);
}

/// Process-local revocation list keyed by token digest.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn is_revoked(&self, token: &str) -> bool {
        let key = Self::digest(token);
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };

        match entries.get(&key) {
            Some(expires_at) if *expires_at > Instant::now() => true,
            Some(_) => {
                entries.remove(&key);
                false
            }
            None => false,
        }
    }

    async fn revoke(&self, token: &str, ttl: Duration) {
        let now = Instant::now();
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, expires_at| *expires_at > now);
            entries.insert(Self::digest(token), now + ttl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_token_is_rejected_until_ttl_elapses() {
        let store = InMemoryRevocationStore::new();
        assert!(!store.is_revoked("token-a").await);

        store.revoke("token-a", Duration::from_millis(30)).await;
        assert!(store.is_revoked("token-a").await);
        assert!(!store.is_revoked("token-b").await);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!store.is_revoked("token-a").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn revoking_prunes_expired_entries() {
        let store = InMemoryRevocationStore::new();
        store.revoke("short", Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.revoke("long", Duration::from_secs(60)).await;

        assert_eq!(store.len(), 1);
    }
}
