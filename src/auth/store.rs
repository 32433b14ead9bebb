//! Live token records.
//!
//! A token is live while `access:<jti>` / `refresh:<jti>` exists in the
//! key-value store. Records carry the subject's user ID and expire on their
//! own when the token does, so revocation is a plain delete and there is no
//! sweep job.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::auth::error::{AuthError, StoreError};
use crate::auth::token::{TokenKind, TokenPair};

/// The three single-key commands the token store needs from a backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Sets `key` to `value`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Deletes `key`, returning whether it existed.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;
}

/// Redis backend. `ConnectionManager` multiplexes one connection and
/// reconnects on its own; clones share it.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}

/// In-process backend with the same expiry semantics as Redis.
///
/// Expiry follows the tokio clock, so tests can pause and advance time.
/// Reads drop the key they touch once it has expired; writes sweep the whole
/// map.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, tokio::time::Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`, if it has not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        Self::evict_if_expired(&mut entries, key);
        entries.get(key).map(|(value, _)| value.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, tokio::time::Instant)>> {
        // Every mutation is a single insert or remove.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_if_expired(
        entries: &mut HashMap<String, (String, tokio::time::Instant)>,
        key: &str,
    ) {
        let expired = entries
            .get(key)
            .map(|(_, deadline)| *deadline <= tokio::time::Instant::now())
            .unwrap_or(false);
        if expired {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = tokio::time::Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        Self::evict_if_expired(&mut entries, key);
        Ok(entries.contains_key(key))
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        Self::evict_if_expired(&mut entries, key);
        Ok(entries.remove(key).is_some())
    }
}

/// Persists, checks and revokes live token records.
///
/// Every backend call is bounded by `timeout`; a call that runs past it is
/// dropped and reported as [`AuthError::StoreUnavailable`]. Nothing is
/// retried here.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Writes the live records of both halves of `pair`.
    ///
    /// The access record is written first. If the refresh write fails the
    /// access record stays behind and the pair must be treated as not issued;
    /// the orphan simply expires with the access token.
    pub async fn persist(&self, pair: &TokenPair) -> Result<(), AuthError> {
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            let remaining = pair.expires_at(kind) - Utc::now();
            // Already expired: the validator rejects the token anyway.
            let Ok(ttl) = remaining.to_std() else {
                continue;
            };
            if ttl.is_zero() {
                continue;
            }
            let key = kind.key(pair.jti(kind));
            self.bounded(self.backend.set_ex(&key, &pair.subject, ttl))
                .await?;
        }
        Ok(())
    }

    pub async fn is_live(&self, kind: TokenKind, jti: &str) -> Result<bool, AuthError> {
        self.bounded(self.backend.exists(&kind.key(jti))).await
    }

    /// Deletes the live record immediately, whatever its remaining TTL.
    pub async fn revoke(&self, kind: TokenKind, jti: &str) -> Result<(), AuthError> {
        self.bounded(self.backend.del(&kind.key(jti))).await?;
        Ok(())
    }

    /// Deletes the live record and reports whether it was there.
    ///
    /// Exactly one of any number of concurrent callers sees `true`.
    pub async fn consume(&self, kind: TokenKind, jti: &str) -> Result<bool, AuthError> {
        self.bounded(self.backend.del(&kind.key(jti))).await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_millis()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenIssuer;
    use crate::config::AuthConfig;

    fn setup() -> (TokenIssuer, Arc<MemoryStore>, TokenStore) {
        let config = AuthConfig::with_secret("store-test-secret-with-32-or-more-bytes");
        let backend = Arc::new(MemoryStore::new());
        let store = TokenStore::new(backend.clone(), Duration::from_millis(200));
        (TokenIssuer::new(&config), backend, store)
    }

    #[actix_rt::test]
    async fn test_persist_then_revoke() {
        let (issuer, backend, store) = setup();
        let pair = issuer.issue_pair("5").unwrap();

        store.persist(&pair).await.unwrap();
        assert!(store.is_live(TokenKind::Access, &pair.access_jti).await.unwrap());
        assert!(store.is_live(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());
        assert_eq!(
            backend.get(&format!("access:{}", pair.access_jti)).as_deref(),
            Some("5")
        );

        store.revoke(TokenKind::Access, &pair.access_jti).await.unwrap();
        assert!(!store.is_live(TokenKind::Access, &pair.access_jti).await.unwrap());
        assert!(store.is_live(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());
    }

    #[actix_rt::test]
    async fn test_kinds_do_not_collide() {
        let (issuer, _, store) = setup();
        let pair = issuer.issue_pair("5").unwrap();
        store.persist(&pair).await.unwrap();

        assert!(!store.is_live(TokenKind::Refresh, &pair.access_jti).await.unwrap());
        assert!(!store.is_live(TokenKind::Access, &pair.refresh_jti).await.unwrap());
    }

    #[actix_rt::test]
    async fn test_consume_succeeds_once() {
        let (issuer, _, store) = setup();
        let pair = issuer.issue_pair("5").unwrap();
        store.persist(&pair).await.unwrap();

        assert!(store.consume(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());
        assert!(!store.consume(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_expire_with_their_tokens() {
        let (issuer, _, store) = setup();
        let pair = issuer.issue_pair("5").unwrap();
        store.persist(&pair).await.unwrap();

        tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;
        assert!(!store.is_live(TokenKind::Access, &pair.access_jti).await.unwrap());
        assert!(store.is_live(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());

        tokio::time::advance(Duration::from_secs(7 * 24 * 60 * 60)).await;
        assert!(!store.is_live(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());
    }

    #[actix_rt::test]
    async fn test_expired_pair_is_not_persisted() {
        let (issuer, backend, store) = setup();
        let pair = issuer
            .issue_pair_at("5", Utc::now() - chrono::Duration::days(8))
            .unwrap();

        store.persist(&pair).await.unwrap();
        assert!(backend.get(&TokenKind::Access.key(&pair.access_jti)).is_none());
        assert!(backend.get(&TokenKind::Refresh.key(&pair.refresh_jti)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_evict_expired_entries() {
        let (issuer, backend, store) = setup();
        let old = issuer.issue_pair("5").unwrap();
        store.persist(&old).await.unwrap();
        assert_eq!(backend.entries.lock().unwrap().len(), 2);

        tokio::time::advance(Duration::from_secs(7 * 24 * 60 * 60 + 1)).await;
        let new = issuer.issue_pair("5").unwrap();
        store.persist(&new).await.unwrap();

        let entries = backend.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains_key(&TokenKind::Refresh.key(&new.refresh_jti)));
        assert!(!entries.contains_key(&TokenKind::Refresh.key(&old.refresh_jti)));
    }

    struct HangingStore;

    #[async_trait]
    impl KeyValueStore for HangingStore {
        async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            futures::future::pending().await
        }

        async fn exists(&self, _: &str) -> Result<bool, StoreError> {
            futures::future::pending().await
        }

        async fn del(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failures_surface_as_store_unavailable() {
        let store = TokenStore::new(Arc::new(HangingStore), Duration::from_millis(200));

        assert!(matches!(
            store.is_live(TokenKind::Access, "jti").await,
            Err(AuthError::StoreUnavailable(StoreError::Timeout(200)))
        ));
        assert!(matches!(
            store.revoke(TokenKind::Access, "jti").await,
            Err(AuthError::StoreUnavailable(StoreError::Backend(_)))
        ));
    }
}
