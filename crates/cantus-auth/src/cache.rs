//! In-memory cache of group lookups keyed by caller token.
//!
//! Tokens are never stored; entries are keyed by the SHA-256 of the token.
//! Concurrent misses for the same token share a single upstream lookup, and
//! failed lookups are not cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cantus_core::{CantusError, Result};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::resolver::{GroupResolver, UserGroups};

/// Configuration for the group cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCacheConfig {
    /// How long a successful lookup is reused (default: 5 minutes).
    pub ttl: Duration,
}

impl Default for GroupCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl GroupCacheConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL for cache entries.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// One cache slot. The cell is empty while the lookup is in flight or after
/// it failed.
#[derive(Debug, Default)]
struct Slot {
    cell: OnceCell<(UserGroups, Instant)>,
}

impl Slot {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cell
            .get()
            .is_some_and(|(_, resolved_at)| resolved_at.elapsed() >= ttl)
    }
}

/// Get-or-compute cache in front of a [`GroupResolver`].
pub struct GroupCache {
    resolver: Arc<dyn GroupResolver>,
    config: GroupCacheConfig,
    entries: Mutex<HashMap<String, Arc<Slot>>>,
}

impl GroupCache {
    /// Creates a cache over `resolver`.
    pub fn new(resolver: Arc<dyn GroupResolver>, config: GroupCacheConfig) -> Self {
        Self {
            resolver,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cache configuration.
    #[must_use]
    pub const fn config(&self) -> &GroupCacheConfig {
        &self.config
    }

    /// Returns the groups for `token`, looking them up on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error. The failure is not cached.
    pub async fn get(&self, token: &str) -> Result<UserGroups> {
        let key = cache_key(token);
        let slot = self.slot(&key);

        if let Some((groups, _)) = slot.cell.get() {
            tracing::trace!("Group cache hit");
            return Ok(groups.clone());
        }

        let result = slot
            .cell
            .get_or_try_init(|| async {
                tracing::debug!("Group cache miss, resolving");
                let groups = self.resolver.resolve(token).await?;
                Ok::<_, CantusError>((groups, Instant::now()))
            })
            .await;

        match result {
            Ok((groups, _)) => Ok(groups.clone()),
            Err(e) => {
                self.discard_failed(&key, &slot);
                Err(e)
            }
        }
    }

    /// Drops the entry for `token`. Returns true if there was one.
    pub fn invalidate(&self, token: &str) -> bool {
        self.entries.lock().remove(&cache_key(token)).is_some()
    }

    /// Drops every expired or abandoned entry and returns how many went.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, slot| {
            let abandoned = slot.cell.get().is_none() && Arc::strong_count(slot) == 1;
            !(slot.is_expired(ttl) || abandoned)
        });
        before - entries.len()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns true if a live entry exists for `token`.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.entries
            .lock()
            .get(&cache_key(token))
            .is_some_and(|slot| slot.cell.initialized() && !slot.is_expired(self.config.ttl))
    }

    /// Number of entries, including in-flight and expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the live slot for `key`, replacing an expired one.
    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut entries = self.entries.lock();
        let slot = entries.entry(key.to_string()).or_default();
        if slot.is_expired(self.config.ttl) {
            tracing::debug!("Group cache entry expired");
            *slot = Arc::new(Slot::default());
        }
        Arc::clone(slot)
    }

    fn discard_failed(&self, key: &str, failed: &Arc<Slot>) {
        let mut entries = self.entries.lock();
        if entries
            .get(key)
            .is_some_and(|slot| Arc::ptr_eq(slot, failed) && !slot.cell.initialized())
        {
            entries.remove(key);
        }
    }
}

impl std::fmt::Debug for GroupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupCache")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

/// Hex SHA-256 of the token.
pub(crate) fn cache_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cantus_core::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Resolver that counts calls, optionally failing the first ones.
    struct CountingResolver {
        calls: AtomicU32,
        failures: u32,
        delay: Duration,
    }

    impl CountingResolver {
        fn new() -> Arc<Self> {
            Self::failing(0)
        }

        fn failing(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failures,
                delay: Duration::from_millis(10),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GroupResolver for CountingResolver {
        async fn resolve(&self, token: &str) -> Result<UserGroups> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(CantusError::from_status(503, "OpenShift", None));
            }
            Ok(UserGroups {
                username: format!("user-{token}"),
                groups: vec!["aurora".to_string()],
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_after_miss() {
        let resolver = CountingResolver::new();
        let cache = GroupCache::new(resolver.clone(), GroupCacheConfig::default());

        let first = cache.get("token-a").await.unwrap();
        let second = cache.get("token-a").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.username, "user-token-a");
        assert_eq!(resolver.calls(), 1);
        assert!(cache.contains("token-a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_cached_separately() {
        let resolver = CountingResolver::new();
        let cache = GroupCache::new(resolver.clone(), GroupCacheConfig::default());

        cache.get("token-a").await.unwrap();
        cache.get("token-b").await.unwrap();

        assert_eq!(resolver.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_lookup() {
        let resolver = CountingResolver::new();
        let cache = GroupCache::new(resolver.clone(), GroupCacheConfig::default());

        let (a, b, c, d) = tokio::join!(
            cache.get("token"),
            cache.get("token"),
            cache.get("token"),
            cache.get("token"),
        );

        for result in [a, b, c, d] {
            assert_eq!(result.unwrap().username, "user-token");
        }
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let resolver = CountingResolver::new();
        let cache = GroupCache::new(
            resolver.clone(),
            GroupCacheConfig::new().with_ttl(Duration::from_secs(60)),
        );

        cache.get("token").await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!cache.contains("token"));

        cache.get("token").await.unwrap();
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_not_cached() {
        let resolver = CountingResolver::failing(1);
        let cache = GroupCache::new(resolver.clone(), GroupCacheConfig::default());

        let err = cache.get("token").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(cache.is_empty());

        let groups = cache.get("token").await.unwrap();
        assert_eq!(groups.groups, vec!["aurora"]);
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate() {
        let resolver = CountingResolver::new();
        let cache = GroupCache::new(resolver.clone(), GroupCacheConfig::default());

        cache.get("token").await.unwrap();
        assert!(cache.invalidate("token"));
        assert!(!cache.invalidate("token"));

        cache.get("token").await.unwrap();
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let resolver = CountingResolver::new();
        let cache = GroupCache::new(
            resolver,
            GroupCacheConfig::new().with_ttl(Duration::from_secs(60)),
        );

        cache.get("old").await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.get("new").await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.contains("new"));
        assert!(!cache.contains("old"));
    }

    #[test]
    fn test_keys_are_token_digests() {
        let key = cache_key("secret-token");
        assert_eq!(key.len(), 64);
        assert!(!key.contains("secret"));
        assert_eq!(key, cache_key("secret-token"));
        assert_ne!(key, cache_key("other-token"));
    }
}
