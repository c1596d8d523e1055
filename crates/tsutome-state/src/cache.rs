//! A small keyed cache for server query results.
//!
//! Values are stored type-erased (`Arc<dyn Any>`) so one cache can hold
//! the session probe, the quest list and the training list side by side.
//! Readers ask for the type they expect; a mismatch reads as a miss.
//!
//! # Epochs and generations
//!
//! [`QueryCache::clear`] bumps an epoch counter and
//! [`QueryCache::invalidate`] bumps the generation of one key. A
//! [`QueryCache::fetch`] that started before either bump still returns
//! its value to its caller but does not store it. Data loaded for one
//! player never lands in the cache after the identity changed, and a
//! load that raced an invalidation never passes for fresh.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

/// The queries the client caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The session probe, stored as `Option<PublicPlayer>`.
    Me,
    /// Active quests (`Vec<Tsutome>`).
    Tsutomes,
    /// Training routines (`Vec<Shuren>`).
    Shurens,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Me => write!(f, "me"),
            QueryKey::Tsutomes => write!(f, "tsutomes"),
            QueryKey::Shurens => write!(f, "shurens"),
        }
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, Entry>,
    epoch: u64,
    generations: HashMap<QueryKey, u64>,
}

impl CacheInner {
    /// Identifies "the cache as `key` saw it" for a load starting now.
    fn stamp(&self, key: QueryKey) -> (u64, u64) {
        (self.epoch, self.generations.get(&key).copied().unwrap_or(0))
    }
}

/// Shared handle to the query cache. Clones see the same entries.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `key`, if present and of type `V`.
    pub fn get<V: Any + Send + Sync>(&self, key: QueryKey) -> Option<Arc<V>> {
        let entry = self.inner.lock().entries.get(&key).cloned()?;
        entry.downcast::<V>().ok()
    }

    /// Stores `value` under `key`, replacing whatever was there.
    pub fn insert<V: Any + Send + Sync>(&self, key: QueryKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.inner.lock().entries.insert(key, value.clone());
        value
    }

    /// Drops one entry. Returns `true` if something was removed.
    ///
    /// Invalidation is lazy: the next [`fetch`](Self::fetch) of `key`
    /// reloads it, and loads of `key` already in flight will not store
    /// their result.
    pub fn invalidate(&self, key: QueryKey) -> bool {
        let mut inner = self.inner.lock();
        *inner.generations.entry(key).or_default() += 1;
        let removed = inner.entries.remove(&key).is_some();
        if removed {
            tracing::trace!(%key, "query invalidated");
        }
        removed
    }

    /// Drops every entry and starts a new epoch.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.epoch += 1;
        tracing::debug!(epoch = inner.epoch, "query cache cleared");
    }

    pub fn contains(&self, key: QueryKey) -> bool {
        self.inner.lock().entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current epoch; starts at 0 and grows by one per [`clear`](Self::clear).
    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Returns the cached value for `key`, or runs `loader` and caches
    /// its result.
    ///
    /// Errors are returned as-is and never cached. Concurrent misses on
    /// the same key each run their loader; the last one to finish wins.
    pub async fn fetch<V, E, F, Fut>(&self, key: QueryKey, loader: F) -> Result<Arc<V>, E>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get::<V>(key) {
            tracing::trace!(%key, "query cache hit");
            return Ok(hit);
        }

        let stamp = self.inner.lock().stamp(key);
        let value = Arc::new(loader().await?);

        let mut inner = self.inner.lock();
        if inner.stamp(key) == stamp {
            inner.entries.insert(key, value.clone());
        } else {
            tracing::debug!(%key, "dropping result loaded before an invalidation");
        }
        Ok(value)
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("QueryCache")
            .field("keys", &inner.entries.keys().collect::<Vec<_>>())
            .field("epoch", &inner.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_get_wrong_type_is_a_miss() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::Tsutomes, vec![1u32, 2, 3]);

        assert!(cache.get::<String>(QueryKey::Tsutomes).is_none());
        assert_eq!(*cache.get::<Vec<u32>>(QueryKey::Tsutomes).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_invalidate_removes_only_that_key() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::Tsutomes, 1u8);
        cache.insert(QueryKey::Shurens, 2u8);

        assert!(cache.invalidate(QueryKey::Tsutomes));
        assert!(!cache.invalidate(QueryKey::Tsutomes));
        assert!(cache.contains(QueryKey::Shurens));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_empties_and_bumps_epoch() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::Me, Some(5u8));

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.epoch(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = QueryCache::new();
        let other = cache.clone();
        other.insert(QueryKey::Shurens, "x".to_string());

        assert!(cache.contains(QueryKey::Shurens));
    }

    #[tokio::test]
    async fn test_fetch_hit_skips_loader() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(42u32)
        };

        assert_eq!(*cache.fetch(QueryKey::Tsutomes, load).await.unwrap(), 42);
        assert_eq!(*cache.fetch(QueryKey::Tsutomes, load).await.unwrap(), 42);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = QueryCache::new();

        let result = cache
            .fetch(QueryKey::Tsutomes, || async { Err::<u32, _>("boom") })
            .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert!(!cache.contains(QueryKey::Tsutomes));
    }

    #[tokio::test]
    async fn test_fetch_across_clear_returns_value_but_does_not_store_it() {
        let cache = QueryCache::new();
        let during = cache.clone();

        let value = cache
            .fetch(QueryKey::Tsutomes, || async move {
                // Identity changes while the request is in flight.
                during.clear();
                Ok::<_, ()>(7u32)
            })
            .await
            .unwrap();

        assert_eq!(*value, 7);
        assert!(!cache.contains(QueryKey::Tsutomes));
    }

    #[tokio::test]
    async fn test_fetch_across_invalidate_returns_value_but_does_not_store_it() {
        let cache = QueryCache::new();
        let during = cache.clone();

        let value = cache
            .fetch(QueryKey::Tsutomes, || async move {
                during.invalidate(QueryKey::Tsutomes);
                Ok::<_, ()>(7u32)
            })
            .await
            .unwrap();

        assert_eq!(*value, 7);
        assert!(!cache.contains(QueryKey::Tsutomes));
    }

    #[tokio::test]
    async fn test_fetch_invalidate_of_other_key_still_stores() {
        let cache = QueryCache::new();
        let during = cache.clone();

        cache
            .fetch(QueryKey::Tsutomes, || async move {
                during.invalidate(QueryKey::Shurens);
                Ok::<_, ()>(7u32)
            })
            .await
            .unwrap();

        assert!(cache.contains(QueryKey::Tsutomes));
    }
}
