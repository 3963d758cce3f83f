use crate::models::{FeedEntry, MatchPair};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Errors internal to the cache tiers. They never escape the trait surface:
/// every failure degrades to a miss (reads) or a logged warning (writes), so
/// the cache can never fail a feed or action request.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Feed cache contract.
///
/// The only shared mutable resource in the core; every read and write goes
/// through this trait so tests can substitute an in-memory fake. Entries are
/// tagged per user: a single `invalidate` call clears every filter-variant of
/// that user's feed without enumerating keys.
#[async_trait]
pub trait FeedCache: Send + Sync {
    async fn get(&self, user_id: i64, fingerprint: &str) -> Option<Vec<FeedEntry>>;
    async fn put(&self, user_id: i64, fingerprint: &str, entries: &[FeedEntry]);
    /// Drop every cached feed variant for the user, effective immediately.
    async fn invalidate(&self, user_id: i64);

    async fn get_matches(&self, user_id: i64) -> Option<Vec<MatchPair>>;
    async fn put_matches(&self, user_id: i64, matches: &[MatchPair]);
    async fn invalidate_matches(&self, user_id: i64);
}

/// Cache key builder.
struct CacheKey;

impl CacheKey {
    fn feed(user_id: i64, epoch: u64, fingerprint: &str) -> String {
        format!("feed:{}:{}:{}", user_id, epoch, fingerprint)
    }

    fn feed_epoch(user_id: i64) -> String {
        format!("feed_epoch:{}", user_id)
    }

    fn matches(user_id: i64) -> String {
        format!("matches:{}", user_id)
    }
}

/// Two-tier cache: moka in-process L1 plus Redis L2 shared across instances.
///
/// Per-user invalidation works through an epoch counter kept in Redis: feed
/// keys embed the epoch, and `invalidate` bumps it, making every stale
/// filter-variant unreachable at once. Orphaned entries age out via TTL.
pub struct TieredCache {
    redis: tokio::sync::Mutex<ConnectionManager>,
    l1: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl TieredCache {
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        let l1 = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Ok(Self {
            redis: tokio::sync::Mutex::new(redis),
            l1,
            ttl_secs,
        })
    }

    async fn feed_epoch(&self, user_id: i64) -> Result<u64, CacheError> {
        let mut conn = self.redis.lock().await;
        let epoch: Option<u64> = redis::cmd("GET")
            .arg(CacheKey::feed_epoch(user_id))
            .query_async(&mut *conn)
            .await?;
        Ok(epoch.unwrap_or(0))
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if let Some(bytes) = self.l1.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);
            self.l1.insert(key.to_string(), json.as_bytes().to_vec()).await;
            return Ok(Some(serde_json::from_str(&json)?));
        }

        tracing::trace!("Cache miss: {}", key);
        Ok(None)
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        self.l1.insert(key.to_string(), json.as_bytes().to_vec()).await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1.invalidate(key).await;
        let mut conn = self.redis.lock().await;
        redis::cmd("DEL").arg(key).query_async::<()>(&mut *conn).await?;
        Ok(())
    }

    async fn bump_epoch(&self, user_id: i64) -> Result<(), CacheError> {
        let mut conn = self.redis.lock().await;
        redis::cmd("INCR")
            .arg(CacheKey::feed_epoch(user_id))
            .query_async::<u64>(&mut *conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FeedCache for TieredCache {
    async fn get(&self, user_id: i64, fingerprint: &str) -> Option<Vec<FeedEntry>> {
        let epoch = match self.feed_epoch(user_id).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Feed epoch lookup failed for user {}: {}", user_id, e);
                return None;
            }
        };
        match self.read(&CacheKey::feed(user_id, epoch, fingerprint)).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Feed cache read failed for user {}: {}", user_id, e);
                None
            }
        }
    }

    async fn put(&self, user_id: i64, fingerprint: &str, entries: &[FeedEntry]) {
        let epoch = match self.feed_epoch(user_id).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Feed epoch lookup failed for user {}: {}", user_id, e);
                return;
            }
        };
        if let Err(e) = self
            .write(&CacheKey::feed(user_id, epoch, fingerprint), &entries)
            .await
        {
            tracing::warn!("Feed cache write failed for user {}: {}", user_id, e);
        }
    }

    async fn invalidate(&self, user_id: i64) {
        if let Err(e) = self.bump_epoch(user_id).await {
            tracing::warn!("Feed cache invalidation failed for user {}: {}", user_id, e);
        } else {
            tracing::debug!("Invalidated feed cache for user {}", user_id);
        }
    }

    async fn get_matches(&self, user_id: i64) -> Option<Vec<MatchPair>> {
        match self.read(&CacheKey::matches(user_id)).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Match list cache read failed for user {}: {}", user_id, e);
                None
            }
        }
    }

    async fn put_matches(&self, user_id: i64, matches: &[MatchPair]) {
        if let Err(e) = self.write(&CacheKey::matches(user_id), &matches).await {
            tracing::warn!("Match list cache write failed for user {}: {}", user_id, e);
        }
    }

    async fn invalidate_matches(&self, user_id: i64) {
        if let Err(e) = self.delete(&CacheKey::matches(user_id)).await {
            tracing::warn!(
                "Match list cache invalidation failed for user {}: {}",
                user_id,
                e
            );
        }
    }
}

/// Single-process cache with the same tagging semantics as `TieredCache`,
/// used in tests and single-instance deployments.
pub struct MemoryCache {
    l1: moka::future::Cache<String, Vec<u8>>,
    epochs: RwLock<HashMap<i64, u64>>,
}

impl MemoryCache {
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        Self {
            l1: moka::future::CacheBuilder::new(capacity)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
            epochs: RwLock::new(HashMap::new()),
        }
    }

    fn epoch(&self, user_id: i64) -> u64 {
        self.epochs
            .read()
            .map(|epochs| epochs.get(&user_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1000, 300)
    }
}

#[async_trait]
impl FeedCache for MemoryCache {
    async fn get(&self, user_id: i64, fingerprint: &str) -> Option<Vec<FeedEntry>> {
        let key = CacheKey::feed(user_id, self.epoch(user_id), fingerprint);
        let bytes = self.l1.get(&key).await?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn put(&self, user_id: i64, fingerprint: &str, entries: &[FeedEntry]) {
        let key = CacheKey::feed(user_id, self.epoch(user_id), fingerprint);
        if let Ok(bytes) = serde_json::to_vec(&entries) {
            self.l1.insert(key, bytes).await;
        }
    }

    async fn invalidate(&self, user_id: i64) {
        if let Ok(mut epochs) = self.epochs.write() {
            *epochs.entry(user_id).or_insert(0) += 1;
        }
    }

    async fn get_matches(&self, user_id: i64) -> Option<Vec<MatchPair>> {
        let bytes = self.l1.get(&CacheKey::matches(user_id)).await?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn put_matches(&self, user_id: i64, matches: &[MatchPair]) {
        if let Ok(bytes) = serde_json::to_vec(&matches) {
            self.l1.insert(CacheKey::matches(user_id), bytes).await;
        }
    }

    async fn invalidate_matches(&self, user_id: i64) {
        self.l1.invalidate(&CacheKey::matches(user_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(candidate_id: i64, score: f64) -> FeedEntry {
        FeedEntry {
            candidate_id,
            score,
            distance: 1.0,
            age: Some(25),
            gender: Some("woman".to_string()),
            bio: None,
        }
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::default();
        cache.put(1, "fp", &[entry(2, 80.0)]).await;

        let got = cache.get(1, "fp").await.expect("cached feed");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].candidate_id, 2);
    }

    #[tokio::test]
    async fn test_invalidate_clears_all_filter_variants() {
        let cache = MemoryCache::default();
        cache.put(1, "fp-a", &[entry(2, 80.0)]).await;
        cache.put(1, "fp-b", &[entry(3, 70.0)]).await;
        cache.put(9, "fp-a", &[entry(4, 60.0)]).await;

        cache.invalidate(1).await;

        assert!(cache.get(1, "fp-a").await.is_none());
        assert!(cache.get(1, "fp-b").await.is_none());
        // Other users' entries are untouched
        assert!(cache.get(9, "fp-a").await.is_some());
    }

    #[tokio::test]
    async fn test_match_list_invalidation_is_per_user() {
        let cache = MemoryCache::default();
        let at = chrono::Utc::now();
        cache
            .put_matches(1, &[MatchPair::canonical(1, 2, at)])
            .await;
        cache
            .put_matches(2, &[MatchPair::canonical(1, 2, at)])
            .await;

        cache.invalidate_matches(1).await;

        assert!(cache.get_matches(1).await.is_none());
        assert!(cache.get_matches(2).await.is_some());
    }
}
