//! In-process [`FingerprintStore`] backed by a `moka` cache.
//!
//! Used for one-shot runs that do not need a database. Entries expire after
//! the TTL passed to [`FingerprintStore::set`] and are never evicted before
//! that, so the cache is unbounded.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use crate::error::AppError;
use crate::models::{FingerprintKey, StoredFingerprint};
use crate::traits::FingerprintStore;

#[derive(Debug, Clone)]
struct Entry {
    simhash: String,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<FingerprintKey, Entry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &FingerprintKey,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &FingerprintKey,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<FingerprintKey, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let cache = Cache::builder().expire_after(EntryTtl).build();
        Self { cache }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintStore for MemoryStore {
    async fn exists(&self, key: &FingerprintKey) -> Result<bool, AppError> {
        Ok(self.cache.get(key).await.is_some())
    }

    async fn get(&self, key: &FingerprintKey) -> Result<Option<String>, AppError> {
        Ok(self.cache.get(key).await.map(|e| e.simhash))
    }

    /// A live entry for `key` is kept as is.
    async fn set(&self, key: &FingerprintKey, simhash: &str, ttl: Duration) -> Result<(), AppError> {
        self.cache
            .entry(key.clone())
            .or_insert(Entry {
                simhash: simhash.to_string(),
                ttl,
            })
            .await;
        Ok(())
    }

    async fn list_for_url(&self, url: &str) -> Result<Vec<StoredFingerprint>, AppError> {
        let mut found: Vec<StoredFingerprint> = self
            .cache
            .iter()
            .filter(|(key, _)| key.url == url)
            .map(|(key, entry)| StoredFingerprint {
                timestamp: key.timestamp.clone(),
                simhash: entry.simhash,
            })
            .collect();
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(found)
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let before = self.cache.entry_count();
        self.cache.run_pending_tasks().await;
        Ok(before.saturating_sub(self.cache.entry_count()))
    }
}
