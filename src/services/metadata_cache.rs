use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::Mutex,
};

use lru::LruCache;
use tokio::sync::RwLock;

use crate::{
    config::DEFAULT_METADATA_CACHE_CAPACITY,
    domain::{
        errors::{StorageError, StorageResult},
        models::FileStat,
        value_objects::{BucketName, Locator},
    },
    ports::storage::StorageClient,
};

/// Process-wide memo of store metadata.
///
/// Bucket validation results never expire; callers invalidate explicitly when
/// bucket configuration changes. Object stats are kept in a bounded LRU and
/// dropped by the operations that change the object.
pub struct MetadataCache {
    buckets: RwLock<HashMap<BucketName, bool>>,
    stats: Mutex<LruCache<Locator, FileStat>>,
}

impl MetadataCache {
    pub fn new(stat_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(stat_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            buckets: RwLock::new(HashMap::new()),
            stats: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Whether `bucket` exists, asking `client` only on a cache miss.
    ///
    /// A failed validation call is returned as `BucketValidation` and is not
    /// cached, so the next call asks again.
    pub async fn validate_bucket_exists(
        &self,
        bucket: &BucketName,
        client: &dyn StorageClient,
    ) -> StorageResult<bool> {
        if let Some(valid) = self.buckets.read().await.get(bucket) {
            return Ok(*valid);
        }

        let valid = client
            .validate_bucket_exists(bucket)
            .await
            .map_err(|e| match e {
                StorageError::BucketValidation { .. } => e,
                other => StorageError::BucketValidation {
                    bucket: bucket.clone(),
                    message: other.to_string(),
                },
            })?;

        tracing::debug!(%bucket, valid, "Cached bucket validation");
        self.buckets.write().await.insert(bucket.clone(), valid);
        Ok(valid)
    }

    pub async fn invalidate_bucket(&self, bucket: &BucketName) {
        self.buckets.write().await.remove(bucket);
    }

    pub async fn invalidate_all_buckets(&self) {
        self.buckets.write().await.clear();
    }

    pub fn cached_stat(&self, locator: &Locator) -> Option<FileStat> {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(locator)
            .cloned()
    }

    pub fn remember_stat(&self, locator: &Locator, stat: FileStat) {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(locator.clone(), stat);
    }

    pub fn forget_stat(&self, locator: &Locator) {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop(locator);
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::storage::ObjectStoreClient;
    use chrono::Utc;

    fn bucket(name: &str) -> BucketName {
        BucketName::new(name.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_result_is_memoized_until_invalidated() {
        let client = ObjectStoreClient::in_memory("http://localhost");
        let cache = MetadataCache::default();
        let media = bucket("media");

        assert!(!cache.validate_bucket_exists(&media, &client).await.unwrap());

        // Cached "missing" survives the bucket appearing
        client.create_bucket(&media);
        assert!(!cache.validate_bucket_exists(&media, &client).await.unwrap());

        cache.invalidate_bucket(&media).await;
        assert!(cache.validate_bucket_exists(&media, &client).await.unwrap());
    }

    #[test]
    fn test_stat_lru_is_bounded() {
        let cache = MetadataCache::new(2);
        let loc = |k: &str| Locator::parse_explicit(&format!("s3://media/{}", k)).unwrap();

        cache.remember_stat(&loc("a"), FileStat::file(1, Utc::now()));
        cache.remember_stat(&loc("b"), FileStat::file(2, Utc::now()));
        cache.remember_stat(&loc("c"), FileStat::file(3, Utc::now()));

        assert!(cache.cached_stat(&loc("a")).is_none());
        assert_eq!(cache.cached_stat(&loc("c")).unwrap().size, 3);

        cache.forget_stat(&loc("c"));
        assert!(cache.cached_stat(&loc("c")).is_none());
    }
}
