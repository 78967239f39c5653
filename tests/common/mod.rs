#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use object_store_fs::{
    adapters::outbound::{locking::MemoryLockProvider, storage::ObjectStoreClient},
    domain::{
        errors::{StorageError, StorageResult},
        models::{Acl, DirEntry, ObjectInfo},
    },
    ports::{
        derivation::{DeriveError, DerivedArtifact, Deriver},
        locking::{DerivationLock, LockName, LockProvider},
    },
    BucketName, Locator, ObjectKey, StorageClient,
};

pub fn bucket(name: &str) -> BucketName {
    BucketName::new(name.to_string()).unwrap()
}

pub fn locator(bucket_name: &str, key: &str) -> Locator {
    Locator::new(bucket(bucket_name), ObjectKey::new(key.to_string()).unwrap())
}

/// In-memory store with the given buckets, wrapped to count calls
pub fn counting_store(buckets: &[&str]) -> Arc<CountingStorage> {
    let inner = ObjectStoreClient::in_memory("http://localhost:9000");
    for name in buckets {
        inner.create_bucket(&bucket(name));
    }
    Arc::new(CountingStorage::new(inner))
}

/// Delegates to a real client and records how often each call happens
pub struct CountingStorage {
    inner: ObjectStoreClient,
    pub exists_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    fail_validation: AtomicBool,
    put_delay_ms: AtomicU64,
}

impl CountingStorage {
    pub fn new(inner: ObjectStoreClient) -> Self {
        Self {
            inner,
            exists_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            fail_validation: AtomicBool::new(false),
            put_delay_ms: AtomicU64::new(0),
        }
    }

    /// Make every upload take at least `delay`
    pub fn set_put_delay(&self, delay: Duration) {
        self.put_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make bucket validation fail as if the network were down
    pub fn set_validation_failing(&self, failing: bool) {
        self.fail_validation.store(failing, Ordering::SeqCst);
    }

    pub fn validations(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub async fn seed(&self, locator: &Locator, data: &[u8]) {
        self.inner
            .put_object(locator, Bytes::copy_from_slice(data), Acl::PublicRead, None)
            .await
            .unwrap();
    }
}

#[async_trait]
impl StorageClient for CountingStorage {
    async fn object_exists(&self, locator: &Locator) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.object_exists(locator).await
    }

    async fn head_object(&self, locator: &Locator) -> StorageResult<ObjectInfo> {
        self.inner.head_object(locator).await
    }

    async fn get_object(&self, locator: &Locator) -> StorageResult<Bytes> {
        self.inner.get_object(locator).await
    }

    async fn put_object(
        &self,
        locator: &Locator,
        data: Bytes,
        acl: Acl,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.put_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.put_object(locator, data, acl, content_type).await
    }

    async fn copy_object(&self, source: &Locator, destination: &Locator) -> StorageResult<()> {
        self.inner.copy_object(source, destination).await
    }

    async fn delete_object(&self, locator: &Locator) -> StorageResult<()> {
        self.inner.delete_object(locator).await
    }

    async fn list_directory(&self, directory: &Locator) -> StorageResult<Vec<DirEntry>> {
        self.inner.list_directory(directory).await
    }

    async fn list_objects(&self, prefix: &Locator) -> StorageResult<Vec<ObjectInfo>> {
        self.inner.list_objects(prefix).await
    }

    fn build_url(&self, locator: &Locator) -> String {
        self.inner.build_url(locator)
    }

    async fn build_presigned_url(&self, locator: &Locator, ttl: Duration) -> StorageResult<String> {
        self.inner.build_presigned_url(locator, ttl).await
    }

    async fn validate_bucket_exists(&self, bucket: &BucketName) -> StorageResult<bool> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_validation.load(Ordering::SeqCst) {
            return Err(StorageError::Transient {
                operation: "validate_bucket_exists".to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.validate_bucket_exists(bucket).await
    }
}

/// Deriver that counts calls and returns the source reversed after a delay
pub struct CountingDeriver {
    pub calls: AtomicUsize,
    delay: Duration,
    fail: bool,
    content_type: &'static str,
}

impl CountingDeriver {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Self::producing("image/jpeg", delay)
    }

    /// Deriver whose output format differs from the original's
    pub fn producing(content_type: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: false,
            content_type,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
            content_type: "image/jpeg",
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Deriver for CountingDeriver {
    async fn derive(
        &self,
        source: Bytes,
        _source_key: &ObjectKey,
    ) -> Result<DerivedArtifact, DeriveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(DeriveError::Decode("corrupt source".to_string()));
        }
        let mut data = source.to_vec();
        data.reverse();
        Ok(DerivedArtifact {
            data: Bytes::from(data),
            content_type: self.content_type.to_string(),
        })
    }
}

/// Lock provider that records acquisition attempts
#[derive(Default)]
pub struct CountingLocks {
    inner: MemoryLockProvider,
    pub attempts: AtomicUsize,
}

impl CountingLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_held(&self, name: &LockName) -> bool {
        self.inner.is_held(name)
    }
}

#[async_trait]
impl LockProvider for CountingLocks {
    async fn try_acquire(&self, name: &LockName) -> Option<DerivationLock> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.try_acquire(name).await
    }
}
