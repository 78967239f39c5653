use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{
    errors::StorageResult,
    models::{Acl, DirEntry, ObjectInfo},
    value_objects::{BucketName, Locator},
};

/// Port for object storage operations.
///
/// Every call may block on network I/O; implementations own their retry
/// and timeout policy.
#[async_trait]
pub trait StorageClient: Send + Sync + 'static {
    /// Check if an object exists
    async fn object_exists(&self, locator: &Locator) -> StorageResult<bool>;

    /// Fetch object metadata without the body
    async fn head_object(&self, locator: &Locator) -> StorageResult<ObjectInfo>;

    /// Retrieve object data
    async fn get_object(&self, locator: &Locator) -> StorageResult<Bytes>;

    /// Store object data with the given canned ACL
    async fn put_object(
        &self,
        locator: &Locator,
        data: Bytes,
        acl: Acl,
        content_type: Option<&str>,
    ) -> StorageResult<()>;

    /// Server-side copy within or across buckets
    async fn copy_object(&self, source: &Locator, destination: &Locator) -> StorageResult<()>;

    /// Delete an object
    async fn delete_object(&self, locator: &Locator) -> StorageResult<()>;

    /// List the immediate children of a directory-like prefix
    async fn list_directory(&self, directory: &Locator) -> StorageResult<Vec<DirEntry>>;

    /// List every object below a prefix
    async fn list_objects(&self, prefix: &Locator) -> StorageResult<Vec<ObjectInfo>>;

    /// Unsigned, public URL of an object
    fn build_url(&self, locator: &Locator) -> String;

    /// Time-limited URL signed by the store itself
    async fn build_presigned_url(&self, locator: &Locator, ttl: Duration) -> StorageResult<String>;

    /// Whether the bucket exists and is reachable with our credentials.
    /// A definite "no" is `Ok(false)`; failing to find out is an error.
    async fn validate_bucket_exists(&self, bucket: &BucketName) -> StorageResult<bool>;
}
