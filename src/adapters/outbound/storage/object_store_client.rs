use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{
    memory::InMemory, path::Path as ObjectPath, signer::Signer, Attribute, AttributeValue,
    Attributes, ObjectMeta, ObjectStore as ApacheObjectStore, PutOptions, PutPayload,
};

use super::{
    error::map_store_error,
    s3::{create_s3_store, S3Config},
};
use crate::{
    domain::{
        errors::{StorageError, StorageResult},
        models::{Acl, DirEntry, ObjectInfo},
        value_objects::{BucketName, Locator, ObjectKey},
    },
    ports::storage::StorageClient,
};

/// Prefix listed to probe a bucket without enumerating it
const BUCKET_PROBE_PREFIX: &str = ".bucket-probe";

#[derive(Clone)]
struct BucketStore {
    store: Arc<dyn ApacheObjectStore>,
    signer: Option<Arc<dyn Signer>>,
}

enum Backend {
    S3(S3Config),
    /// Buckets must be created up front; URLs are rooted at `public_base_url`
    InMemory { public_base_url: String },
}

/// `StorageClient` backed by Apache object_store, one store per bucket
pub struct ObjectStoreClient {
    backend: Backend,
    stores: RwLock<HashMap<(BucketName, Acl), BucketStore>>,
}

impl ObjectStoreClient {
    pub fn s3(config: S3Config) -> Self {
        Self {
            backend: Backend::S3(config),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// In-process store for tests and local development
    pub fn in_memory(public_base_url: impl Into<String>) -> Self {
        Self {
            backend: Backend::InMemory {
                public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            },
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty in-memory bucket. No-op for S3, and for buckets that exist.
    pub fn create_bucket(&self, bucket: &BucketName) {
        if let Backend::InMemory { .. } = self.backend {
            let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
            stores
                .entry((bucket.clone(), Acl::PublicRead))
                .or_insert_with(|| BucketStore {
                    store: Arc::new(InMemory::new()),
                    signer: None,
                });
        }
    }

    fn store_for(&self, bucket: &BucketName, acl: Acl) -> StorageResult<BucketStore> {
        let acl = match self.backend {
            // ACLs are not modelled in memory; every bucket has a single store
            Backend::InMemory { .. } => Acl::PublicRead,
            Backend::S3(_) => acl,
        };
        let cache_key = (bucket.clone(), acl);

        if let Some(store) = self
            .stores
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&cache_key)
        {
            return Ok(store.clone());
        }

        match &self.backend {
            Backend::InMemory { .. } => Err(StorageError::BucketNotFound {
                bucket: bucket.clone(),
            }),
            Backend::S3(config) => {
                let s3 = create_s3_store(config, bucket, acl)
                    .map_err(|e| StorageError::transient("connect", format!("{:#}", e)))?;
                let store = BucketStore {
                    store: s3.clone(),
                    signer: Some(s3),
                };
                self.stores
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(cache_key, store.clone());
                Ok(store)
            }
        }
    }

    fn read_store(&self, locator: &Locator) -> StorageResult<BucketStore> {
        self.store_for(locator.bucket(), Acl::PublicRead)
    }

    fn to_object_info(bucket: &BucketName, meta: ObjectMeta) -> StorageResult<ObjectInfo> {
        let key = ObjectKey::new(meta.location.to_string())?;
        Ok(ObjectInfo {
            locator: Locator::new(bucket.clone(), key),
            size: meta.size,
            last_modified: meta.last_modified,
            etag: meta.e_tag,
        })
    }

    fn path_of(key: &ObjectKey) -> ObjectPath {
        ObjectPath::from(key.as_str())
    }

    /// `None` lists the whole bucket
    fn prefix_of(key: &ObjectKey) -> Option<ObjectPath> {
        (!key.is_root()).then(|| Self::path_of(key))
    }
}

#[async_trait]
impl StorageClient for ObjectStoreClient {
    async fn object_exists(&self, locator: &Locator) -> StorageResult<bool> {
        let store = self.read_store(locator)?;
        match store.store.head(&Self::path_of(locator.key())).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(map_store_error(e, locator, "object_exists")),
        }
    }

    async fn head_object(&self, locator: &Locator) -> StorageResult<ObjectInfo> {
        let store = self.read_store(locator)?;
        let meta = store
            .store
            .head(&Self::path_of(locator.key()))
            .await
            .map_err(|e| map_store_error(e, locator, "head_object"))?;

        Ok(ObjectInfo {
            locator: locator.clone(),
            size: meta.size,
            last_modified: meta.last_modified,
            etag: meta.e_tag,
        })
    }

    async fn get_object(&self, locator: &Locator) -> StorageResult<Bytes> {
        let store = self.read_store(locator)?;
        let result = store
            .store
            .get(&Self::path_of(locator.key()))
            .await
            .map_err(|e| map_store_error(e, locator, "get_object"))?;

        result
            .bytes()
            .await
            .map_err(|e| map_store_error(e, locator, "get_object"))
    }

    async fn put_object(
        &self,
        locator: &Locator,
        data: Bytes,
        acl: Acl,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        let store = self.store_for(locator.bucket(), acl)?;

        let mut attributes = Attributes::new();
        if let Some(ct) = content_type {
            attributes.insert(Attribute::ContentType, AttributeValue::from(ct.to_string()));
        }
        let mut options = PutOptions::default();
        options.attributes = attributes;

        let size = data.len();
        store
            .store
            .put_opts(&Self::path_of(locator.key()), PutPayload::from(data), options)
            .await
            .map_err(|e| map_store_error(e, locator, "put_object"))?;

        tracing::debug!(%locator, size, acl = acl.as_header_value(), "Stored object");
        Ok(())
    }

    async fn copy_object(&self, source: &Locator, destination: &Locator) -> StorageResult<()> {
        if source.bucket() == destination.bucket() {
            let store = self.store_for(destination.bucket(), Acl::PublicRead)?;
            return store
                .store
                .copy(
                    &Self::path_of(source.key()),
                    &Self::path_of(destination.key()),
                )
                .await
                .map_err(|e| map_store_error(e, source, "copy_object"));
        }

        // object_store cannot copy between buckets; stream through this process
        let data = self.get_object(source).await?;
        self.put_object(destination, data, Acl::PublicRead, None)
            .await
    }

    async fn delete_object(&self, locator: &Locator) -> StorageResult<()> {
        let store = self.read_store(locator)?;
        store
            .store
            .delete(&Self::path_of(locator.key()))
            .await
            .map_err(|e| map_store_error(e, locator, "delete_object"))
    }

    async fn list_directory(&self, directory: &Locator) -> StorageResult<Vec<DirEntry>> {
        let store = self.read_store(directory)?;
        let prefix = Self::prefix_of(directory.key());
        let listing = store
            .store
            .list_with_delimiter(prefix.as_ref())
            .await
            .map_err(|e| map_store_error(e, directory, "list_directory"))?;

        let dirs = listing.common_prefixes.iter().filter_map(|p| {
            p.filename().map(|name| DirEntry {
                name: name.to_string(),
                is_dir: true,
            })
        });
        let files = listing.objects.iter().filter_map(|meta| {
            meta.location.filename().map(|name| DirEntry {
                name: name.to_string(),
                is_dir: false,
            })
        });

        let mut entries: Vec<DirEntry> = dirs.chain(files).collect();
        entries.sort();
        Ok(entries)
    }

    async fn list_objects(&self, prefix: &Locator) -> StorageResult<Vec<ObjectInfo>> {
        let store = self.read_store(prefix)?;
        let path = Self::prefix_of(prefix.key());
        let metas: Vec<ObjectMeta> = store
            .store
            .list(path.as_ref())
            .try_collect()
            .await
            .map_err(|e| map_store_error(e, prefix, "list_objects"))?;

        metas
            .into_iter()
            .map(|meta| Self::to_object_info(prefix.bucket(), meta))
            .collect()
    }

    fn build_url(&self, locator: &Locator) -> String {
        let base = match &self.backend {
            Backend::S3(config) => config.bucket_url(locator.bucket()),
            Backend::InMemory { public_base_url } => {
                format!("{}/{}", public_base_url, locator.bucket())
            }
        };
        format!("{}/{}", base, locator.key().url_path())
    }

    async fn build_presigned_url(&self, locator: &Locator, ttl: Duration) -> StorageResult<String> {
        let store = self.read_store(locator)?;
        match store.signer {
            Some(signer) => {
                let url = signer
                    .signed_url(http::Method::GET, &Self::path_of(locator.key()), ttl)
                    .await
                    .map_err(|e| map_store_error(e, locator, "build_presigned_url"))?;
                Ok(url.to_string())
            }
            // Development stand-in: the public URL tagged with its lifetime
            None => Ok(format!(
                "{}?expires_in={}",
                self.build_url(locator),
                ttl.as_secs()
            )),
        }
    }

    async fn validate_bucket_exists(&self, bucket: &BucketName) -> StorageResult<bool> {
        if let Backend::InMemory { .. } = self.backend {
            let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
            return Ok(stores.contains_key(&(bucket.clone(), Acl::PublicRead)));
        }

        let store = self.store_for(bucket, Acl::PublicRead)?;
        let probe = ObjectPath::from(BUCKET_PROBE_PREFIX);
        match store.store.list_with_delimiter(Some(&probe)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) if e.to_string().contains("NoSuchBucket") => Ok(false),
            Err(e) => Err(StorageError::BucketValidation {
                bucket: bucket.clone(),
                message: e.to_string(),
            }),
        }
    }
}
