use std::{io::SeekFrom, sync::Arc};

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    config::WrapperConfig,
    domain::{
        errors::{SigningError, StorageError, StorageResult},
        models::{guess_content_type, Acl, DirEntry, FileStat},
        value_objects::{DerivedLocator, Locator},
    },
    ports::storage::StorageClient,
    services::{metadata_cache::MetadataCache, url_signer::CdnUrlSigner},
};

/// How `stat` treats a missing object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatMode {
    /// Report `exists: false`
    Quiet,
    /// Fail with `ObjectNotFound`
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Truncate; the object is replaced on close
    Write,
    /// Writes go to the end of the existing content
    Append,
    /// Fails if the object already exists
    CreateNew,
}

impl OpenMode {
    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// Filesystem operations over object storage.
///
/// Every write is uploaded with the `public-read` ACL. Cheap to clone.
#[derive(Clone)]
pub struct StreamWrapper {
    config: Arc<WrapperConfig>,
    client: Arc<dyn StorageClient>,
    cache: Arc<MetadataCache>,
    signer: Option<Arc<CdnUrlSigner>>,
}

impl StreamWrapper {
    /// Unusable CDN key material fails here; absent key material only fails
    /// once a URL actually needs signing.
    pub fn new(
        config: Arc<WrapperConfig>,
        client: Arc<dyn StorageClient>,
        cache: Arc<MetadataCache>,
    ) -> StorageResult<Self> {
        let signer = match &config.cdn {
            None => None,
            Some(cdn) => match CdnUrlSigner::from_settings(cdn) {
                Ok(signer) => Some(Arc::new(signer)),
                Err(SigningError::Configuration { missing }) => {
                    tracing::warn!(missing, "CDN configured without signing key material");
                    None
                }
                Err(e) => return Err(e.into()),
            },
        };

        Ok(Self {
            config,
            client,
            cache,
            signer,
        })
    }

    pub fn with_signer(mut self, signer: CdnUrlSigner) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn StorageClient> {
        &self.client
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Parse `uri` and check its bucket, with the bare scheme standing for the
    /// configured default bucket
    pub async fn resolve(&self, uri: &str) -> StorageResult<Locator> {
        let locator = Locator::parse(uri)?.resolve(self.config.default_bucket.as_ref())?;
        self.ensure_bucket(&locator).await?;
        Ok(locator)
    }

    pub async fn ensure_bucket(&self, locator: &Locator) -> StorageResult<()> {
        let bucket = locator.bucket();
        if self
            .cache
            .validate_bucket_exists(bucket, self.client.as_ref())
            .await?
        {
            Ok(())
        } else {
            Err(StorageError::BucketNotFound {
                bucket: bucket.clone(),
            })
        }
    }

    /// URL a browser should use to fetch `locator`.
    ///
    /// Rules, first match wins: pending derivative → delivery endpoint;
    /// save-as pattern → attachment disposition; presigned pattern → signed
    /// URL; otherwise the public URL.
    pub async fn external_url(&self, locator: &Locator) -> StorageResult<String> {
        let key = locator.key();

        if let (Some(base), Some(derivative)) = (
            self.config.delivery_base_url.as_deref(),
            DerivedLocator::from_locator(locator),
        ) {
            if !self.client.object_exists(locator).await? {
                return Ok(format!(
                    "{}{}",
                    base.trim_end_matches('/'),
                    derivative.request_path()
                ));
            }
        }

        if self.config.save_as_match(key).is_some() {
            let disposition = format!("attachment; filename=\"{}\"", locator.basename());
            return Ok(append_query(
                &self.public_url(locator),
                &format!(
                    "response-content-disposition={}",
                    urlencoding::encode(&disposition)
                ),
            ));
        }

        if let Some(rule) = self.config.presigned_match(key) {
            if self.config.cdn.is_none() {
                return self.client.build_presigned_url(locator, rule.ttl).await;
            }
            let signer = self.cdn_signer()?;
            let expires_at = expiry_after(rule.ttl)?;
            return Ok(signer.sign(&signer.resource_url(locator), expires_at)?);
        }

        Ok(self.public_url(locator))
    }

    fn public_url(&self, locator: &Locator) -> String {
        match self.config.public_base_url.as_deref() {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                locator.key().url_path()
            ),
            None => self.client.build_url(locator),
        }
    }

    fn cdn_signer(&self) -> StorageResult<&CdnUrlSigner> {
        if let Some(signer) = &self.signer {
            return Ok(signer.as_ref());
        }
        // Rebuild only to report precisely what is missing
        let err = match &self.config.cdn {
            Some(cdn) => CdnUrlSigner::from_settings(cdn).err(),
            None => None,
        };
        Err(err
            .unwrap_or(SigningError::Configuration { missing: "cdn" })
            .into())
    }

    pub async fn read(&self, locator: &Locator) -> StorageResult<Bytes> {
        self.client.get_object(locator).await
    }

    /// Upload with a content type guessed from the key
    pub async fn write(&self, locator: &Locator, data: Bytes) -> StorageResult<()> {
        let content_type = guess_content_type(locator.key());
        self.write_with_content_type(locator, data, content_type)
            .await
    }

    pub async fn write_with_content_type(
        &self,
        locator: &Locator,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        self.client
            .put_object(locator, data, Acl::PublicRead, Some(content_type))
            .await?;
        self.cache
            .remember_stat(locator, FileStat::file(size, Utc::now()));
        Ok(())
    }

    pub async fn stat(&self, locator: &Locator, mode: StatMode) -> StorageResult<FileStat> {
        if locator.is_root() {
            self.ensure_bucket(locator).await?;
            return Ok(FileStat::directory());
        }

        if let Some(stat) = self.cache.cached_stat(locator) {
            return Ok(stat);
        }

        let stat = match self.client.head_object(locator).await {
            Ok(info) => FileStat::from(&info),
            Err(StorageError::ObjectNotFound { .. }) => {
                if self.client.list_directory(locator).await?.is_empty() {
                    return match mode {
                        StatMode::Quiet => Ok(FileStat::missing()),
                        StatMode::Required => Err(StorageError::ObjectNotFound {
                            locator: locator.clone(),
                        }),
                    };
                }
                FileStat::directory()
            }
            Err(e) => return Err(e),
        };

        self.cache.remember_stat(locator, stat.clone());
        Ok(stat)
    }

    pub async fn exists(&self, locator: &Locator) -> StorageResult<bool> {
        Ok(self.stat(locator, StatMode::Quiet).await?.exists)
    }

    pub fn dirname(&self, locator: &Locator) -> Locator {
        locator.dirname()
    }

    pub async fn unlink(&self, locator: &Locator) -> StorageResult<()> {
        self.client.delete_object(locator).await?;
        self.cache.forget_stat(locator);
        Ok(())
    }

    /// Copy then delete; not atomic
    pub async fn rename(&self, from: &Locator, to: &Locator) -> StorageResult<()> {
        self.client.copy_object(from, to).await?;
        self.client.delete_object(from).await?;
        self.cache.forget_stat(from);
        self.cache.forget_stat(to);
        tracing::debug!(%from, %to, "Renamed object");
        Ok(())
    }

    pub async fn list_dir(&self, locator: &Locator) -> StorageResult<Vec<DirEntry>> {
        self.client.list_directory(locator).await
    }

    /// Advisory locks are not supported; never acquired
    pub fn lock(&self, _locator: &Locator) -> bool {
        false
    }

    pub fn realpath(&self, _locator: &Locator) -> StorageResult<String> {
        Err(StorageError::unsupported(
            "realpath",
            "object storage has no canonical paths",
        ))
    }

    pub async fn open(&self, locator: &Locator, mode: OpenMode) -> StorageResult<FileHandle> {
        let (buffer, dirty) = match mode {
            OpenMode::Read => (self.read(locator).await?.to_vec(), false),
            OpenMode::Write => (Vec::new(), true),
            OpenMode::Append => match self.read(locator).await {
                Ok(existing) => (existing.to_vec(), false),
                Err(StorageError::ObjectNotFound { .. }) => (Vec::new(), true),
                Err(e) => return Err(e),
            },
            OpenMode::CreateNew => {
                if self.client.object_exists(locator).await? {
                    return Err(StorageError::ObjectAlreadyExists {
                        locator: locator.clone(),
                    });
                }
                (Vec::new(), true)
            }
        };

        let position = match mode {
            OpenMode::Append => buffer.len(),
            _ => 0,
        };

        Ok(FileHandle {
            wrapper: self.clone(),
            locator: locator.clone(),
            mode,
            buffer,
            position,
            dirty,
        })
    }
}

fn append_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}

fn expiry_after(ttl: std::time::Duration) -> StorageResult<DateTime<Utc>> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| {
            SigningError::PolicyEncoding {
                reason: format!("expiry {:?} out of range", ttl),
            }
            .into()
        })
}

/// An open object. Content is buffered in memory and uploaded on `flush` or
/// `close`.
pub struct FileHandle {
    wrapper: StreamWrapper,
    locator: Locator,
    mode: OpenMode,
    buffer: Vec<u8>,
    position: usize,
    dirty: bool,
}

impl FileHandle {
    /// Largest object a single PUT can store
    pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024;

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Up to `len` bytes from the current position
    pub fn read(&mut self, len: usize) -> StorageResult<Bytes> {
        if self.mode != OpenMode::Read {
            return Err(StorageError::unsupported("read", "handle is write-only"));
        }
        let start = self.position.min(self.buffer.len());
        let end = start.saturating_add(len).min(self.buffer.len());
        self.position = end;
        Ok(Bytes::copy_from_slice(&self.buffer[start..end]))
    }

    pub fn write(&mut self, data: &[u8]) -> StorageResult<usize> {
        if !self.mode.is_writable() {
            return Err(StorageError::unsupported("write", "handle is read-only"));
        }
        if self.mode == OpenMode::Append {
            self.position = self.buffer.len();
        }

        let end = self
            .position
            .checked_add(data.len())
            .filter(|end| (*end as u64) <= Self::MAX_OBJECT_SIZE)
            .ok_or_else(|| {
                StorageError::unsupported("write", "object would exceed the maximum object size")
            })?;
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(data);
        self.position = end;
        self.dirty = true;
        Ok(data.len())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> StorageResult<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(offset) => self.buffer.len() as i128 + i128::from(offset),
            SeekFrom::Current(offset) => self.position as i128 + i128::from(offset),
        };
        let target = usize::try_from(target).map_err(|_| {
            StorageError::unsupported("seek", "cannot seek before the start of the object")
        })?;
        self.position = target;
        Ok(target as u64)
    }

    pub fn tell(&self) -> u64 {
        self.position as u64
    }

    pub fn eof(&self) -> bool {
        self.position >= self.buffer.len()
    }

    pub fn stat(&self) -> FileStat {
        FileStat::file(self.buffer.len() as u64, Utc::now())
    }

    /// Upload pending writes
    pub async fn flush(&mut self) -> StorageResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.wrapper
            .write(&self.locator, Bytes::copy_from_slice(&self.buffer))
            .await?;
        self.dirty = false;
        Ok(())
    }

    pub async fn close(mut self) -> StorageResult<()> {
        self.flush().await
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if self.dirty {
            tracing::warn!(locator = %self.locator, "File handle dropped with unflushed writes");
        }
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("locator", &self.locator)
            .field("mode", &self.mode)
            .field("len", &self.buffer.len())
            .field("position", &self.position)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::outbound::storage::ObjectStoreClient, domain::value_objects::BucketName};

    fn locator(uri: &str) -> Locator {
        Locator::parse_explicit(uri).unwrap()
    }

    fn wrapper() -> StreamWrapper {
        let client = ObjectStoreClient::in_memory("http://localhost:9000");
        client.create_bucket(&BucketName::new("media".to_string()).unwrap());
        StreamWrapper::new(
            Arc::new(WrapperConfig::default()),
            Arc::new(client),
            Arc::new(MetadataCache::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_write_read_stat() {
        let wrapper = wrapper();
        let loc = locator("s3://media/docs/a.txt");

        wrapper.write(&loc, Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(wrapper.read(&loc).await.unwrap(), Bytes::from_static(b"hello"));

        let stat = wrapper.stat(&loc, StatMode::Required).await.unwrap();
        assert!(stat.exists && !stat.is_dir);
        assert_eq!(stat.size, 5);

        let dir = wrapper.stat(&locator("s3://media/docs"), StatMode::Quiet).await.unwrap();
        assert!(dir.is_dir);
    }

    #[tokio::test]
    async fn test_stat_missing() {
        let wrapper = wrapper();
        let loc = locator("s3://media/nope.txt");

        assert!(!wrapper.stat(&loc, StatMode::Quiet).await.unwrap().exists);
        assert!(wrapper
            .stat(&loc, StatMode::Required)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_file_handle_modes() {
        let wrapper = wrapper();
        let loc = locator("s3://media/log.txt");

        let mut handle = wrapper.open(&loc, OpenMode::CreateNew).await.unwrap();
        handle.write(b"one").unwrap();
        handle.close().await.unwrap();

        assert!(matches!(
            wrapper.open(&loc, OpenMode::CreateNew).await,
            Err(StorageError::ObjectAlreadyExists { .. })
        ));

        let mut handle = wrapper.open(&loc, OpenMode::Append).await.unwrap();
        handle.seek(SeekFrom::Start(0)).unwrap();
        handle.write(b",two").unwrap();
        handle.close().await.unwrap();

        let mut handle = wrapper.open(&loc, OpenMode::Read).await.unwrap();
        assert_eq!(handle.read(3).unwrap(), Bytes::from_static(b"one"));
        assert!(!handle.eof());
        assert_eq!(handle.read(100).unwrap(), Bytes::from_static(b",two"));
        assert!(handle.eof());
        assert!(handle.write(b"x").is_err());
        assert!(handle.seek(SeekFrom::Current(-100)).is_err());
    }

    #[tokio::test]
    async fn test_write_past_maximum_size_fails() {
        let wrapper = wrapper();
        let loc = locator("s3://media/huge.bin");

        let mut handle = wrapper.open(&loc, OpenMode::Write).await.unwrap();
        handle.seek(SeekFrom::Start(u64::MAX)).unwrap();
        assert!(matches!(
            handle.write(b"x"),
            Err(StorageError::UnsupportedOperation { .. })
        ));

        handle.seek(SeekFrom::Start(FileHandle::MAX_OBJECT_SIZE)).unwrap();
        assert!(handle.write(b"x").is_err());
        assert_eq!(handle.stat().size, 0);

        handle.seek(SeekFrom::Start(0)).unwrap();
        handle.write(b"fine").unwrap();
        handle.close().await.unwrap();
        assert_eq!(wrapper.read(&loc).await.unwrap(), Bytes::from_static(b"fine"));
    }

    #[tokio::test]
    async fn test_write_mode_truncates() {
        let wrapper = wrapper();
        let loc = locator("s3://media/a.txt");
        wrapper.write(&loc, Bytes::from_static(b"long content")).await.unwrap();

        let mut handle = wrapper.open(&loc, OpenMode::Write).await.unwrap();
        handle.write(b"short").unwrap();
        assert_eq!(handle.stat().size, 5);
        handle.close().await.unwrap();

        assert_eq!(wrapper.read(&loc).await.unwrap(), Bytes::from_static(b"short"));
    }

    #[tokio::test]
    async fn test_rename_and_unlink() {
        let wrapper = wrapper();
        let from = locator("s3://media/old.txt");
        let to = locator("s3://media/new.txt");
        wrapper.write(&from, Bytes::from_static(b"x")).await.unwrap();
        assert!(wrapper.exists(&from).await.unwrap());

        wrapper.rename(&from, &to).await.unwrap();
        assert!(!wrapper.exists(&from).await.unwrap());
        assert!(wrapper.exists(&to).await.unwrap());

        wrapper.unlink(&to).await.unwrap();
        assert!(!wrapper.exists(&to).await.unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_filesystem_features() {
        let wrapper = wrapper();
        let loc = locator("s3://media/a.txt");
        assert!(!wrapper.lock(&loc));
        assert!(matches!(
            wrapper.realpath(&loc),
            Err(StorageError::UnsupportedOperation { .. })
        ));
    }
}
