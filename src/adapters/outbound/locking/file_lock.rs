//! Lock files in a shared directory.
//!
//! Acquisition is an exclusive create of `<dir>/<name>.lock`. Every process
//! serving derivatives must see the same directory. A lock file older than
//! the lease is presumed abandoned by a crashed holder and broken.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::ports::locking::{DerivationLock, LockName, LockProvider};

pub const DEFAULT_LOCK_LEASE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct FileLockProvider {
    dir: PathBuf,
    lease: Duration,
}

impl FileLockProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lease: DEFAULT_LOCK_LEASE,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    fn lock_path(&self, name: &LockName) -> PathBuf {
        self.dir.join(format!("{}.lock", name))
    }

    async fn create(path: &Path, token: &str) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(token.as_bytes()).await?;
        file.flush().await
    }

    async fn is_stale(&self, path: &Path) -> bool {
        let Ok(meta) = fs::metadata(path).await else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > self.lease)
    }
}

#[async_trait]
impl LockProvider for FileLockProvider {
    async fn try_acquire(&self, name: &LockName) -> Option<DerivationLock> {
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "Cannot create lock directory");
            return None;
        }

        let path = self.lock_path(name);
        let token = Uuid::new_v4().to_string();

        let mut attempt = Self::create(&path, &token).await;
        if matches!(&attempt, Err(e) if e.kind() == ErrorKind::AlreadyExists)
            && self.is_stale(&path).await
        {
            tracing::warn!(lock = %name, "Breaking stale derivation lock");
            let _ = fs::remove_file(&path).await;
            attempt = Self::create(&path, &token).await;
        }

        match attempt {
            Ok(()) => {
                tracing::debug!(lock = %name, "Derivation lock acquired");
                Some(DerivationLock::new(name.clone(), move || {
                    // Only remove the file if it is still ours
                    if std::fs::read_to_string(&path).is_ok_and(|held| held == token) {
                        let _ = std::fs::remove_file(&path);
                    }
                }))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => None,
            Err(e) => {
                tracing::warn!(lock = %name, error = %e, "Lock backend unavailable");
                None
            }
        }
    }
}
