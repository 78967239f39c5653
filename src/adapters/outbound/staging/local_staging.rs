use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use crate::domain::{
    errors::{DerivativeError, DerivativeResult},
    value_objects::{DerivedLocator, STYLES_PREFIX},
};

/// Top-level directory holding the content type of each staged file
const CONTENT_TYPES_DIR: &str = "content-types";

/// A derivative waiting in the staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub content_type: String,
}

/// Process-local directory holding freshly generated derivatives until they
/// have been uploaded.
///
/// Layout: `<root>/styles/<style>/<bucket>/<original key>`, with the content
/// type the deriver produced mirrored under `<root>/content-types/`. Files
/// only appear complete: they are written under a temporary name and renamed
/// into place, content type first.
#[derive(Debug, Clone)]
pub struct LocalStaging {
    root: PathBuf,
}

impl LocalStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, derivative: &DerivedLocator) -> PathBuf {
        self.layout(STYLES_PREFIX, derivative)
    }

    fn content_type_path(&self, derivative: &DerivedLocator) -> PathBuf {
        self.layout(CONTENT_TYPES_DIR, derivative)
    }

    fn layout(&self, top: &str, derivative: &DerivedLocator) -> PathBuf {
        let original = derivative.original();
        let mut path = self
            .root
            .join(top)
            .join(derivative.style().as_str())
            .join(original.bucket().as_str());
        // Dot segments are legal in keys but must not climb out of the root
        for segment in original.key().as_str().split('/') {
            match segment {
                "." | ".." => path.push(segment.replace('.', "%2E")),
                _ => path.push(segment),
            }
        }
        path
    }

    /// Atomically publish `data` for `derivative`
    pub async fn stage(
        &self,
        derivative: &DerivedLocator,
        data: &[u8],
        content_type: &str,
    ) -> DerivativeResult<StagedFile> {
        let path = self.path_for(derivative);
        self.publish(&self.content_type_path(derivative), content_type.as_bytes())
            .await?;
        self.publish(&path, data).await?;

        tracing::debug!(path = %path.display(), size = data.len(), content_type, "Staged derivative");
        Ok(StagedFile {
            path,
            content_type: content_type.to_string(),
        })
    }

    async fn publish(&self, path: &Path, data: &[u8]) -> DerivativeResult<()> {
        let parent = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| staging_error(parent, e))?;

        let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, data)
            .await
            .map_err(|e| staging_error(&temp_path, e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(staging_error(path, e));
        }
        Ok(())
    }

    /// The staged file for `derivative`, if one is present
    pub async fn find(&self, derivative: &DerivedLocator) -> Option<StagedFile> {
        let path = self.path_for(derivative);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return None,
        }
        // Removed together with the data; missing means cleanup is under way
        let content_type = tokio::fs::read_to_string(self.content_type_path(derivative))
            .await
            .ok()?;
        Some(StagedFile { path, content_type })
    }

    pub async fn read(&self, path: &Path) -> DerivativeResult<Bytes> {
        tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| staging_error(path, e))
    }

    /// Best effort; missing files are not an error
    pub async fn remove(&self, derivative: &DerivedLocator) {
        for path in [self.path_for(derivative), self.content_type_path(derivative)] {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file");
                }
            }
        }
    }
}

fn staging_error(path: &Path, e: std::io::Error) -> DerivativeError {
    DerivativeError::Staging {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
