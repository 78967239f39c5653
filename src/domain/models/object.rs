use chrono::{DateTime, Utc};

use crate::domain::value_objects::{Locator, ObjectKey};

/// Metadata about a stored object, as reported by the store
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub locator: Locator,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
}

/// Filesystem-style view of a locator
#[derive(Debug, Clone, PartialEq)]
pub struct FileStat {
    pub exists: bool,
    pub is_dir: bool,
    pub size: u64,
    pub mtime: Option<DateTime<Utc>>,
}

impl FileStat {
    pub fn missing() -> Self {
        Self {
            exists: false,
            is_dir: false,
            size: 0,
            mtime: None,
        }
    }

    /// Directories are implied by key prefixes and carry no metadata
    pub fn directory() -> Self {
        Self {
            exists: true,
            is_dir: true,
            size: 0,
            mtime: None,
        }
    }

    pub fn file(size: u64, mtime: DateTime<Utc>) -> Self {
        Self {
            exists: true,
            is_dir: false,
            size,
            mtime: Some(mtime),
        }
    }
}

impl From<&ObjectInfo> for FileStat {
    fn from(info: &ObjectInfo) -> Self {
        FileStat::file(info.size, info.last_modified)
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Canned access-control policy applied on upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Acl {
    #[default]
    PublicRead,
    Private,
}

impl Acl {
    /// Value of the `x-amz-acl` header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Acl::PublicRead => "public-read",
            Acl::Private => "private",
        }
    }
}

/// Guess a MIME type from the key's extension
pub fn guess_content_type(key: &ObjectKey) -> &'static str {
    let ext = key
        .file_name()
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        let key = |k: &str| ObjectKey::new(k.to_string()).unwrap();
        assert_eq!(guess_content_type(&key("photos/cat.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(&key("reports/annual.pdf")), "application/pdf");
        assert_eq!(guess_content_type(&key("README")), "application/octet-stream");
    }
}
