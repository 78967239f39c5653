use crate::domain::errors::ValidationError;

/// A validated object key (path) inside a bucket.
///
/// The empty key is valid and denotes the bucket root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub const MAX_LEN: usize = 1024;

    /// Create a new ObjectKey with validation
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.len() > Self::MAX_LEN {
            return Err(ValidationError::ObjectKeyTooLong {
                actual: value.len(),
                max: Self::MAX_LEN,
            });
        }

        // Check for invalid characters (null bytes)
        if value.contains('\0') {
            return Err(ValidationError::InvalidObjectKeyCharacter('\0'));
        }

        // Check for invalid patterns
        if value.starts_with('/') {
            return Err(ValidationError::ObjectKeyStartsWithSlash);
        }

        if value.contains("//") {
            return Err(ValidationError::ObjectKeyContainsDoubleSlash);
        }

        Ok(Self(value))
    }

    /// The bucket root
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the directory part of the key (everything before the last '/').
    /// A key without a separator has the root as its parent.
    pub fn parent(&self) -> ObjectKey {
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) => Self(trimmed[..idx].to_string()),
            None => Self::root(),
        }
    }

    /// Get the file name part of the key (everything after the last '/')
    pub fn file_name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        trimmed.rfind('/').map_or(trimmed, |idx| &trimmed[idx + 1..])
    }

    /// Check if this key has the given prefix
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Prefix used to list the children of this key as a directory
    pub fn as_dir_prefix(&self) -> String {
        if self.is_root() || self.0.ends_with('/') {
            self.0.clone()
        } else {
            format!("{}/", self.0)
        }
    }

    /// Percent-encode each segment for use in a URL path
    pub fn url_path(&self) -> String {
        self.0
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Join this key with a suffix
    pub fn join(&self, suffix: &str) -> Result<ObjectKey, ValidationError> {
        if self.is_root() {
            return ObjectKey::new(suffix.to_string());
        }
        let mut new_key = self.0.clone();
        if !new_key.ends_with('/') && !suffix.starts_with('/') {
            new_key.push('/');
        }
        new_key.push_str(suffix);
        ObjectKey::new(new_key)
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
