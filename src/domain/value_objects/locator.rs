use crate::domain::{
    errors::ValidationError,
    value_objects::{BucketName, ObjectKey},
};

/// Scheme recognised by the stream wrapper
pub const SCHEME: &str = "s3";

const SCHEME_PREFIX: &str = "s3://";

/// A storage address: a bucket plus a key inside it.
///
/// `Display` produces the canonical `s3://bucket/key` form and
/// `Locator::parse` reads it back losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    bucket: BucketName,
    key: ObjectKey,
}

/// Result of parsing a locator string.
///
/// A bare `s3://` is not an error: it stands for "the configured default bucket".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedUri {
    DefaultBucket,
    Locator(Locator),
}

impl ParsedUri {
    /// Turn the sentinel into the root of `default_bucket`
    pub fn resolve(self, default_bucket: Option<&BucketName>) -> Result<Locator, ValidationError> {
        match self {
            ParsedUri::Locator(locator) => Ok(locator),
            ParsedUri::DefaultBucket => default_bucket
                .map(|bucket| Locator::root(bucket.clone()))
                .ok_or(ValidationError::MissingDefaultBucket),
        }
    }
}

impl Locator {
    pub fn new(bucket: BucketName, key: ObjectKey) -> Self {
        Self { bucket, key }
    }

    /// The root of a bucket
    pub fn root(bucket: BucketName) -> Self {
        Self {
            bucket,
            key: ObjectKey::root(),
        }
    }

    /// Parse `s3://bucket/key`, `s3://bucket` or the bare `s3://` sentinel
    pub fn parse(uri: &str) -> Result<ParsedUri, ValidationError> {
        let rest = uri
            .strip_prefix(SCHEME_PREFIX)
            .ok_or_else(|| ValidationError::malformed(uri, "expected the 's3://' scheme prefix"))?;

        if rest.is_empty() {
            return Ok(ParsedUri::DefaultBucket);
        }

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(ValidationError::malformed(uri, "bucket is empty"));
        }

        let bucket =
            BucketName::new(bucket.to_string()).map_err(|e| ValidationError::malformed(uri, e))?;
        let key = ObjectKey::new(key.to_string()).map_err(|e| ValidationError::malformed(uri, e))?;

        Ok(ParsedUri::Locator(Self { bucket, key }))
    }

    /// Parse a locator that must name its bucket explicitly
    pub fn parse_explicit(uri: &str) -> Result<Self, ValidationError> {
        match Self::parse(uri)? {
            ParsedUri::Locator(locator) => Ok(locator),
            ParsedUri::DefaultBucket => Err(ValidationError::malformed(uri, "bucket is required")),
        }
    }

    pub fn bucket(&self) -> &BucketName {
        &self.bucket
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn is_root(&self) -> bool {
        self.key.is_root()
    }

    /// Same bucket, different key
    pub fn with_key(&self, key: ObjectKey) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }

    /// Strip the last path segment; a single-segment key yields the bucket root
    pub fn dirname(&self) -> Self {
        self.with_key(self.key.parent())
    }

    pub fn basename(&self) -> &str {
        self.key.file_name()
    }

    pub fn join(&self, segment: &str) -> Result<Self, ValidationError> {
        Ok(self.with_key(self.key.join(segment)?))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_root() {
            write!(f, "{}{}", SCHEME_PREFIX, self.bucket)
        } else {
            write!(f, "{}{}/{}", SCHEME_PREFIX, self.bucket, self.key)
        }
    }
}

impl std::str::FromStr for Locator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_explicit(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(uri: &str) -> Locator {
        Locator::parse_explicit(uri).unwrap()
    }

    #[test]
    fn test_parse_bucket_and_key() {
        let loc = locator("s3://media/photos/cat.jpg");
        assert_eq!(loc.bucket().as_str(), "media");
        assert_eq!(loc.key().as_str(), "photos/cat.jpg");
    }

    #[test]
    fn test_bare_scheme_is_default_bucket_sentinel() {
        assert_eq!(Locator::parse("s3://").unwrap(), ParsedUri::DefaultBucket);

        let default = BucketName::new("fallback".to_string()).unwrap();
        let resolved = ParsedUri::DefaultBucket.resolve(Some(&default)).unwrap();
        assert_eq!(resolved.to_string(), "s3://fallback");

        assert_eq!(
            ParsedUri::DefaultBucket.resolve(None),
            Err(ValidationError::MissingDefaultBucket)
        );
    }

    #[test]
    fn test_malformed_locators() {
        for uri in [
            "media/photos/cat.jpg",
            "http://media/cat.jpg",
            "s3:///cat.jpg",
            "s3://Invalid_Bucket!/cat.jpg",
            "s3://media//cat.jpg",
        ] {
            assert!(
                matches!(
                    Locator::parse(uri),
                    Err(ValidationError::MalformedLocator { .. })
                ),
                "expected {uri} to be malformed"
            );
        }
    }

    #[test]
    fn test_round_trip() {
        for uri in [
            "s3://media",
            "s3://media/",
            "s3://media/a.txt",
            "s3://media/photos/2024/cat.jpg",
            "s3://media/photos/",
            "s3://my-bucket-1/with space/ünïcode.png",
        ] {
            let parsed = locator(uri);
            let reparsed = locator(&parsed.to_string());
            assert_eq!(parsed, reparsed, "round trip failed for {uri}");
        }
    }

    #[test]
    fn test_dirname() {
        assert_eq!(
            locator("s3://media/photos/2024/cat.jpg").dirname(),
            locator("s3://media/photos/2024")
        );
        let top = locator("s3://media/cat.jpg").dirname();
        assert!(top.is_root());
        assert_eq!(top.bucket().as_str(), "media");
        assert!(locator("s3://media").dirname().is_root());
    }
}
