use crate::domain::{
    errors::ValidationError,
    value_objects::{BucketName, Locator, ObjectKey, StyleName},
};

/// First key segment of every derivative
pub const STYLES_PREFIX: &str = "styles";

/// Build the key a derivative of `original_key` is stored under.
///
/// Injective because style names never contain '/'.
pub fn derived_key(style: &StyleName, original_key: &ObjectKey) -> String {
    format!("{}/{}/{}", STYLES_PREFIX, style, original_key)
}

/// A derived artifact: an original object plus the style applied to it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedLocator {
    original: Locator,
    style: StyleName,
    derived: Locator,
}

impl DerivedLocator {
    pub fn new(original: Locator, style: StyleName) -> Result<Self, ValidationError> {
        if original.is_root() {
            return Err(ValidationError::InvalidDerivativePath {
                path: original.to_string(),
                reason: "a derivative needs an original object key".to_string(),
            });
        }

        let key = ObjectKey::new(derived_key(&style, original.key()))?;
        let derived = original.with_key(key);

        Ok(Self {
            original,
            style,
            derived,
        })
    }

    /// Parse a delivery path of the form `/<bucket>/styles/<style>/<key...>`
    pub fn from_request_path(path: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidDerivativePath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = path.trim_start_matches('/').splitn(4, '/').collect();
        if segments.len() < 4 || segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("expected /<bucket>/styles/<style>/<key>"));
        }
        if segments[1] != STYLES_PREFIX {
            return Err(invalid("second segment must be 'styles'"));
        }

        let bucket = BucketName::new(segments[0].to_string())?;
        let style = StyleName::new(segments[2].to_string())?;
        let key = ObjectKey::new(segments[3].to_string())?;

        Self::new(Locator::new(bucket, key), style)
    }

    /// Recognise a locator whose key lives under `styles/<style>/`
    pub fn from_locator(locator: &Locator) -> Option<Self> {
        let rest = locator.key().as_str().strip_prefix(STYLES_PREFIX)?.strip_prefix('/')?;
        let (style, original_key) = rest.split_once('/')?;
        let style = StyleName::new(style.to_string()).ok()?;
        let original_key = ObjectKey::new(original_key.to_string()).ok()?;
        Self::new(locator.with_key(original_key), style).ok()
    }

    pub fn original(&self) -> &Locator {
        &self.original
    }

    pub fn style(&self) -> &StyleName {
        &self.style
    }

    /// Where the derivative is stored
    pub fn derived(&self) -> &Locator {
        &self.derived
    }

    /// Path component served by the delivery endpoint, percent-encoded
    pub fn request_path(&self) -> String {
        format!("/{}/{}", self.derived.bucket(), self.derived.key().url_path())
    }
}

impl std::fmt::Display for DerivedLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.derived)
    }
}
