/// Validation errors for domain value objects
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    // Locator errors
    MalformedLocator {
        uri: String,
        reason: String,
    },
    MissingDefaultBucket,

    // ObjectKey validation errors
    ObjectKeyTooLong {
        actual: usize,
        max: usize,
    },
    InvalidObjectKeyCharacter(char),
    ObjectKeyStartsWithSlash,
    ObjectKeyContainsDoubleSlash,

    // BucketName validation errors
    BucketNameTooShort {
        actual: usize,
        min: usize,
    },
    BucketNameTooLong {
        actual: usize,
        max: usize,
    },
    BucketNameInvalidStart,
    BucketNameInvalidEnd,
    BucketNameInvalidCharacter(char),
    BucketNameConsecutiveHyphens,
    BucketNameInvalidDotPlacement,
    BucketNameLooksLikeIpAddress,

    // Derivative path errors
    EmptyStyleName,
    StyleNameTooLong {
        actual: usize,
        max: usize,
    },
    InvalidStyleNameCharacter(char),
    InvalidDerivativePath {
        path: String,
        reason: String,
    },

    // Configuration patterns
    InvalidPattern {
        pattern: String,
        reason: String,
    },
}

impl ValidationError {
    /// Wrap a lower-level violation as a malformed locator for `uri`
    pub fn malformed(uri: &str, reason: impl std::fmt::Display) -> Self {
        ValidationError::MalformedLocator {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MalformedLocator { uri, reason } => {
                write!(f, "Malformed locator '{}': {}", uri, reason)
            }
            ValidationError::MissingDefaultBucket => {
                write!(f, "No default bucket is configured")
            }

            // ObjectKey errors
            ValidationError::ObjectKeyTooLong { actual, max } => {
                write!(f, "Object key too long: {} bytes (max: {})", actual, max)
            }
            ValidationError::InvalidObjectKeyCharacter(c) => {
                write!(f, "Invalid character in object key: '{}'", c.escape_default())
            }
            ValidationError::ObjectKeyStartsWithSlash => {
                write!(f, "Object key cannot start with '/'")
            }
            ValidationError::ObjectKeyContainsDoubleSlash => {
                write!(f, "Object key cannot contain '//'")
            }

            // BucketName errors
            ValidationError::BucketNameTooShort { actual, min } => {
                write!(
                    f,
                    "Bucket name too short: {} characters (min: {})",
                    actual, min
                )
            }
            ValidationError::BucketNameTooLong { actual, max } => {
                write!(
                    f,
                    "Bucket name too long: {} characters (max: {})",
                    actual, max
                )
            }
            ValidationError::BucketNameInvalidStart => {
                write!(f, "Bucket name must start with lowercase letter or number")
            }
            ValidationError::BucketNameInvalidEnd => {
                write!(f, "Bucket name must end with lowercase letter or number")
            }
            ValidationError::BucketNameInvalidCharacter(c) => {
                write!(
                    f,
                    "Invalid character in bucket name: '{}'. Only lowercase letters, numbers, dots and hyphens allowed",
                    c
                )
            }
            ValidationError::BucketNameConsecutiveHyphens => {
                write!(f, "Bucket name cannot contain consecutive hyphens")
            }
            ValidationError::BucketNameInvalidDotPlacement => {
                write!(f, "Bucket name dots cannot be adjacent to another dot or a hyphen")
            }
            ValidationError::BucketNameLooksLikeIpAddress => {
                write!(f, "Bucket name cannot be formatted as an IP address")
            }

            // Style errors
            ValidationError::EmptyStyleName => write!(f, "Style name cannot be empty"),
            ValidationError::StyleNameTooLong { actual, max } => {
                write!(
                    f,
                    "Style name too long: {} characters (max: {})",
                    actual, max
                )
            }
            ValidationError::InvalidStyleNameCharacter(c) => {
                write!(
                    f,
                    "Invalid character in style name: '{}'. Only lowercase letters, numbers, '_' and '-' allowed",
                    c
                )
            }
            ValidationError::InvalidDerivativePath { path, reason } => {
                write!(f, "Invalid derivative path '{}': {}", path, reason)
            }

            ValidationError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid path pattern '{}': {}", pattern, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
