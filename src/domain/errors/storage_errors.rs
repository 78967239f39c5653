use crate::domain::{
    errors::{SigningError, ValidationError},
    value_objects::{BucketName, Locator},
};

/// Errors that can occur during storage operations
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Object not found
    ObjectNotFound { locator: Locator },

    /// Bucket does not exist (validated, not a transient failure)
    BucketNotFound { bucket: BucketName },

    /// The store refused the operation
    AccessDenied { locator: Locator, operation: String },

    /// Network or service failure; retry policy belongs to the client
    Transient { operation: String, message: String },

    /// The bucket validation call itself failed
    BucketValidation { bucket: BucketName, message: String },

    /// Object already exists (exclusive create)
    ObjectAlreadyExists { locator: Locator },

    /// Operation not supported by object storage
    UnsupportedOperation { operation: String, reason: String },

    /// A locator or key failed validation
    InvalidLocator(ValidationError),

    /// URL signing was requested without usable key material
    Signing(SigningError),
}

impl StorageError {
    pub fn transient(operation: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Transient {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    pub fn unsupported(operation: &str, reason: &str) -> Self {
        StorageError::UnsupportedOperation {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for the not-found family, which callers map to 404
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectNotFound { .. } | StorageError::BucketNotFound { .. }
        )
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::ObjectNotFound { locator } => {
                write!(f, "Object not found: {}", locator)
            }
            StorageError::BucketNotFound { bucket } => {
                write!(f, "Bucket not found: {}", bucket)
            }
            StorageError::AccessDenied { locator, operation } => {
                write!(
                    f,
                    "Access denied for operation '{}' on object: {}",
                    operation, locator
                )
            }
            StorageError::Transient { operation, message } => {
                write!(f, "Storage operation '{}' failed: {}", operation, message)
            }
            StorageError::BucketValidation { bucket, message } => {
                write!(f, "Could not validate bucket '{}': {}", bucket, message)
            }
            StorageError::ObjectAlreadyExists { locator } => {
                write!(f, "Object already exists: {}", locator)
            }
            StorageError::UnsupportedOperation { operation, reason } => {
                write!(f, "Unsupported operation '{}': {}", operation, reason)
            }
            StorageError::InvalidLocator(err) => write!(f, "{}", err),
            StorageError::Signing(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::InvalidLocator(err) => Some(err),
            StorageError::Signing(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StorageError {
    fn from(err: ValidationError) -> Self {
        StorageError::InvalidLocator(err)
    }
}

impl From<SigningError> for StorageError {
    fn from(err: SigningError) -> Self {
        StorageError::Signing(err)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
