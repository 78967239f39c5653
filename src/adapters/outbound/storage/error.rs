use crate::domain::{
    errors::{DerivativeError, StorageError},
    value_objects::Locator,
};

/// Convert an object_store error raised while operating on `locator`
pub fn map_store_error(err: object_store::Error, locator: &Locator, operation: &str) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::ObjectNotFound {
            locator: locator.clone(),
        },
        object_store::Error::AlreadyExists { .. } => StorageError::ObjectAlreadyExists {
            locator: locator.clone(),
        },
        object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. } => StorageError::AccessDenied {
            locator: locator.clone(),
            operation: operation.to_string(),
        },
        object_store::Error::NotSupported { .. } | object_store::Error::NotImplemented => {
            StorageError::unsupported(operation, &err.to_string())
        }
        _ => StorageError::transient(operation, err),
    }
}

/// Convert domain StorageError to HTTP status codes for API responses
impl From<&StorageError> for http::StatusCode {
    fn from(err: &StorageError) -> Self {
        match err {
            StorageError::ObjectNotFound { .. } | StorageError::BucketNotFound { .. } => {
                http::StatusCode::NOT_FOUND
            }
            StorageError::InvalidLocator(_) => http::StatusCode::BAD_REQUEST,
            StorageError::AccessDenied { .. } => http::StatusCode::FORBIDDEN,
            StorageError::ObjectAlreadyExists { .. } => http::StatusCode::CONFLICT,
            StorageError::UnsupportedOperation { .. } => http::StatusCode::NOT_IMPLEMENTED,
            StorageError::Transient { .. }
            | StorageError::BucketValidation { .. }
            | StorageError::Signing(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&DerivativeError> for http::StatusCode {
    fn from(err: &DerivativeError) -> Self {
        match err {
            DerivativeError::Storage(storage) => storage.into(),
            DerivativeError::GenerationFailed { .. } | DerivativeError::Staging { .. } => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
