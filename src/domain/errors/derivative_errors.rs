use crate::domain::{errors::StorageError, value_objects::DerivedLocator};

/// Errors specific to on-demand derivative generation
#[derive(Debug, Clone)]
pub enum DerivativeError {
    /// Storage failure while checking, reading or publishing
    Storage(StorageError),

    /// The derive operation failed; fatal for the request
    GenerationFailed {
        derivative: DerivedLocator,
        reason: String,
    },

    /// The local staging area could not be written or read
    Staging { path: String, reason: String },
}

impl std::fmt::Display for DerivativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DerivativeError::Storage(err) => write!(f, "{}", err),
            DerivativeError::GenerationFailed { derivative, reason } => {
                write!(
                    f,
                    "Failed to generate derivative '{}': {}",
                    derivative, reason
                )
            }
            DerivativeError::Staging { path, reason } => {
                write!(f, "Staging error at '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for DerivativeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DerivativeError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for DerivativeError {
    fn from(err: StorageError) -> Self {
        DerivativeError::Storage(err)
    }
}

/// Result type for derivative operations
pub type DerivativeResult<T> = Result<T, DerivativeError>;
