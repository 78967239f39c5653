use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::{DerivativeError, StorageError};

/// DTO for error responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: String,
    pub message: String,
    pub details: Option<HashMap<String, serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}

/// DTO for the health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponseDto {
    pub status: String,
    pub styles: usize,
    pub pending_uploads: usize,
    pub timestamp: DateTime<Utc>,
}

// Error response helpers

impl ErrorResponseDto {
    fn with_details(error: &str, message: String, details: HashMap<String, serde_json::Value>) -> Self {
        ErrorResponseDto {
            error: error.to_string(),
            message,
            details: if details.is_empty() {
                None
            } else {
                Some(details)
            },
            timestamp: Utc::now(),
        }
    }

    pub fn from_storage_error(error: &StorageError) -> Self {
        let mut details = HashMap::new();

        match error {
            StorageError::ObjectNotFound { locator }
            | StorageError::AccessDenied { locator, .. }
            | StorageError::ObjectAlreadyExists { locator } => {
                details.insert(
                    "locator".to_string(),
                    serde_json::Value::String(locator.to_string()),
                );
            }
            StorageError::BucketNotFound { bucket }
            | StorageError::BucketValidation { bucket, .. } => {
                details.insert(
                    "bucket".to_string(),
                    serde_json::Value::String(bucket.to_string()),
                );
            }
            _ => {}
        }

        Self::with_details("StorageError", error.to_string(), details)
    }

    pub fn from_derivative_error(error: &DerivativeError) -> Self {
        match error {
            DerivativeError::Storage(storage) => Self::from_storage_error(storage),
            DerivativeError::GenerationFailed { derivative, .. } => {
                let mut details = HashMap::new();
                details.insert(
                    "derivative".to_string(),
                    serde_json::Value::String(derivative.to_string()),
                );
                Self::with_details("GenerationFailed", error.to_string(), details)
            }
            DerivativeError::Staging { .. } => Self::internal_error(&error.to_string()),
        }
    }

    pub fn not_found(message: &str) -> Self {
        ErrorResponseDto {
            error: "NotFound".to_string(),
            message: message.to_string(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn internal_error(message: &str) -> Self {
        ErrorResponseDto {
            error: "InternalServerError".to_string(),
            message: message.to_string(),
            details: None,
            timestamp: Utc::now(),
        }
    }
}
