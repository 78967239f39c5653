use thiserror::Error;

/// Errors raised while producing CDN-signed URLs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SigningError {
    /// Signing was required but the key pair id or private key is absent
    #[error("CDN signing is not configured: missing {missing}")]
    Configuration { missing: &'static str },

    /// The private key material could not be parsed
    #[error("Invalid CDN private key: {reason}")]
    InvalidPrivateKey { reason: String },

    /// The RSA primitive failed
    #[error("Failed to sign policy: {reason}")]
    SignatureFailed { reason: String },

    /// The policy document could not be encoded
    #[error("Failed to encode signing policy: {reason}")]
    PolicyEncoding { reason: String },
}

pub type SigningResult<T> = Result<T, SigningError>;
