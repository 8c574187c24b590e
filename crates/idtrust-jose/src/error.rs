//! Error types for key and signature operations

use thiserror::Error;

/// Errors raised by key generation, validation and JWS handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoseError {
    /// The algorithm has no registered implementation
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key is empty, incomplete or inconsistent for the requested operation
    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Signature verification failed
    #[error("invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// The compact serialization could not be decoded
    #[error("malformed JWS: {reason}")]
    MalformedJws { reason: String },

    /// The underlying primitive failed to produce a key or signature
    #[error("cryptographic operation failed: {reason}")]
    Crypto { reason: String },

    /// JSON encoding of a key or key set failed
    #[error("serialization failed: {reason}")]
    Serialization { reason: String },
}

impl JoseError {
    pub(crate) fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedJws {
            reason: reason.into(),
        }
    }

    pub(crate) fn crypto(reason: impl Into<String>) -> Self {
        Self::Crypto {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for JoseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
