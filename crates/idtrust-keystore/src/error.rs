//! Key store errors

use thiserror::Error;

/// Errors raised by key store construction and operations
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// Invalid or unsupported backend configuration; fatal at construction
    #[error("key store configuration error: {0}")]
    Configuration(String),

    /// No usable key under this id
    #[error("key not found: {id}")]
    KeyNotFound { id: String },

    /// The key cannot be stored as given
    #[error("invalid key '{id}': {reason}")]
    InvalidKey { id: String, reason: String },

    /// Local file access failed
    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be encoded or decoded
    #[error("{context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A remote secret manager rejected or failed the request
    #[error("{backend} {operation} failed for {resource}: {reason}")]
    Backend {
        backend: &'static str,
        operation: &'static str,
        resource: String,
        reason: String,
    },
}

impl KeyStoreError {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::KeyNotFound { id: id.to_owned() }
    }
}
