//! Token parsing and verification errors

use idtrust_jose::JoseError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while classifying or verifying a token
#[derive(Debug, Clone, Error)]
pub enum OidcError {
    /// The token could not be decoded or lacks a required claim
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// `exp` is in the past
    #[error("token expired at {exp}")]
    Expired { exp: i64 },

    /// `nbf` or `iat` is in the future
    #[error("token not valid yet: {claim} = {value}")]
    NotYetValid { claim: &'static str, value: i64 },

    /// Neither OIDC nor OAuth discovery produced provider metadata
    #[error("discovery failed for issuer {issuer}: OIDC: {oidc}; OAuth: {oauth}")]
    DiscoveryFailed {
        issuer: String,
        oidc: String,
        oauth: String,
    },

    /// The provider did not match any known product and policy rejects unknown ones
    #[error("issuer {issuer} is not a recognized identity provider")]
    UntrustedProvider { issuer: String },

    /// Signature verification failed; never retried
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Signing primitive failure while issuing a token
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    /// Verification of a delegated token was attempted without resolved metadata
    #[error("token has no resolved provider metadata")]
    MissingProviderMetadata,

    /// Transport-level failure
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// Non-success HTTP status
    #[error("request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },

    /// The response body exceeds the configured limit
    #[error("response from {url} exceeds {limit} bytes")]
    ResponseTooLarge { url: String, limit: u64 },

    /// The provider served a body that is not the expected document
    #[error("invalid document from {url}: {reason}")]
    InvalidDocument { url: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OidcError {
    /// Trust in the issuer could not be established. The fix is configuration or
    /// provider-side, not rejecting the token as forged.
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryFailed { .. } | Self::UntrustedProvider { .. }
        )
    }

    /// The token itself is bad and should be rejected outright
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature(_)
                | Self::MalformedToken(_)
                | Self::Expired { .. }
                | Self::NotYetValid { .. }
        )
    }

    /// The call was aborted by its caller or by the request deadline
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::Timeout { .. })
    }
}

impl From<JoseError> for OidcError {
    fn from(err: JoseError) -> Self {
        match err {
            JoseError::InvalidSignature { reason } => Self::InvalidSignature(reason),
            JoseError::UnsupportedAlgorithm(alg) => Self::UnsupportedAlgorithm(alg),
            JoseError::InvalidKey { reason } => Self::InvalidKey(reason),
            JoseError::MalformedJws { reason } => Self::MalformedToken(reason),
            JoseError::Crypto { reason } | JoseError::Serialization { reason } => {
                Self::Crypto(reason)
            }
        }
    }
}
