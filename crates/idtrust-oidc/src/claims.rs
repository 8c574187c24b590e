//! Token claims and classification results

use idtrust_jose::Jwk;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::discovery::ProviderMetadata;

/// Identity claims extracted from a token before its signature is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub issuer: String,
    pub subject: String,
    /// Public key embedded by self-issued tokens
    pub sub_jwk: Option<Jwk>,
    /// `exp`, seconds since the epoch
    pub expires_at: Option<i64>,
    /// `iat`, seconds since the epoch
    pub issued_at: Option<i64>,
}

/// Identity provider product a token was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    Unknown,
    Okta,
    Duo,
    Ory,
    /// Discovered provider that matched no fingerprint rule
    GenericIdp,
    /// Token anchored in its own embedded key
    SelfIssued,
}

impl ProviderName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Okta => "okta",
            Self::Duo => "duo",
            Self::Ory => "ory",
            Self::GenericIdp => "idp",
            Self::SelfIssued => "self",
        }
    }

    pub fn is_self_issued(self) -> bool {
        self == Self::SelfIssued
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified token awaiting verification
///
/// Produced by [`Parser::parse_jwt`](crate::Parser::parse_jwt). Callers may reject on
/// [`provider`](Self::provider) alone before paying for signature verification.
#[derive(Debug, Clone)]
pub struct ParsedJwt {
    pub claims: Claims,
    pub provider: ProviderName,
    /// Issuer without the self-issued scheme, or the delegated issuer's hostname
    pub common_name: String,
    pub(crate) provider_metadata: Option<ProviderMetadata>,
    pub(crate) token: Arc<str>,
}

impl ParsedJwt {
    pub(crate) fn new(
        claims: Claims,
        provider: ProviderName,
        common_name: impl Into<String>,
        provider_metadata: Option<ProviderMetadata>,
        token: &str,
    ) -> Self {
        Self {
            claims,
            provider,
            common_name: common_name.into(),
            provider_metadata,
            token: Arc::from(token),
        }
    }

    /// Discovery document of a delegated issuer; `None` for self-issued tokens
    pub fn provider_metadata(&self) -> Option<&ProviderMetadata> {
        self.provider_metadata.as_ref()
    }

    /// The compact token this result was parsed from
    pub fn token(&self) -> &str {
        &self.token
    }
}
