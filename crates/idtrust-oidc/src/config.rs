//! Parser configuration

use std::time::Duration;

/// Configuration for [`TokenParser`](crate::TokenParser)
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Bound on every discovery and JWKS request (default: 5 seconds)
    pub request_timeout: Duration,

    /// Lifetime of a cached JWKS (default: 24 hours)
    pub jwks_cache_ttl: Duration,

    /// Total size of cached JWKS bodies (default: 10 MiB)
    pub jwks_cache_max_bytes: u64,

    /// Largest discovery or JWKS response body accepted (default: 1 MiB)
    pub max_response_bytes: u64,

    /// Clock tolerance for `exp`, `nbf` and `iat` (default: 5 seconds)
    pub acceptable_skew: Duration,

    /// Accept discovered providers that match no fingerprint rule (default: true)
    pub allow_generic_idp: bool,

    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            jwks_cache_ttl: Duration::from_secs(86400), // 24 hours
            jwks_cache_max_bytes: 10 * 1024 * 1024,     // 10 MiB
            max_response_bytes: 1024 * 1024,            // 1 MiB
            acceptable_skew: Duration::from_secs(5),
            allow_generic_idp: true,
            user_agent: format!("idtrust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ParserConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    pub fn with_jwks_cache_max_bytes(mut self, max_bytes: u64) -> Self {
        self.jwks_cache_max_bytes = max_bytes;
        self
    }

    pub fn with_max_response_bytes(mut self, max_bytes: u64) -> Self {
        self.max_response_bytes = max_bytes;
        self
    }

    pub fn with_acceptable_skew(mut self, skew: Duration) -> Self {
        self.acceptable_skew = skew;
        self
    }

    pub fn with_allow_generic_idp(mut self, allow: bool) -> Self {
        self.allow_generic_idp = allow;
        self
    }
}
