//! Provider metadata resolution
//!
//! A delegated issuer is resolved in two steps:
//!
//! 1. OpenID Connect Discovery: `{issuer}/.well-known/openid-configuration`
//! 2. OAuth 2.0 Authorization Server Metadata (RFC 8414) as the fallback:
//!    `{origin}/.well-known/oauth-authorization-server{issuer path}`
//!
//! Both documents only need to yield a `jwks_uri`. The JWKS endpoint is then probed
//! once and the response fingerprinted to name the provider product.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::claims::ProviderName;
use crate::fingerprint;
use crate::http::{DEFAULT_MAX_RESPONSE_BYTES, HttpFetcher, HttpResponse, get_with_deadline};
use crate::{OidcError, Result};

/// The subset of a discovery document this crate relies on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub token_endpoint: String,
    pub jwks_uri: String,
}

/// Build the OIDC Discovery URL
///
/// Always `{issuer}/.well-known/openid-configuration`, keeping the issuer path.
pub fn oidc_discovery_url(issuer: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    )
}

/// Build the RFC 8414 discovery URL
///
/// For issuer without path: `https://example.com/.well-known/oauth-authorization-server`
/// For issuer with path: `https://example.com/.well-known/oauth-authorization-server/path`
pub fn oauth_discovery_url(issuer: &str) -> Result<String> {
    let mut url = Url::parse(issuer)
        .map_err(|e| OidcError::MalformedToken(format!("issuer '{issuer}' is not a URL: {e}")))?;

    let path = url.path().trim_end_matches('/');
    let discovery_path = if path.is_empty() {
        "/.well-known/oauth-authorization-server".to_string()
    } else {
        format!("/.well-known/oauth-authorization-server{path}")
    };

    url.set_path(&discovery_path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Resolves issuers to provider metadata and fingerprints their JWKS endpoints
#[derive(Clone)]
pub struct ProviderResolver {
    fetcher: Arc<dyn HttpFetcher>,
    request_timeout: Duration,
    max_response_bytes: u64,
}

impl std::fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderResolver")
            .field("request_timeout", &self.request_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish_non_exhaustive()
    }
}

impl ProviderResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, request_timeout: Duration) -> Self {
        Self {
            fetcher,
            request_timeout,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Rejects bodies above `max_bytes`, whatever the fetcher let through
    pub fn with_max_response_bytes(mut self, max_bytes: u64) -> Self {
        self.max_response_bytes = max_bytes;
        self
    }

    /// Fetch provider metadata for an issuer
    ///
    /// Tries OIDC Discovery first and RFC 8414 second.
    ///
    /// # Errors
    ///
    /// [`OidcError::DiscoveryFailed`] carrying both causes when neither document
    /// could be used, [`OidcError::Cancelled`] or [`OidcError::Timeout`] as soon as
    /// either request is aborted.
    pub async fn discover(
        &self,
        issuer: &str,
        cancel: &CancellationToken,
    ) -> Result<ProviderMetadata> {
        let oidc_url = oidc_discovery_url(issuer);
        debug!(url = %oidc_url, "Trying OIDC discovery");

        let oidc_error = match self.fetch_metadata(&oidc_url, cancel).await {
            Ok(metadata) => return Ok(metadata),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => e,
        };
        warn!(issuer, error = %oidc_error, "OIDC discovery failed, falling back to OAuth metadata");

        let oauth_result = match oauth_discovery_url(issuer) {
            Ok(oauth_url) => {
                debug!(url = %oauth_url, "Trying OAuth authorization server metadata");
                self.fetch_metadata(&oauth_url, cancel).await
            }
            Err(e) => Err(e),
        };

        match oauth_result {
            Ok(metadata) => Ok(metadata),
            Err(e) if e.is_cancelled() => Err(e),
            Err(oauth_error) => Err(OidcError::DiscoveryFailed {
                issuer: issuer.to_owned(),
                oidc: oidc_error.to_string(),
                oauth: oauth_error.to_string(),
            }),
        }
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ProviderMetadata> {
        let response = self.get(url, cancel).await?;
        if !response.is_success() {
            return Err(OidcError::HttpStatus {
                url: url.to_owned(),
                status: response.status,
            });
        }

        let metadata: ProviderMetadata =
            serde_json::from_str(&response.body).map_err(|e| OidcError::InvalidDocument {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        if metadata.jwks_uri.trim().is_empty() {
            return Err(OidcError::InvalidDocument {
                url: url.to_owned(),
                reason: "jwks_uri is empty".to_string(),
            });
        }
        Ok(metadata)
    }

    /// Probes the JWKS endpoint once and names the provider from the response
    ///
    /// # Errors
    ///
    /// Transport failures, cancellation and timeouts. The response status does not
    /// matter for fingerprinting.
    pub async fn fingerprint(
        &self,
        metadata: &ProviderMetadata,
        cancel: &CancellationToken,
    ) -> Result<ProviderName> {
        let response = self.get(&metadata.jwks_uri, cancel).await?;
        let host = Url::parse(&metadata.jwks_uri)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_default();

        let provider = fingerprint::classify(&response.headers, &host);
        debug!(jwks_uri = %metadata.jwks_uri, %provider, "Fingerprinted JWKS endpoint");
        Ok(provider)
    }

    pub(crate) async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        let response =
            get_with_deadline(self.fetcher.as_ref(), url, self.request_timeout, cancel).await?;
        if response.body.len() as u64 > self.max_response_bytes {
            return Err(OidcError::ResponseTooLarge {
                url: url.to_owned(),
                limit: self.max_response_bytes,
            });
        }
        Ok(response)
    }
}
