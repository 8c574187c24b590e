//! Two-phase token pipeline
//!
//! [`Parser::parse_jwt`] decodes a token without checking its signature and
//! classifies the issuer. Self-issued tokens are classified locally; delegated
//! tokens cost one discovery round and one JWKS probe. [`Parser::verify_jwt`] then
//! checks the signature, against the embedded `sub_jwk` for self-issued tokens and
//! against the issuer's (cached) JWKS otherwise. Verification failures are final.

use async_trait::async_trait;
use idtrust_jose::{Jwk, Jwks, decode_unverified, verify_with_set};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info_span, warn};
use url::Url;

use crate::cache::{JwksCache, MokaJwksCache};
use crate::claims::{Claims, ParsedJwt, ProviderName};
use crate::config::ParserConfig;
use crate::discovery::ProviderResolver;
use crate::http::{HttpFetcher, ReqwestFetcher};
use crate::self_issue::{is_self_issued, self_issued_common_name};
use crate::{OidcError, Result};

/// Token classification and verification
#[async_trait]
pub trait Parser: Send + Sync {
    /// Decodes and classifies a token. The signature is not checked.
    async fn parse_jwt(&self, token: &str, cancel: &CancellationToken) -> Result<ParsedJwt>;

    /// Verifies the signature of a previously parsed token
    async fn verify_jwt(&self, parsed: &ParsedJwt, cancel: &CancellationToken) -> Result<()>;

    /// Runs [`parse_jwt`](Self::parse_jwt) then [`verify_jwt`](Self::verify_jwt)
    async fn parse_and_verify_jwt(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<ParsedJwt> {
        let parsed = self.parse_jwt(token, cancel).await?;
        self.verify_jwt(&parsed, cancel).await?;
        Ok(parsed)
    }
}

/// Claims as they appear on the wire
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    sub_jwk: Option<serde_json::Value>,
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    nbf: Option<f64>,
    #[serde(default)]
    iat: Option<f64>,
}

/// The production [`Parser`]
pub struct TokenParser {
    config: ParserConfig,
    resolver: ProviderResolver,
    cache: Arc<dyn JwksCache>,
    span: Span,
}

impl std::fmt::Debug for TokenParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenParser")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl TokenParser {
    /// Creates a parser with a `reqwest` fetcher and an in-memory JWKS cache
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] if the HTTP client cannot be built
    pub fn new(config: ParserConfig) -> Result<Self> {
        let fetcher = ReqwestFetcher::new(config.request_timeout, &config.user_agent)?
            .with_max_response_bytes(config.max_response_bytes);
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Creates a parser over a caller-supplied HTTP capability
    pub fn with_fetcher(config: ParserConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        let cache = Arc::new(MokaJwksCache::new(
            config.jwks_cache_ttl,
            config.jwks_cache_max_bytes,
        ));
        Self {
            resolver: ProviderResolver::new(fetcher, config.request_timeout)
                .with_max_response_bytes(config.max_response_bytes),
            cache,
            span: info_span!("token_parser"),
            config,
        }
    }

    /// Replaces the JWKS cache
    pub fn with_cache(mut self, cache: Arc<dyn JwksCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the span every operation is recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn extract_claims(&self, token: &str) -> Result<Claims> {
        let decoded = decode_unverified(token)
            .map_err(|e| OidcError::MalformedToken(e.to_string()))?;
        let raw: RawClaims = serde_json::from_slice(&decoded.payload)
            .map_err(|e| OidcError::MalformedToken(format!("claims are not a JSON object: {e}")))?;

        let issuer = raw
            .iss
            .filter(|iss| !iss.is_empty())
            .ok_or_else(|| OidcError::MalformedToken("missing 'iss' claim".to_string()))?;
        let subject = raw
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| OidcError::MalformedToken("missing 'sub' claim".to_string()))?;
        let sub_jwk = raw
            .sub_jwk
            .map(serde_json::from_value::<Jwk>)
            .transpose()
            .map_err(|e| OidcError::MalformedToken(format!("'sub_jwk' is not a JWK: {e}")))?;

        let exp = raw.exp.map(to_seconds);
        self.check_time(exp, raw.nbf.map(to_seconds), raw.iat.map(to_seconds))?;

        Ok(Claims {
            issuer,
            subject,
            sub_jwk,
            expires_at: exp,
            issued_at: raw.iat.map(to_seconds),
        })
    }

    fn check_time(&self, exp: Option<i64>, nbf: Option<i64>, iat: Option<i64>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let skew = i64::try_from(self.config.acceptable_skew.as_secs()).unwrap_or(i64::MAX);

        if let Some(exp) = exp
            && now.saturating_sub(skew) >= exp
        {
            return Err(OidcError::Expired { exp });
        }
        for (claim, value) in [("nbf", nbf), ("iat", iat)] {
            if let Some(value) = value
                && value > now.saturating_add(skew)
            {
                return Err(OidcError::NotYetValid { claim, value });
            }
        }
        Ok(())
    }

    /// Cached JWKS for `issuer`, fetched from `jwks_uri` on a miss
    async fn jwks_for(
        &self,
        issuer: &str,
        jwks_uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Jwks> {
        if let Some(raw) = self.cache.get(issuer).await {
            match Jwks::from_json(&raw) {
                Ok(jwks) => {
                    debug!(issuer, "JWKS cache hit");
                    return Ok(jwks);
                }
                Err(e) => {
                    warn!(issuer, error = %e, "Discarding unreadable cached JWKS");
                    self.cache.invalidate(issuer).await;
                }
            }
        }

        let response = self.resolver.get(jwks_uri, cancel).await?;
        if !response.is_success() {
            return Err(OidcError::HttpStatus {
                url: jwks_uri.to_owned(),
                status: response.status,
            });
        }
        let jwks = Jwks::from_json(&response.body).map_err(|e| OidcError::InvalidDocument {
            url: jwks_uri.to_owned(),
            reason: e.to_string(),
        })?;
        debug!(issuer, keys = jwks.keys.len(), "Fetched JWKS");

        if let Err(e) = self.cache.insert(issuer, Arc::from(response.body)).await {
            warn!(issuer, error = %e, "Failed to cache JWKS");
        }
        Ok(jwks)
    }
}

fn to_seconds(value: f64) -> i64 {
    // NumericDate may carry a fraction; saturating cast
    value as i64
}

fn issuer_host(issuer: &str) -> Result<String> {
    Url::parse(issuer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .ok_or_else(|| OidcError::MalformedToken(format!("issuer '{issuer}' has no host")))
}

#[async_trait]
impl Parser for TokenParser {
    async fn parse_jwt(&self, token: &str, cancel: &CancellationToken) -> Result<ParsedJwt> {
        async {
            let claims = self.extract_claims(token)?;

            if is_self_issued(&claims.issuer) {
                let common_name = self_issued_common_name(&claims.issuer).to_owned();
                debug!(issuer = %claims.issuer, "Classified self-issued token");
                return Ok(ParsedJwt::new(
                    claims,
                    ProviderName::SelfIssued,
                    common_name,
                    None,
                    token,
                ));
            }

            let metadata = self.resolver.discover(&claims.issuer, cancel).await?;
            let provider = self.resolver.fingerprint(&metadata, cancel).await?;

            if provider == ProviderName::GenericIdp && !self.config.allow_generic_idp {
                warn!(issuer = %claims.issuer, "Rejecting unrecognized identity provider");
                return Err(OidcError::UntrustedProvider {
                    issuer: claims.issuer,
                });
            }

            let common_name = issuer_host(&claims.issuer)?;
            debug!(issuer = %claims.issuer, %provider, "Classified delegated token");
            Ok::<_, OidcError>(ParsedJwt::new(
                claims,
                provider,
                common_name,
                Some(metadata),
                token,
            ))
        }
        .instrument(self.span.clone())
        .await
    }

    async fn verify_jwt(&self, parsed: &ParsedJwt, cancel: &CancellationToken) -> Result<()> {
        async {
            let jwks = if parsed.provider.is_self_issued() {
                let key = parsed.claims.sub_jwk.as_ref().ok_or_else(|| {
                    OidcError::MalformedToken("self-issued token has no 'sub_jwk' claim".into())
                })?;
                key.public_key().into_set()
            } else {
                let metadata = parsed
                    .provider_metadata()
                    .ok_or(OidcError::MissingProviderMetadata)?;
                self.jwks_for(&parsed.claims.issuer, &metadata.jwks_uri, cancel)
                    .await?
            };

            verify_with_set(&jwks, parsed.token())?;
            debug!(issuer = %parsed.claims.issuer, provider = %parsed.provider, "Token verified");
            Ok::<_, OidcError>(())
        }
        .instrument(self.span.clone())
        .await
    }
}
