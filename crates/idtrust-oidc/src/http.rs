//! HTTP GET capability
//!
//! Discovery and JWKS retrieval only need `GET` with custom headers. The
//! [`HttpFetcher`] trait is that seam; [`ReqwestFetcher`] is the production
//! implementation. Deadlines and cancellation are applied around the trait by
//! [`get_with_deadline`], so every implementation gets them.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{OidcError, Result};

/// Response of a GET request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues HTTP GET requests
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches `url`. Non-success statuses are returned, not raised.
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse>;
}

/// Body limit applied when none is configured
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// [`HttpFetcher`] over a `reqwest` client
///
/// Bodies larger than the configured limit are rejected from `Content-Length`
/// when the server sends one, and otherwise while streaming.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    timeout: Option<Duration>,
    max_response_bytes: u64,
}

impl ReqwestFetcher {
    /// Creates a fetcher with its own client
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] if the HTTP client cannot be built
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| OidcError::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: Some(timeout),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, max_bytes: u64) -> Self {
        self.max_response_bytes = max_bytes;
        self
    }

    fn too_large(&self, url: &str) -> OidcError {
        OidcError::ResponseTooLarge {
            url: url.to_owned(),
            limit: self.max_response_bytes,
        }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse> {
        let http_error = |e: reqwest::Error| match self.timeout {
            Some(timeout) if e.is_timeout() => OidcError::Timeout {
                url: url.to_owned(),
                timeout,
            },
            _ => OidcError::Http {
                url: url.to_owned(),
                reason: e.to_string(),
            },
        };

        let mut response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        if let Some(content_length) = response.content_length()
            && content_length > self.max_response_bytes
        {
            return Err(self.too_large(url));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(http_error)? {
            if (body.len() + chunk.len()) as u64 > self.max_response_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&body).into_owned();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Runs one JSON GET bounded by `timeout` and `cancel`
///
/// Whichever fires first aborts the request in flight.
pub(crate) async fn get_with_deadline(
    fetcher: &dyn HttpFetcher,
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<HttpResponse> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(OidcError::Cancelled { url: url.to_owned() }),
        result = tokio::time::timeout(timeout, fetcher.get(url, &headers)) => {
            result.unwrap_or_else(|_| Err(OidcError::Timeout {
                url: url.to_owned(),
                timeout,
            }))
        }
    }
}
