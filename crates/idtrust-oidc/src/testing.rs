//! Scripted [`Parser`] for tests of code that consumes one

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use crate::claims::{Claims, ParsedJwt, ProviderName};
use crate::{OidcError, Parser, Result};

/// Returns fixed claims for any token and a configured verification outcome
#[derive(Debug)]
pub struct FakeParser {
    claims: Claims,
    provider: ProviderName,
    common_name: String,
    parse_error: Option<OidcError>,
    verify_error: Option<OidcError>,
    verify_calls: AtomicUsize,
}

impl FakeParser {
    /// A parser that classifies every token as `provider` and verifies it
    pub fn new(claims: Claims, provider: ProviderName) -> Self {
        let common_name = claims.issuer.clone();
        Self {
            claims,
            provider,
            common_name,
            parse_error: None,
            verify_error: None,
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = common_name.into();
        self
    }

    /// Makes every parse fail with `error`
    pub fn failing_parse(mut self, error: OidcError) -> Self {
        self.parse_error = Some(error);
        self
    }

    /// Makes every verification fail with `error`
    pub fn failing_verification(mut self, error: OidcError) -> Self {
        self.verify_error = Some(error);
        self
    }

    /// Number of `verify_jwt` calls so far
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Parser for FakeParser {
    async fn parse_jwt(&self, token: &str, _cancel: &CancellationToken) -> Result<ParsedJwt> {
        if let Some(error) = &self.parse_error {
            return Err(error.clone());
        }
        Ok(ParsedJwt::new(
            self.claims.clone(),
            self.provider,
            self.common_name.clone(),
            None,
            token,
        ))
    }

    async fn verify_jwt(&self, _parsed: &ParsedJwt, _cancel: &CancellationToken) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match &self.verify_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
