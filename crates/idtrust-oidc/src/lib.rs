//! # idtrust-oidc
//!
//! Classification and verification of identity tokens.
//!
//! Tokens come in two kinds:
//!
//! - **Self-issued**: the issuer uses the `agntcy` scheme and the token embeds its
//!   own verification key in `sub_jwk`. Classification makes no network call.
//! - **Delegated**: the issuer is an identity provider. Its metadata is found through
//!   OIDC Discovery (RFC 8414 as the fallback), its JWKS endpoint is fingerprinted to
//!   name the product, and signatures are checked against its cached JWKS.
//!
//! ## Architecture
//!
//! - `parser` - the [`Parser`] trait and [`TokenParser`]
//! - `discovery` - [`ProviderResolver`] and the well-known URL builders
//! - `fingerprint` - ordered provider rules
//! - `cache` - [`JwksCache`] and its `moka` implementation
//! - `http` - the [`HttpFetcher`] seam
//! - `self_issue` - [`self_issue_jwt`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use idtrust_oidc::{Parser, ParserConfig, TokenParser, self_issue_jwt};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = idtrust_jose::generate_jwk("ML-DSA-65", "sig", "agent-key")?;
//! let token = self_issue_jwt("my-agent", "my-agent", &key)?;
//!
//! let parser = TokenParser::new(ParserConfig::default())?;
//! let parsed = parser
//!     .parse_and_verify_jwt(&token, &CancellationToken::new())
//!     .await?;
//! assert_eq!(parsed.common_name, "my-agent");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod claims;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod parser;
pub mod self_issue;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use cache::{CacheError, JwksCache, MokaJwksCache};
pub use claims::{Claims, ParsedJwt, ProviderName};
pub use config::ParserConfig;
pub use discovery::{ProviderMetadata, ProviderResolver};
pub use error::OidcError;
pub use http::{HttpFetcher, HttpResponse, ReqwestFetcher};
pub use parser::{Parser, TokenParser};
pub use self_issue::{SELF_ISSUED_SCHEME, is_self_issued, self_issue_jwt};

/// Result type for token operations
pub type Result<T> = std::result::Result<T, OidcError>;
