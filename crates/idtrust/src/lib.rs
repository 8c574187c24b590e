//! # idtrust
//!
//! Identity for autonomous agents: signing keys (RSA and ML-DSA), pluggable key
//! storage, self-issued tokens and verification of tokens from OIDC providers.
//!
//! This crate wires the building blocks together:
//!
//! - [`idtrust_jose`] - JWK model, algorithm registry and compact JWS
//! - [`idtrust_keystore`] - file, Vault and AWS Secrets Manager key stores
//! - [`idtrust_oidc`] - token classification, discovery, JWKS caching, self-issuance
//!
//! ## Example
//!
//! ```rust,no_run
//! use idtrust::{IdentityCore, IdentitySettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = IdentitySettings::from_file("idtrust.toml")?;
//! idtrust::telemetry::init_tracing(&settings.logging)?;
//!
//! let core = IdentityCore::from_settings(&settings).await?;
//! core.generate_key("ML-DSA-65", "agent-key").await?;
//!
//! let token = core.issue_self_signed("agent-key", "my-agent", "my-agent").await?;
//! let parsed = core.verify(&token, &CancellationToken::new()).await?;
//! println!("{} via {}", parsed.claims.subject, parsed.provider);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identity;
pub mod settings;
pub mod telemetry;

pub use error::{IdentityError, SettingsError};
pub use identity::IdentityCore;
pub use settings::{IdentitySettings, LoggingSettings, ParserSettings};

pub use idtrust_jose as jose;
pub use idtrust_keystore as keystore;
pub use idtrust_oidc as oidc;

/// Result type for facade operations
pub type Result<T> = std::result::Result<T, IdentityError>;
