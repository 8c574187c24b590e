//! Facade errors

use idtrust_jose::JoseError;
use idtrust_keystore::KeyStoreError;
use idtrust_oidc::OidcError;
use std::path::PathBuf;
use thiserror::Error;

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file not found
    #[error("settings file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("unsupported settings file format, use .toml, .yaml, .yml or .json")]
    UnsupportedFormat,

    /// Parse error
    #[error("failed to parse settings: {0}")]
    Parse(#[from] config::ConfigError),

    /// A value parsed but is not usable
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`IdentityCore`](crate::IdentityCore)
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Token(#[from] OidcError),

    #[error(transparent)]
    Key(#[from] JoseError),

    #[error("failed to initialize tracing: {0}")]
    Telemetry(String),
}
