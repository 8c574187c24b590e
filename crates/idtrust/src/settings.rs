//! Layered settings
//!
//! One optional file (TOML, YAML or JSON, chosen by extension) overlaid with
//! environment variables. Variables use the `IDTRUST` prefix and `__` between
//! nesting levels, e.g. `IDTRUST_PARSER__ALLOW_GENERIC_IDP=false` or
//! `IDTRUST_KEYSTORE__PATH=/var/lib/agent/keys.json`.
//!
//! ```toml
//! [keystore]
//! type = "vault"
//! address = "https://vault.internal:8200"
//! key_base_path = "agents/jwks"
//!
//! [parser]
//! request_timeout_secs = 5
//! allow_generic_idp = false
//!
//! [logging]
//! level = "info,idtrust_oidc=debug"
//! json = true
//! ```

use config::{Config, Environment, File, FileFormat};
use idtrust_keystore::KeyStoreConfig;
use idtrust_oidc::ParserConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::SettingsError;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "IDTRUST";

/// Complete settings for an [`IdentityCore`](crate::IdentityCore)
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    /// Key store backend, tagged by `type`; see [`KeyStoreConfig`]
    pub keystore: serde_json::Value,

    #[serde(default)]
    pub parser: ParserSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Token parser settings, in whole seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub request_timeout_secs: u64,
    pub jwks_cache_ttl_secs: u64,
    pub jwks_cache_max_bytes: u64,
    pub max_response_bytes: u64,
    pub acceptable_skew_secs: u64,
    pub allow_generic_idp: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        let defaults = ParserConfig::default();
        Self {
            request_timeout_secs: defaults.request_timeout.as_secs(),
            jwks_cache_ttl_secs: defaults.jwks_cache_ttl.as_secs(),
            jwks_cache_max_bytes: defaults.jwks_cache_max_bytes,
            max_response_bytes: defaults.max_response_bytes,
            acceptable_skew_secs: defaults.acceptable_skew.as_secs(),
            allow_generic_idp: defaults.allow_generic_idp,
        }
    }
}

impl ParserSettings {
    pub fn to_parser_config(&self) -> ParserConfig {
        ParserConfig::default()
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_jwks_cache_ttl(Duration::from_secs(self.jwks_cache_ttl_secs))
            .with_jwks_cache_max_bytes(self.jwks_cache_max_bytes)
            .with_max_response_bytes(self.max_response_bytes)
            .with_acceptable_skew(Duration::from_secs(self.acceptable_skew_secs))
            .with_allow_generic_idp(self.allow_generic_idp)
    }
}

/// Log output settings for [`init_tracing`](crate::telemetry::init_tracing)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl IdentitySettings {
    /// Load settings from a file, with `IDTRUST_*` environment variables on top
    ///
    /// # Errors
    ///
    /// [`SettingsError::FileNotFound`], [`SettingsError::UnsupportedFormat`] or
    /// [`SettingsError::Parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::from_file_with_prefix(path, ENV_PREFIX)
    }

    /// Load settings from a file with a custom environment prefix
    ///
    /// # Errors
    ///
    /// See [`from_file`](Self::from_file).
    pub fn from_file_with_prefix(
        path: impl AsRef<Path>,
        env_prefix: &str,
    ) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(SettingsError::UnsupportedFormat),
        };
        let path = path.to_str().ok_or(SettingsError::UnsupportedFormat)?;

        let config = Config::builder()
            .add_source(File::new(path, format))
            .add_source(environment(env_prefix))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load settings from `IDTRUST_*` environment variables alone
    ///
    /// # Errors
    ///
    /// [`SettingsError::Parse`] when required values are missing or malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(environment(ENV_PREFIX))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// The key store section as a typed backend configuration
    ///
    /// # Errors
    ///
    /// [`SettingsError::Invalid`] for a missing or unknown backend `type`.
    pub fn keystore_config(&self) -> Result<KeyStoreConfig, SettingsError> {
        KeyStoreConfig::from_value(self.keystore.clone())
            .map_err(|e| SettingsError::Invalid(e.to_string()))
    }
}

fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
