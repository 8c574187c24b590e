//! Key store and token parser wired together

use idtrust_jose::{Jwk, generate_jwk};
use idtrust_keystore::{KeyStore, new_key_store};
use idtrust_oidc::{ParsedJwt, Parser, TokenParser, self_issue_jwt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::Result;
use crate::settings::IdentitySettings;

/// Entry point for issuing and verifying agent identity tokens
#[derive(Clone)]
pub struct IdentityCore {
    key_store: Arc<dyn KeyStore>,
    parser: Arc<dyn Parser>,
}

impl std::fmt::Debug for IdentityCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCore").finish_non_exhaustive()
    }
}

impl IdentityCore {
    pub fn new(key_store: Arc<dyn KeyStore>, parser: Arc<dyn Parser>) -> Self {
        Self { key_store, parser }
    }

    /// Builds the configured key store and a [`TokenParser`]
    ///
    /// # Errors
    ///
    /// Configuration errors from either component. Nothing falls back to a default
    /// backend.
    pub async fn from_settings(settings: &IdentitySettings) -> Result<Self> {
        let keystore_config = settings.keystore_config()?;
        let storage_type = keystore_config.storage_type();
        let key_store = new_key_store(keystore_config).await?;

        let parser_config = settings.parser.to_parser_config();
        let allow_generic_idp = parser_config.allow_generic_idp;
        let parser = TokenParser::new(parser_config)?;

        info!(%storage_type, allow_generic_idp, "Identity core ready");
        Ok(Self::new(key_store, Arc::new(parser)))
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    pub fn parser(&self) -> &Arc<dyn Parser> {
        &self.parser
    }

    /// Generates a signing key, stores it under `key_id` and returns its public half
    ///
    /// # Errors
    ///
    /// An unsupported algorithm, or the key store's write error.
    pub async fn generate_key(&self, alg: &str, key_id: &str) -> Result<Jwk> {
        let key = generate_jwk(alg, "sig", key_id)?;
        self.key_store.save_key(key_id, &key).await?;
        debug!(kid = key_id, alg, "Generated signing key");
        Ok(key.public_key())
    }

    /// Issues a self-signed token with the stored private key `key_id`
    ///
    /// # Errors
    ///
    /// [`KeyNotFound`](idtrust_keystore::KeyStoreError::KeyNotFound) when the key
    /// is missing or has no private half, and signing errors.
    pub async fn issue_self_signed(
        &self,
        key_id: &str,
        issuer: &str,
        subject: &str,
    ) -> Result<String> {
        let key = self.key_store.retrieve_priv_key(key_id).await?;
        Ok(self_issue_jwt(issuer, subject, &key)?)
    }

    /// Classifies and verifies a token
    ///
    /// # Errors
    ///
    /// See [`OidcError`](idtrust_oidc::OidcError); use its `is_trust_failure` and
    /// `is_invalid_token` to choose a reaction.
    pub async fn verify(&self, token: &str, cancel: &CancellationToken) -> Result<ParsedJwt> {
        Ok(self.parser.parse_and_verify_jwt(token, cancel).await?)
    }
}
