//! # idtrust-keystore
//!
//! Persistence for signing keys behind one [`KeyStore`] trait.
//!
//! ## Backends
//!
//! - `file` - every key in one JSON array on local disk, owner read/write only
//! - `vault` - one HashiCorp Vault KV v2 secret per key
//! - `aws_sm` - one AWS Secrets Manager secret per key (feature `aws-sm`)
//!
//! Backends are chosen with a [`KeyStoreConfig`] and built by [`new_key_store`]:
//!
//! ```rust,no_run
//! use idtrust_keystore::{KeyStoreConfig, FileStorageConfig, new_key_store};
//!
//! # async fn run() -> Result<(), idtrust_keystore::KeyStoreError> {
//! let store = new_key_store(KeyStoreConfig::File(FileStorageConfig {
//!     path: "/var/lib/agent/keys.json".into(),
//! }))
//! .await?;
//!
//! let key = idtrust_jose::generate_jwk("ML-DSA-65", "sig", "agent-key")
//!     .map_err(|e| idtrust_keystore::KeyStoreError::Configuration(e.to_string()))?;
//! store.save_key("agent-key", &key).await?;
//! let public = store.retrieve_pub_key("agent-key").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use idtrust_jose::Jwk;

pub mod config;
pub mod error;
pub mod factory;
pub mod file;
pub mod vault;

#[cfg(feature = "aws-sm")]
pub mod aws_sm;

pub use config::{
    AwsSmStorageConfig, FileStorageConfig, KeyStoreConfig, StorageType, VaultStorageConfig,
};
pub use error::KeyStoreError;
pub use factory::new_key_store;
pub use file::LocalFileKeyStore;
pub use vault::VaultKeyStore;

#[cfg(feature = "aws-sm")]
pub use aws_sm::AwsSmKeyStore;

/// Key store result type
pub type Result<T> = std::result::Result<T, KeyStoreError>;

/// Storage for signing keys, addressed by id
///
/// Implementations are shared across tasks; each call is one logical operation.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Stores `jwk` under `id`, replacing any existing key with that id
    async fn save_key(&self, id: &str, jwk: &Jwk) -> Result<()>;

    /// Public projection of the key stored under `id`
    ///
    /// Fails with [`KeyStoreError::KeyNotFound`] when there is no such key or it has
    /// no public members.
    async fn retrieve_pub_key(&self, id: &str) -> Result<Jwk>;

    /// The full key stored under `id`
    ///
    /// Fails with [`KeyStoreError::KeyNotFound`] when there is no such key or it has
    /// no private members.
    async fn retrieve_priv_key(&self, id: &str) -> Result<Jwk>;

    /// Removes the key stored under `id`
    async fn delete_key(&self, id: &str) -> Result<()>;

    /// Ids of every stored key
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Public projection, or `KeyNotFound` when the stored key has none
pub(crate) fn public_projection(id: &str, jwk: &Jwk) -> Result<Jwk> {
    let public = jwk.public_key();
    if public.has_public_material() {
        Ok(public)
    } else {
        Err(KeyStoreError::not_found(id))
    }
}

/// The key itself, or `KeyNotFound` when it carries no private members
pub(crate) fn private_key(id: &str, jwk: Jwk) -> Result<Jwk> {
    let has_private = [&jwk.d, &jwk.priv_key]
        .into_iter()
        .any(|field| field.as_deref().is_some_and(|value| !value.is_empty()));
    if has_private {
        Ok(jwk)
    } else {
        Err(KeyStoreError::not_found(id))
    }
}
