//! Backend selection

use std::sync::Arc;
use tracing::info;

use crate::config::KeyStoreConfig;
use crate::file::LocalFileKeyStore;
use crate::vault::VaultKeyStore;
use crate::{KeyStore, KeyStoreError, Result};

/// Builds the key store described by `config`
///
/// # Errors
///
/// Returns [`KeyStoreError::Configuration`] when the backend settings are invalid or
/// the backend was not compiled in. Construction errors are never replaced by a
/// fallback backend.
pub async fn new_key_store(config: KeyStoreConfig) -> Result<Arc<dyn KeyStore>> {
    let storage_type = config.storage_type();

    let store: Arc<dyn KeyStore> = match config {
        KeyStoreConfig::File(file) => {
            if file.path.as_os_str().is_empty() {
                return Err(KeyStoreError::Configuration(
                    "file key store needs a path".to_string(),
                ));
            }
            Arc::new(LocalFileKeyStore::new(file.path))
        }
        KeyStoreConfig::Vault(vault) => Arc::new(VaultKeyStore::new(vault)?),
        #[cfg(feature = "aws-sm")]
        KeyStoreConfig::AwsSm(aws) => Arc::new(crate::aws_sm::AwsSmKeyStore::new(aws).await),
        #[cfg(not(feature = "aws-sm"))]
        KeyStoreConfig::AwsSm(_) => {
            return Err(KeyStoreError::Configuration(
                "aws_sm key store requires the 'aws-sm' feature".to_string(),
            ));
        }
    };

    info!(storage_type = %storage_type, "Key store initialized");
    Ok(store)
}
