//! Backend configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{KeyStoreError, Result};

/// Backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    File,
    Vault,
    AwsSm,
}

impl StorageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Vault => "vault",
            Self::AwsSm => "aws_sm",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = KeyStoreError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "file" => Ok(Self::File),
            "vault" => Ok(Self::Vault),
            "aws_sm" | "aws-sm" => Ok(Self::AwsSm),
            other => Err(KeyStoreError::Configuration(format!(
                "unsupported storage type '{other}'"
            ))),
        }
    }
}

/// Configuration for one key store backend
///
/// Serialized with a `type` tag:
///
/// ```toml
/// type = "vault"
/// address = "https://vault.internal:8200"
/// mount_path = "secret"
/// key_base_path = "agents/jwks"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyStoreConfig {
    /// Single JSON file on local disk
    File(FileStorageConfig),
    /// HashiCorp Vault, KV v2 engine
    Vault(VaultStorageConfig),
    /// AWS Secrets Manager
    AwsSm(AwsSmStorageConfig),
}

impl KeyStoreConfig {
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::File(_) => StorageType::File,
            Self::Vault(_) => StorageType::Vault,
            Self::AwsSm(_) => StorageType::AwsSm,
        }
    }

    /// Reads a configuration from a loosely typed value, such as a section of a
    /// larger settings document
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Configuration`] when the `type` tag is missing or
    /// unknown, or the backend section does not match its type.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if let Some(tag) = value.get("type").and_then(serde_json::Value::as_str) {
            tag.parse::<StorageType>()?;
        }
        serde_json::from_value(value)
            .map_err(|e| KeyStoreError::Configuration(format!("invalid key store config: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageConfig {
    /// Path of the JSON key file
    pub path: PathBuf,
}

/// HashiCorp Vault KV v2 settings
#[derive(Clone, Deserialize)]
pub struct VaultStorageConfig {
    /// Vault server address, e.g. `https://vault.internal:8200`
    #[serde(default = "default_vault_address")]
    pub address: String,
    /// Vault token sent as `X-Vault-Token`
    #[serde(default)]
    pub token: Option<String>,
    /// Enterprise namespace sent as `X-Vault-Namespace`
    #[serde(default)]
    pub namespace: Option<String>,
    /// KV v2 mount (default `secret`)
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
    /// Path under the mount holding the keys (default `jwks`)
    #[serde(default = "default_key_base_path")]
    pub key_base_path: String,
}

impl Default for VaultStorageConfig {
    fn default() -> Self {
        Self {
            address: default_vault_address(),
            token: None,
            namespace: None,
            mount_path: default_mount_path(),
            key_base_path: default_key_base_path(),
        }
    }
}

impl fmt::Debug for VaultStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultStorageConfig")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("namespace", &self.namespace)
            .field("mount_path", &self.mount_path)
            .field("key_base_path", &self.key_base_path)
            .finish()
    }
}

fn default_vault_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_mount_path() -> String {
    "secret".to_string()
}

fn default_key_base_path() -> String {
    "jwks".to_string()
}

/// AWS Secrets Manager settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsSmStorageConfig {
    /// Region override; the default provider chain is used when unset
    #[serde(default)]
    pub region: Option<String>,
    /// First segment of every secret name
    #[serde(default)]
    pub mount_path: String,
    /// Second segment of every secret name
    #[serde(default)]
    pub key_base_path: String,
    /// KMS key used to encrypt new secrets
    #[serde(default)]
    pub kms_key_id: Option<String>,
}

impl AwsSmStorageConfig {
    /// Secret name prefix shared by every key, without a trailing `/`
    pub fn prefix(&self) -> String {
        join_path(&[self.mount_path.as_str(), self.key_base_path.as_str()])
    }

    /// Secret name for `id`
    pub fn secret_name(&self, id: &str) -> String {
        join_path(&[self.mount_path.as_str(), self.key_base_path.as_str(), id])
    }
}

/// Joins path segments with `/`, skipping empty segments and stray separators
pub(crate) fn join_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
