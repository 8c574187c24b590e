//! Backend selection from configuration

mod common;

use common::sample_key;
use idtrust_keystore::{
    FileStorageConfig, KeyStoreConfig, KeyStoreError, VaultStorageConfig, new_key_store,
};
use serde_json::json;

#[tokio::test]
async fn file_config_builds_working_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = KeyStoreConfig::from_value(json!({
        "type": "file",
        "path": dir.path().join("keys.json"),
    }))
    .unwrap();

    let store = new_key_store(config).await.unwrap();
    store.save_key("k1", &sample_key("k1")).await.unwrap();
    assert_eq!(store.list_keys().await.unwrap(), vec!["k1".to_string()]);
}

#[tokio::test]
async fn empty_file_path_is_rejected() {
    let result = new_key_store(KeyStoreConfig::File(FileStorageConfig {
        path: "".into(),
    }))
    .await;
    assert!(matches!(result, Err(KeyStoreError::Configuration(_))));
}

#[tokio::test]
async fn bad_vault_address_is_rejected() {
    let result = new_key_store(KeyStoreConfig::Vault(VaultStorageConfig {
        address: "::not-a-url".into(),
        ..VaultStorageConfig::default()
    }))
    .await;
    assert!(matches!(result, Err(KeyStoreError::Configuration(_))));
}

#[test]
fn unknown_backend_is_rejected_before_construction() {
    let err = KeyStoreConfig::from_value(json!({ "type": "consul", "address": "x" })).unwrap_err();
    assert!(matches!(err, KeyStoreError::Configuration(_)));
}

#[cfg(not(feature = "aws-sm"))]
#[tokio::test]
async fn aws_backend_without_feature_is_rejected() {
    let config = KeyStoreConfig::from_value(json!({
        "type": "aws_sm",
        "mount_path": "agents",
        "key_base_path": "jwks",
    }))
    .unwrap();

    assert!(matches!(
        new_key_store(config).await,
        Err(KeyStoreError::Configuration(_))
    ));
}
