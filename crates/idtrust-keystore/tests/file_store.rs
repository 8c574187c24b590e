//! Local file key store behavior

mod common;

use common::{sample_key, sample_rsa_key};
use idtrust_keystore::{KeyStore, KeyStoreError, LocalFileKeyStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn store_in(dir: &tempfile::TempDir) -> LocalFileKeyStore {
    LocalFileKeyStore::new(dir.path().join("keys.json"))
}

#[tokio::test]
async fn save_then_retrieve_splits_public_and_private() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let key = sample_rsa_key("k1");

    store.save_key("k1", &key).await.unwrap();

    let public = store.retrieve_pub_key("k1").await.unwrap();
    assert_eq!(public, key.public_key());
    assert!(!public.has_private_material());

    let private = store.retrieve_priv_key("k1").await.unwrap();
    assert_eq!(private, key);
}

#[tokio::test]
async fn akp_keys_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let key = sample_key("pq");

    store.save_key("pq", &key).await.unwrap();

    assert_eq!(store.retrieve_priv_key("pq").await.unwrap().priv_key, key.priv_key);
    assert_eq!(store.retrieve_pub_key("pq").await.unwrap().priv_key, None);
}

#[tokio::test]
async fn missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(matches!(
        store.retrieve_pub_key("absent").await,
        Err(KeyStoreError::KeyNotFound { id }) if id == "absent"
    ));
}

#[tokio::test]
async fn public_only_entry_has_no_private_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let public = sample_key("k1").public_key();

    store.save_key("k1", &public).await.unwrap();

    assert!(store.retrieve_pub_key("k1").await.is_ok());
    assert!(matches!(
        store.retrieve_priv_key("k1").await,
        Err(KeyStoreError::KeyNotFound { .. })
    ));
}

#[tokio::test]
async fn entry_without_public_members_has_no_public_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut key = sample_key("k1");
    key.pub_key = None;

    store.save_key("k1", &key).await.unwrap();

    assert!(matches!(
        store.retrieve_pub_key("k1").await,
        Err(KeyStoreError::KeyNotFound { .. })
    ));
}

#[tokio::test]
async fn saving_again_replaces_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.save_key("k1", &sample_key("k1")).await.unwrap();
    let replacement = sample_key("k1");
    store.save_key("k1", &replacement).await.unwrap();

    assert_eq!(store.list_keys().await.unwrap(), vec!["k1".to_string()]);
    assert_eq!(store.retrieve_priv_key("k1").await.unwrap(), replacement);
}

#[tokio::test]
async fn key_without_kid_is_stamped_with_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut key = sample_key("ignored");
    key.kid = None;

    store.save_key("k9", &key).await.unwrap();

    let stored = store.retrieve_priv_key("k9").await.unwrap();
    assert_eq!(stored.kid.as_deref(), Some("k9"));
}

#[tokio::test]
async fn conflicting_kid_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let err = store.save_key("k1", &sample_key("k2")).await.unwrap_err();
    assert!(matches!(err, KeyStoreError::InvalidKey { .. }));
    assert!(store.list_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_missing_key_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_key("k1", &sample_key("k1")).await.unwrap();
    let before = tokio::fs::read(store.path()).await.unwrap();

    let err = store.delete_key("nope").await.unwrap_err();

    assert!(matches!(err, KeyStoreError::KeyNotFound { .. }));
    assert_eq!(tokio::fs::read(store.path()).await.unwrap(), before);
}

#[tokio::test]
async fn delete_removes_only_that_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_key("k1", &sample_key("k1")).await.unwrap();
    store.save_key("k2", &sample_key("k2")).await.unwrap();

    store.delete_key("k1").await.unwrap();

    assert_eq!(store.list_keys().await.unwrap(), vec!["k2".to_string()]);
    assert!(store.retrieve_pub_key("k1").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_keep_every_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let id = format!("key-{i}");
                store.save_key(&id, &sample_key(&id)).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let mut ids = store.list_keys().await.unwrap();
    ids.sort();
    let mut expected: Vec<String> = (0..16).map(|i| format!("key-{i}")).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[cfg(unix)]
#[tokio::test]
async fn key_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_key("k1", &sample_key("k1")).await.unwrap();

    let mode = tokio::fs::metadata(store.path())
        .await
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
