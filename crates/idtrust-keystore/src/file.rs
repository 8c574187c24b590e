//! Local file key store
//!
//! The whole key set is one JSON array. Every operation takes the store's mutex,
//! reads the array, changes it in memory and writes it back before the guard drops,
//! so concurrent callers on one instance never interleave. Writes go to a sibling
//! temp file (mode `0600`) that is fsynced and renamed over the key file.

use async_trait::async_trait;
use idtrust_jose::Jwk;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{Instrument, Span, debug, info_span};

use crate::{KeyStore, KeyStoreError, Result, private_key, public_projection};

/// Key store backed by a single JSON file
#[derive(Debug)]
pub struct LocalFileKeyStore {
    path: PathBuf,
    lock: Mutex<()>,
    span: Span,
}

impl LocalFileKeyStore {
    /// Creates a store over `path`. The file is created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let span = info_span!("keystore", backend = "file", path = %path.display());
        Self {
            path,
            lock: Mutex::new(()),
            span,
        }
    }

    /// Replaces the span every operation is recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(
        operation: &'static str,
        path: &Path,
    ) -> impl FnOnce(std::io::Error) -> KeyStoreError + use<> {
        let path = path.display().to_string();
        move |source| KeyStoreError::Io {
            operation,
            path,
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "jwks.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reads the key set. A missing or blank file is an empty set.
    async fn load(&self) -> Result<Vec<Jwk>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error("read", &self.path)(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| KeyStoreError::Serialization {
            context: format!("parse key file {}", self.path.display()),
            source,
        })
    }

    async fn persist(&self, keys: &[Jwk]) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(keys).map_err(|source| KeyStoreError::Serialization {
                context: "encode key set".to_string(),
                source,
            })?;

        let temp = self.temp_path();
        match tokio::fs::remove_file(&temp).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                return Err(Self::io_error("remove stale temp file", &temp)(e));
            }
            _ => {}
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&temp)
            .await
            .map_err(Self::io_error("create", &temp))?;
        file.write_all(&json)
            .await
            .map_err(Self::io_error("write", &temp))?;
        file.sync_all()
            .await
            .map_err(Self::io_error("sync", &temp))?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(Self::io_error("replace key file", &self.path))?;

        debug!(keys = keys.len(), "Key file rewritten");
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Jwk> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|key| key.kid.as_deref() == Some(id))
            .ok_or_else(|| KeyStoreError::not_found(id))
    }
}

#[async_trait]
impl KeyStore for LocalFileKeyStore {
    async fn save_key(&self, id: &str, jwk: &Jwk) -> Result<()> {
        let mut entry = jwk.clone();
        match jwk.kid.as_deref().filter(|kid| !kid.is_empty()) {
            None => entry.kid = Some(id.to_owned()),
            Some(kid) if kid != id => {
                return Err(KeyStoreError::InvalidKey {
                    id: id.to_owned(),
                    reason: format!("key carries kid '{kid}'"),
                });
            }
            Some(_) => {}
        }

        async {
            let _guard = self.lock.lock().await;
            let mut keys = self.load().await?;

            match keys.iter_mut().find(|key| key.kid.as_deref() == Some(id)) {
                Some(slot) => *slot = entry,
                None => keys.push(entry),
            }

            self.persist(&keys).await?;
            debug!(kid = id, "Saved key");
            Ok::<_, KeyStoreError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    async fn retrieve_pub_key(&self, id: &str) -> Result<Jwk> {
        let key = self.find(id).instrument(self.span.clone()).await?;
        public_projection(id, &key)
    }

    async fn retrieve_priv_key(&self, id: &str) -> Result<Jwk> {
        let key = self.find(id).instrument(self.span.clone()).await?;
        private_key(id, key)
    }

    async fn delete_key(&self, id: &str) -> Result<()> {
        async {
            let _guard = self.lock.lock().await;
            let mut keys = self.load().await?;

            let index = keys
                .iter()
                .position(|key| key.kid.as_deref() == Some(id))
                .ok_or_else(|| KeyStoreError::not_found(id))?;
            keys.remove(index);

            self.persist(&keys).await?;
            debug!(kid = id, "Deleted key");
            Ok::<_, KeyStoreError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        async {
            let _guard = self.lock.lock().await;
            let keys = self.load().await?;
            Ok::<_, KeyStoreError>(keys.into_iter().filter_map(|key| key.kid).collect())
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_sits_next_to_key_file() {
        let store = LocalFileKeyStore::new("/var/lib/agent/keys.json");
        assert_eq!(
            store.temp_path(),
            PathBuf::from("/var/lib/agent/keys.json.tmp")
        );
    }

    #[tokio::test]
    async fn blank_file_is_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        tokio::fs::write(&path, "\n").await.unwrap();

        let store = LocalFileKeyStore::new(&path);
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_surfaces_as_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = LocalFileKeyStore::new(&path);
        assert!(matches!(
            store.retrieve_pub_key("k1").await,
            Err(KeyStoreError::Serialization { .. })
        ));
    }
}
