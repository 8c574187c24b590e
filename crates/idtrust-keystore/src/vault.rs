//! HashiCorp Vault key store (KV v2 over HTTP)
//!
//! Each key is one secret at `{mount}/data/{key_base_path}/{id}` whose `jwk` field
//! holds the JSON-encoded key.

use async_trait::async_trait;
use idtrust_jose::Jwk;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{Instrument, Span, debug, info_span};
use url::Url;

use crate::config::{VaultStorageConfig, join_path};
use crate::{KeyStore, KeyStoreError, Result, private_key, public_projection};

const BACKEND: &str = "vault";

#[derive(Deserialize)]
struct ReadResponse {
    data: ReadData,
}

#[derive(Deserialize)]
struct ReadData {
    data: StoredSecret,
}

#[derive(Deserialize)]
struct StoredSecret {
    jwk: String,
}

#[derive(Deserialize)]
struct ListResponse {
    data: ListData,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(default)]
    keys: Vec<String>,
}

/// Key store backed by a Vault KV v2 mount
pub struct VaultKeyStore {
    client: reqwest::Client,
    address: Url,
    token: Option<SecretString>,
    namespace: Option<String>,
    mount_path: String,
    key_base_path: String,
    span: Span,
}

impl std::fmt::Debug for VaultKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKeyStore")
            .field("address", &self.address.as_str())
            .field("namespace", &self.namespace)
            .field("mount_path", &self.mount_path)
            .field("key_base_path", &self.key_base_path)
            .finish_non_exhaustive()
    }
}

impl VaultKeyStore {
    /// Creates a store with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Configuration`] if the address is not a URL or the
    /// HTTP client cannot be built.
    pub fn new(config: VaultStorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                KeyStoreError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;
        Self::with_client(config, client)
    }

    /// Creates a store over an existing HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Configuration`] if the address is not a URL.
    pub fn with_client(config: VaultStorageConfig, client: reqwest::Client) -> Result<Self> {
        let mut address = Url::parse(&config.address).map_err(|e| {
            KeyStoreError::Configuration(format!("invalid Vault address '{}': {e}", config.address))
        })?;
        if !address.path().ends_with('/') {
            let path = format!("{}/", address.path());
            address.set_path(&path);
        }

        let span = info_span!(
            "keystore",
            backend = BACKEND,
            address = %address,
            mount = %config.mount_path,
        );

        Ok(Self {
            client,
            address,
            token: config.token.map(SecretString::new),
            namespace: config.namespace,
            mount_path: config.mount_path,
            key_base_path: config.key_base_path,
            span,
        })
    }

    /// Replaces the span every operation is recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// API path for a secret's `data` or `metadata` endpoint
    fn api_path(&self, kind: &str, id: Option<&str>) -> String {
        join_path(&[
            "v1",
            self.mount_path.as_str(),
            kind,
            self.key_base_path.as_str(),
            id.unwrap_or_default(),
        ])
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.address.join(path).map_err(|e| {
            KeyStoreError::Configuration(format!("invalid Vault path '{path}': {e}"))
        })?;

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.header("X-Vault-Token", token.expose_secret().as_str());
        }
        if let Some(namespace) = &self.namespace {
            request = request.header("X-Vault-Namespace", namespace.as_str());
        }
        Ok(request)
    }

    async fn send(
        &self,
        operation: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| backend_error(operation, path, e.to_string()))
    }

    async fn read_secret(&self, id: &str) -> Result<Jwk> {
        let path = self.api_path("data", Some(id));
        let response = self
            .send("read", &path, self.request(Method::GET, &path)?)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(KeyStoreError::not_found(id));
        }
        let response = ensure_success("read", &path, response).await?;

        let body: ReadResponse = response
            .json()
            .await
            .map_err(|e| backend_error("read", &path, format!("unexpected response: {e}")))?;
        serde_json::from_str(&body.data.data.jwk).map_err(|source| KeyStoreError::Serialization {
            context: format!("decode key stored at {path}"),
            source,
        })
    }
}

fn backend_error(operation: &'static str, path: &str, reason: String) -> KeyStoreError {
    KeyStoreError::Backend {
        backend: BACKEND,
        operation,
        resource: path.to_owned(),
        reason,
    }
}

async fn ensure_success(
    operation: &'static str,
    path: &str,
    response: Response,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(backend_error(
        operation,
        path,
        format!("HTTP {}: {}", status.as_u16(), body.trim()),
    ))
}

#[async_trait]
impl KeyStore for VaultKeyStore {
    async fn save_key(&self, id: &str, jwk: &Jwk) -> Result<()> {
        async {
            let path = self.api_path("data", Some(id));
            let encoded = jwk.to_json().map_err(|e| KeyStoreError::InvalidKey {
                id: id.to_owned(),
                reason: e.to_string(),
            })?;
            let request = self
                .request(Method::POST, &path)?
                .json(&json!({ "data": { "jwk": encoded } }));

            let response = self.send("write", &path, request).await?;
            ensure_success("write", &path, response).await?;
            debug!(kid = id, "Saved key");
            Ok::<_, KeyStoreError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    async fn retrieve_pub_key(&self, id: &str) -> Result<Jwk> {
        let key = self.read_secret(id).instrument(self.span.clone()).await?;
        public_projection(id, &key)
    }

    async fn retrieve_priv_key(&self, id: &str) -> Result<Jwk> {
        let key = self.read_secret(id).instrument(self.span.clone()).await?;
        private_key(id, key)
    }

    async fn delete_key(&self, id: &str) -> Result<()> {
        async {
            // KV v2 deletes succeed for missing paths, so check first.
            self.read_secret(id).await?;

            let path = self.api_path("metadata", Some(id));
            let response = self
                .send("delete", &path, self.request(Method::DELETE, &path)?)
                .await?;
            ensure_success("delete", &path, response).await?;
            debug!(kid = id, "Deleted key");
            Ok::<_, KeyStoreError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        async {
            let path = self.api_path("metadata", None);
            let request = self
                .request(Method::GET, &path)?
                .query(&[("list", "true")]);
            let response = self.send("list", &path, request).await?;

            if response.status() == StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            let response = ensure_success("list", &path, response).await?;

            let body: ListResponse = response
                .json()
                .await
                .map_err(|e| backend_error("list", &path, format!("unexpected response: {e}")))?;

            // Entries ending in '/' are sub-folders, not keys.
            Ok::<_, KeyStoreError>(
                body.data
                    .keys
                    .into_iter()
                    .filter(|key| !key.ends_with('/'))
                    .collect(),
            )
        }
        .instrument(self.span.clone())
        .await
    }
}
