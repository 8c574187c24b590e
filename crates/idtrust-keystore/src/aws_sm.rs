//! AWS Secrets Manager key store
//!
//! Each key is one secret named `{mount_path}/{key_base_path}/{id}`. The secret is
//! stored as `SecretBinary` holding `{"JWK": {...}}`. Saving an existing id writes a
//! new secret version, and deletes skip the recovery window so the id is free again.

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_secretsmanager::primitives::Blob;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType};
use idtrust_jose::Jwk;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span, debug, info_span};

use crate::config::AwsSmStorageConfig;
use crate::{KeyStore, KeyStoreError, Result, private_key, public_projection};

const BACKEND: &str = "aws_sm";
const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
const RESOURCE_EXISTS: &str = "ResourceExistsException";
const INVALID_REQUEST: &str = "InvalidRequestException";

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "JWK")]
    jwk: Jwk,
}

/// Key store backed by AWS Secrets Manager
#[derive(Debug)]
pub struct AwsSmKeyStore {
    client: Client,
    config: AwsSmStorageConfig,
    span: Span,
}

impl AwsSmKeyStore {
    /// Creates a store using the default AWS credential and region chain, with the
    /// configured region taking precedence
    pub async fn new(config: AwsSmStorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        Self::with_client(Client::new(&sdk_config), config)
    }

    /// Creates a store over an existing client
    pub fn with_client(client: Client, config: AwsSmStorageConfig) -> Self {
        let span = info_span!("keystore", backend = BACKEND, prefix = %config.prefix());
        Self {
            client,
            config,
            span,
        }
    }

    /// Replaces the span every operation is recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    async fn read_secret(&self, id: &str) -> Result<Jwk> {
        let name = self.config.secret_name(id);
        let output = self
            .client
            .get_secret_value()
            .secret_id(&name)
            .send()
            .await
            .map_err(|e| {
                if is_missing(e.code(), e.message()) {
                    KeyStoreError::not_found(id)
                } else {
                    backend_error("read", &name, &e)
                }
            })?;

        let blob = output.secret_binary().ok_or_else(|| KeyStoreError::Backend {
            backend: BACKEND,
            operation: "read",
            resource: name.clone(),
            reason: "secret has no binary value".to_string(),
        })?;

        decode_envelope(&name, blob.as_ref())
    }
}

fn encode_envelope(name: &str, jwk: &Jwk) -> Result<Vec<u8>> {
    serde_json::to_vec(&Envelope { jwk: jwk.clone() }).map_err(|source| {
        KeyStoreError::Serialization {
            context: format!("encode key for {name}"),
            source,
        }
    })
}

fn decode_envelope(name: &str, bytes: &[u8]) -> Result<Jwk> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|source| KeyStoreError::Serialization {
            context: format!("decode key stored in {name}"),
            source,
        })?;
    Ok(envelope.jwk)
}

/// A secret that does not exist or is pending deletion
fn is_missing(code: Option<&str>, message: Option<&str>) -> bool {
    match code {
        Some(RESOURCE_NOT_FOUND) => true,
        Some(INVALID_REQUEST) => {
            message.is_some_and(|message| message.contains("marked for deletion"))
        }
        _ => false,
    }
}

/// Key id for a listed secret name, `None` for siblings and nested secrets
///
/// The name filter is a prefix match, so `jwks-old/k1` comes back for prefix `jwks`.
fn id_from_secret_name<'a>(prefix: &str, name: &'a str) -> Option<&'a str> {
    let id = if prefix.is_empty() {
        name
    } else {
        name.strip_prefix(prefix)?.strip_prefix('/')?
    };
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

fn backend_error<E>(operation: &'static str, name: &str, err: &E) -> KeyStoreError
where
    E: std::error::Error,
{
    KeyStoreError::Backend {
        backend: BACKEND,
        operation,
        resource: name.to_owned(),
        reason: DisplayErrorContext(err).to_string(),
    }
}

#[async_trait]
impl KeyStore for AwsSmKeyStore {
    async fn save_key(&self, id: &str, jwk: &Jwk) -> Result<()> {
        async {
            let name = self.config.secret_name(id);
            let payload = encode_envelope(&name, jwk)?;

            let created = self
                .client
                .create_secret()
                .name(&name)
                .set_kms_key_id(self.config.kms_key_id.clone())
                .secret_binary(Blob::new(payload.clone()))
                .send()
                .await;

            match created {
                Ok(_) => debug!(kid = id, secret = %name, "Saved key"),
                Err(e) if e.code() == Some(RESOURCE_EXISTS) => {
                    self.client
                        .put_secret_value()
                        .secret_id(&name)
                        .secret_binary(Blob::new(payload))
                        .send()
                        .await
                        .map_err(|e| backend_error("update", &name, &e))?;
                    debug!(kid = id, secret = %name, "Replaced key");
                }
                Err(e) => return Err(backend_error("create", &name, &e)),
            }
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
            let name = self.config.secret_name(id);
            self.client
                .delete_secret()
                .secret_id(&name)
                .force_delete_without_recovery(true)
                .send()
                .await
                .map_err(|e| {
                    if is_missing(e.code(), e.message()) {
                        KeyStoreError::not_found(id)
                    } else {
                        backend_error("delete", &name, &e)
                    }
                })?;

            debug!(kid = id, secret = %name, "Deleted key");
            Ok::<_, KeyStoreError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        async {
            let prefix = self.config.prefix();
            let filter = Filter::builder()
                .key(FilterNameStringType::Name)
                .values(prefix.clone())
                .build();

            let mut pages = self
                .client
                .list_secrets()
                .filters(filter)
                .into_paginator()
                .send();

            let mut ids = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| backend_error("list", &prefix, &e))?;
                for entry in page.secret_list() {
                    if let Some(id) = entry
                        .name()
                        .and_then(|name| id_from_secret_name(&prefix, name))
                    {
                        ids.push(id.to_owned());
                    }
                }
            }

            Ok::<_, KeyStoreError>(ids)
        }
        .instrument(self.span.clone())
        .await
    }
}
