//! Shared fixtures for key store integration tests

#![allow(dead_code)]

use idtrust_jose::{Jwk, generate_jwk};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

pub const VAULT_TOKEN: &str = "s.integration-test";

/// ML-DSA keys are cheap to generate, so most tests use them.
pub fn sample_key(kid: &str) -> Jwk {
    generate_jwk("ML-DSA-44", "sig", kid).unwrap()
}

pub fn sample_rsa_key(kid: &str) -> Jwk {
    generate_jwk("RS256", "sig", kid).unwrap()
}

/// Vault KV v2 endpoints served by wiremock
pub struct MockVault {
    pub server: MockServer,
}

impl MockVault {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn address(&self) -> String {
        self.server.uri()
    }

    pub async fn mock_write(&self, id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/secret/data/jwks/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "version": 1 }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_read(&self, id: &str, jwk: &Jwk) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/secret/data/jwks/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "data": { "jwk": jwk.to_json().unwrap() },
                    "metadata": { "version": 1 }
                }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_missing(&self, id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/secret/data/jwks/{id}")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_list(&self, keys: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/v1/secret/metadata/jwks"))
            .and(query_param("list", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "keys": keys }
            })))
            .mount(&self.server)
            .await;
    }
}
