//! Shared fixtures for token parser integration tests
//!
//! [`MockProvider`] plays an identity provider: discovery documents, a JWKS endpoint
//! with configurable response headers, and RS256 tokens minted with `jsonwebtoken`.

#![allow(dead_code)]

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use idtrust_jose::{Jwk, generate_jwk};
use idtrust_oidc::{ParserConfig, TokenParser};
use jsonwebtoken::{EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::{BigUint, RsaPrivateKey};
use serde_json::{Value, json};
use std::sync::OnceLock;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const PROVIDER_KID: &str = "provider-key-1";
pub const JWKS_PATH: &str = "/jwks";

/// One RSA key for the whole test binary; generation is slow
pub fn provider_key() -> &'static Jwk {
    static KEY: OnceLock<Jwk> = OnceLock::new();
    KEY.get_or_init(|| generate_jwk("RS256", "sig", PROVIDER_KID).unwrap())
}

fn biguint(member: &Option<String>) -> BigUint {
    let encoded = member.as_deref().unwrap();
    BigUint::from_bytes_be(&URL_SAFE_NO_PAD.decode(encoded).unwrap())
}

/// The provider key as `jsonwebtoken` wants it (PKCS#1 DER)
pub fn encoding_key() -> EncodingKey {
    let jwk = provider_key();
    let private = RsaPrivateKey::from_components(
        biguint(&jwk.n),
        biguint(&jwk.e),
        biguint(&jwk.d),
        vec![biguint(&jwk.p), biguint(&jwk.q)],
    )
    .unwrap();
    let der = private.to_pkcs1_der().unwrap();
    EncodingKey::from_rsa_der(der.as_bytes())
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn parser() -> TokenParser {
    TokenParser::new(ParserConfig::default()).unwrap()
}

/// Identity provider served by wiremock
pub struct MockProvider {
    pub server: MockServer,
    /// Issuer URL, the server origin plus an optional path
    pub issuer: String,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self::start_with_path("").await
    }

    /// Starts a provider whose issuer has a path, such as `/oauth/tenant`
    pub async fn start_with_path(issuer_path: &str) -> Self {
        let server = MockServer::start().await;
        let issuer = format!("{}{issuer_path}", server.uri());
        Self { server, issuer }
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    pub fn issuer_path(&self) -> String {
        self.issuer
            .strip_prefix(&self.server.uri())
            .unwrap_or_default()
            .to_string()
    }

    fn metadata(&self) -> Value {
        json!({
            "issuer": self.issuer,
            "token_endpoint": format!("{}/token", self.server.uri()),
            "jwks_uri": self.jwks_uri(),
        })
    }

    /// Serves `{issuer}/.well-known/openid-configuration`
    pub async fn mock_oidc_discovery(&self) {
        Mock::given(method("GET"))
            .and(path(format!(
                "{}/.well-known/openid-configuration",
                self.issuer_path()
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.metadata()))
            .mount(&self.server)
            .await;
    }

    /// Serves `/.well-known/oauth-authorization-server{issuer path}`
    pub async fn mock_oauth_discovery(&self) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/.well-known/oauth-authorization-server{}",
                self.issuer_path()
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.metadata()))
            .mount(&self.server)
            .await;
    }

    /// Serves the provider key set with extra response headers
    pub async fn mock_jwks(&self, headers: &[(&str, &str)]) {
        let mut response = ResponseTemplate::new(200)
            .set_body_json(json!({ "keys": [provider_key().public_key()] }));
        for (name, value) in headers {
            response = response.insert_header(*name, *value);
        }
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Serves discovery documents that answer only after `delay`
    pub async fn mock_slow_discovery(&self, delay: Duration) {
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(self.metadata())
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of JWKS requests received so far
    pub async fn jwks_fetches(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == JWKS_PATH)
            .count()
    }

    /// RS256 token for `subject` issued by this provider
    pub fn mint(&self, subject: &str) -> String {
        self.mint_with(json!({
            "iss": self.issuer,
            "sub": subject,
            "aud": "agents",
            "iat": now(),
            "exp": now() + 600,
        }))
    }

    pub fn mint_with(&self, claims: Value) -> String {
        let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = Some(PROVIDER_KID.to_string());
        jsonwebtoken::encode(&header, &claims, &encoding_key()).unwrap()
    }
}
