//! Issuer classification: self-issued, fingerprinted providers and discovery fallback

mod common;

use async_trait::async_trait;
use common::{MockProvider, parser};
use idtrust_oidc::{
    HttpFetcher, HttpResponse, OidcError, Parser, ParserConfig, ProviderName, TokenParser,
    self_issue_jwt,
};
use pretty_assertions::assert_eq;
use reqwest::header::HeaderMap;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetcher that records calls and never answers successfully
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl HttpFetcher for CountingFetcher {
    async fn get(&self, url: &str, _headers: &HeaderMap) -> idtrust_oidc::Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OidcError::Http {
            url: url.to_string(),
            reason: "network disabled".to_string(),
        })
    }
}

#[tokio::test]
async fn self_issued_token_is_classified_without_network() {
    let fetcher = Arc::new(CountingFetcher::default());
    let parser = TokenParser::with_fetcher(ParserConfig::default(), fetcher.clone());

    let key = idtrust_jose::generate_jwk("ML-DSA-44", "sig", "agent-key").unwrap();
    let token = self_issue_jwt("example-issuer", "agent-1", &key).unwrap();

    let parsed = parser
        .parse_and_verify_jwt(&token, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(parsed.provider, ProviderName::SelfIssued);
    assert_eq!(parsed.common_name, "example-issuer");
    assert_eq!(parsed.claims.issuer, "agntcy:example-issuer");
    assert_eq!(parsed.claims.subject, "agent-1");
    assert!(parsed.provider_metadata().is_none());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn okta_request_id_header_classifies_as_okta() {
    let provider = MockProvider::start().await;
    provider.mock_oidc_discovery().await;
    provider
        .mock_jwks(&[("X-Okta-Request-Id", "req-8b1c")])
        .await;

    let parsed = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(parsed.provider, ProviderName::Okta);
    assert_eq!(parsed.common_name, "127.0.0.1");
    assert_eq!(
        parsed.provider_metadata().unwrap().jwks_uri,
        provider.jwks_uri()
    );
}

#[tokio::test]
async fn ory_region_header_wins_over_okta_header() {
    let provider = MockProvider::start().await;
    provider.mock_oidc_discovery().await;
    provider
        .mock_jwks(&[
            ("Ory-Network-Region", "eu-central"),
            ("X-Okta-Request-Id", "req-1"),
        ])
        .await;

    let parsed = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(parsed.provider, ProviderName::Ory);
}

#[tokio::test]
async fn duo_server_header_classifies_as_duo() {
    let provider = MockProvider::start().await;
    provider.mock_oidc_discovery().await;
    provider.mock_jwks(&[("Server", "Duo Security")]).await;

    let parsed = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(parsed.provider, ProviderName::Duo);
}

#[tokio::test]
async fn unrecognized_provider_is_generic_by_default() {
    let provider = MockProvider::start().await;
    provider.mock_oidc_discovery().await;
    provider.mock_jwks(&[]).await;

    let parsed = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(parsed.provider, ProviderName::GenericIdp);
}

#[tokio::test]
async fn unrecognized_provider_can_be_rejected() {
    let provider = MockProvider::start().await;
    provider.mock_oidc_discovery().await;
    provider.mock_jwks(&[]).await;

    let parser =
        TokenParser::new(ParserConfig::default().with_allow_generic_idp(false)).unwrap();
    let err = parser
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, OidcError::UntrustedProvider { .. }));
    assert!(err.is_trust_failure());
    assert!(!err.is_invalid_token());
}

#[tokio::test]
async fn oauth_metadata_is_used_when_oidc_discovery_fails() {
    let provider = MockProvider::start_with_path("/oauth/tenant").await;
    provider.mock_oauth_discovery().await;
    provider.mock_jwks(&[]).await;

    let parsed = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(parsed.claims.issuer, provider.issuer);
    assert_eq!(parsed.provider, ProviderName::GenericIdp);

    let requested: Vec<String> = provider
        .server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(
        requested,
        vec![
            "/oauth/tenant/.well-known/openid-configuration".to_string(),
            "/.well-known/oauth-authorization-server/oauth/tenant".to_string(),
            "/jwks".to_string(),
        ]
    );
}

#[tokio::test]
async fn discovery_failure_reports_both_attempts() {
    let provider = MockProvider::start_with_path("/tenant").await;

    let err = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    let OidcError::DiscoveryFailed { issuer, oidc, oauth } = &err else {
        panic!("expected DiscoveryFailed, got {err:?}");
    };
    assert_eq!(issuer, &provider.issuer);
    assert!(oidc.contains("openid-configuration") && oidc.contains("404"), "{oidc}");
    assert!(oauth.contains("oauth-authorization-server") && oauth.contains("404"), "{oauth}");
    assert!(err.is_trust_failure());
}

#[tokio::test]
async fn discovery_document_without_jwks_uri_is_a_failed_attempt() {
    let provider = MockProvider::start().await;
    wiremock::Mock::given(wiremock::matchers::path(
        "/.well-known/openid-configuration",
    ))
    .respond_with(
        wiremock::ResponseTemplate::new(200).set_body_json(json!({ "issuer": provider.issuer })),
    )
    .mount(&provider.server)
    .await;
    provider.mock_oauth_discovery().await;
    provider.mock_jwks(&[]).await;

    let parsed = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(parsed.provider_metadata().unwrap().jwks_uri, provider.jwks_uri());
}

#[tokio::test]
async fn slow_provider_times_out() {
    let provider = MockProvider::start().await;
    provider.mock_slow_discovery(Duration::from_secs(3)).await;

    let parser = TokenParser::new(
        ParserConfig::default().with_request_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let err = parser
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, OidcError::Timeout { .. }), "{err:?}");
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn cancellation_aborts_discovery() {
    let provider = MockProvider::start().await;
    provider.mock_slow_discovery(Duration::from_secs(3)).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = parser()
        .parse_jwt(&provider.mint("agent-1"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, OidcError::Cancelled { .. }), "{err:?}");
}

#[tokio::test]
async fn token_without_subject_is_malformed() {
    let provider = MockProvider::start().await;
    let token = provider.mint_with(json!({
        "iss": provider.issuer,
        "exp": common::now() + 600,
    }));

    let err = parser()
        .parse_jwt(&token, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OidcError::MalformedToken(_)));
    assert!(err.is_invalid_token());

    // Nothing about the issuer is looked up for a token that cannot be used.
    assert!(provider.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_discovery_document_is_a_failed_attempt() {
    let provider = MockProvider::start().await;
    let padded = json!({
        "issuer": provider.issuer,
        "jwks_uri": provider.jwks_uri(),
        "padding": "x".repeat(2 * 1024 * 1024),
    });
    wiremock::Mock::given(wiremock::matchers::path(
        "/.well-known/openid-configuration",
    ))
    .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(padded))
    .mount(&provider.server)
    .await;
    provider.mock_jwks(&[]).await;

    let err = parser()
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    let OidcError::DiscoveryFailed { oidc, .. } = &err else {
        panic!("expected DiscoveryFailed, got {err:?}");
    };
    assert!(oidc.contains("exceeds 1048576 bytes"), "{oidc}");
}

#[tokio::test]
async fn jwks_over_configured_limit_is_rejected() {
    let provider = MockProvider::start().await;
    provider.mock_oidc_discovery().await;
    provider.mock_jwks(&[]).await;

    let parser = TokenParser::new(ParserConfig::default().with_max_response_bytes(256)).unwrap();
    let err = parser
        .parse_jwt(&provider.mint("agent-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, OidcError::ResponseTooLarge { url, limit: 256 } if url == &provider.jwks_uri()),
        "{err:?}"
    );
}
