//! Provider fingerprinting
//!
//! Rules are evaluated in a fixed order and the first match wins, since one
//! response may satisfy several predicates:
//!
//! | Priority | Provider | Evidence |
//! |----------|----------|----------|
//! | 1 | Ory | `Ory-Network-Region` header, or JWKS host ending in `oryapis.com` |
//! | 2 | Okta | `X-Okta-Request-Id` header |
//! | 3 | Duo | `Server` header starting with `duo`, or JWKS host starting with `duosecurity.com` |
//! | - | GenericIdp | nothing matched |

use reqwest::header::{HeaderMap, SERVER};

use crate::claims::ProviderName;

const ORY_REGION_HEADER: &str = "ory-network-region";
const ORY_DOMAIN: &str = "oryapis.com";
const OKTA_REQUEST_ID_HEADER: &str = "x-okta-request-id";
const DUO_SERVER_PREFIX: &str = "duo";
const DUO_DOMAIN: &str = "duosecurity.com";

/// One fingerprint rule
#[derive(Debug, Clone, Copy)]
pub struct FingerprintRule {
    pub provider: ProviderName,
    matches: fn(&HeaderMap, &str) -> bool,
}

impl FingerprintRule {
    /// Evaluates the rule against a JWKS response's headers and lowercased host
    pub fn matches(&self, headers: &HeaderMap, host: &str) -> bool {
        (self.matches)(headers, host)
    }
}

/// Rules in evaluation order
pub const RULES: [FingerprintRule; 3] = [
    FingerprintRule {
        provider: ProviderName::Ory,
        matches: is_ory,
    },
    FingerprintRule {
        provider: ProviderName::Okta,
        matches: is_okta,
    },
    FingerprintRule {
        provider: ProviderName::Duo,
        matches: is_duo,
    },
];

/// Names the provider behind a JWKS response
pub fn classify(headers: &HeaderMap, host: &str) -> ProviderName {
    RULES
        .iter()
        .find(|rule| rule.matches(headers, host))
        .map_or(ProviderName::GenericIdp, |rule| rule.provider)
}

fn is_ory(headers: &HeaderMap, host: &str) -> bool {
    headers.contains_key(ORY_REGION_HEADER) || host.ends_with(ORY_DOMAIN)
}

fn is_okta(headers: &HeaderMap, _host: &str) -> bool {
    headers.contains_key(OKTA_REQUEST_ID_HEADER)
}

fn is_duo(headers: &HeaderMap, host: &str) -> bool {
    let server_is_duo = headers
        .get(SERVER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|server| server.to_ascii_lowercase().starts_with(DUO_SERVER_PREFIX));
    server_is_duo || host.starts_with(DUO_DOMAIN)
}
