//! Self-issued tokens
//!
//! An agent vouches for itself by signing a token whose issuer uses the reserved
//! `agntcy` scheme and whose `sub_jwk` claim carries the verification key. Whether
//! that key is trusted for the subject is for the caller to decide.

use idtrust_jose::{Jwk, sign_with_type};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::{OidcError, Result};

/// URI scheme reserved for self-issued tokens
pub const SELF_ISSUED_SCHEME: &str = "agntcy";

/// Claim carrying the issuer's public key
pub const SUB_JWK_CLAIM: &str = "sub_jwk";

/// Lifetime of a self-issued token, in seconds
pub const SELF_ISSUED_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct SelfIssuedClaims<'a> {
    iss: String,
    sub: &'a str,
    aud: [&'a str; 1],
    iat: i64,
    exp: i64,
    jti: String,
    sub_jwk: Jwk,
}

/// True when `issuer` is a URI with the self-issued scheme, in any case
pub fn is_self_issued(issuer: &str) -> bool {
    Url::parse(issuer).is_ok_and(|url| url.scheme().eq_ignore_ascii_case(SELF_ISSUED_SCHEME))
}

/// The issuer without its `agntcy:` prefix
pub(crate) fn self_issued_common_name(issuer: &str) -> &str {
    issuer
        .split_once(':')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(SELF_ISSUED_SCHEME))
        .map_or(issuer, |(_, rest)| rest)
}

/// Issues a token for `subject` signed with `key`
///
/// The token carries `iss = "agntcy:{issuer}"`, `aud = [subject]`, a one hour
/// lifetime, a random `jti` and the public half of `key` as `sub_jwk`.
///
/// # Errors
///
/// [`OidcError::InvalidKey`] when `key` is not a usable private key,
/// [`OidcError::UnsupportedAlgorithm`] when its algorithm is not registered.
pub fn self_issue_jwt(issuer: &str, subject: &str, key: &Jwk) -> Result<String> {
    let iat = chrono::Utc::now().timestamp();
    let claims = SelfIssuedClaims {
        iss: format!("{SELF_ISSUED_SCHEME}:{issuer}"),
        sub: subject,
        aud: [subject],
        iat,
        exp: iat + SELF_ISSUED_LIFETIME_SECS,
        jti: uuid::Uuid::new_v4().to_string(),
        sub_jwk: key.public_key(),
    };

    let payload = serde_json::to_vec(&claims)
        .map_err(|e| OidcError::Crypto(format!("failed to encode claims: {e}")))?;
    let token = sign_with_type(key, &payload, Some("JWT"))?;

    debug!(issuer = %claims.iss, subject, kid = ?key.kid, "Issued self-signed token");
    Ok(token)
}
