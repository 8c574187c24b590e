//! Compact JWS serialization
//!
//! Tokens are `base64url(header) . base64url(payload) . base64url(signature)` with the
//! header `{alg, kid?, typ?}`. The algorithm set includes ML-DSA, which general purpose
//! JWT crates do not model, so the serialization is handled here and the signature
//! itself is delegated to the algorithm registry.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::algorithm::Algorithm;
use crate::jwk::{Jwk, Jwks, present};
use crate::validate::{validate_priv_key, validate_pub_key};
use crate::{JoseError, Result};

/// JOSE protected header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// A decoded but unverified compact JWS
#[derive(Debug, Clone)]
pub struct UnverifiedJws {
    pub header: JwsHeader,
    pub payload: Vec<u8>,
    signing_input: String,
    signature: Vec<u8>,
}

impl UnverifiedJws {
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

/// Signs `payload` with a private key and returns the compact serialization
///
/// # Errors
///
/// [`JoseError::InvalidKey`] for an empty or incomplete key,
/// [`JoseError::UnsupportedAlgorithm`] when the key's `alg` is not registered.
pub fn sign(jwk: &Jwk, payload: &[u8]) -> Result<String> {
    sign_with_type(jwk, payload, None)
}

/// Like [`sign`], also setting the header `typ`
///
/// # Errors
///
/// See [`sign`].
pub fn sign_with_type(jwk: &Jwk, payload: &[u8], typ: Option<&str>) -> Result<String> {
    let algorithm = Algorithm::for_key(jwk)?;
    validate_priv_key(jwk)?;

    let header = JwsHeader {
        alg: algorithm.as_str().to_owned(),
        kid: present(&jwk.kid).map(str::to_owned),
        typ: typ.map(str::to_owned),
    };
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let signature = algorithm.scheme().sign(jwk, signing_input.as_bytes())?;
    trace!(alg = %algorithm, kid = ?header.kid, "Signed payload");

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verifies a compact JWS against one key and returns its payload
///
/// Private keys are accepted; only their public members are used.
///
/// # Errors
///
/// [`JoseError::InvalidKey`] for an empty or unusable key,
/// [`JoseError::UnsupportedAlgorithm`] when the key or header names an unregistered
/// algorithm, [`JoseError::MalformedJws`] when the token cannot be decoded and
/// [`JoseError::InvalidSignature`] when the signature does not verify.
pub fn verify(jwk: &Jwk, jws: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    if present(&jwk.kty).is_none() {
        return Err(JoseError::invalid_key("key is empty"));
    }
    if let Some(alg) = present(&jwk.alg) {
        alg.parse::<Algorithm>()?;
    }

    let decoded = decode_unverified(jws)?;
    verify_decoded(jwk, &decoded)?;
    Ok(decoded.payload)
}

/// Verifies a compact JWS against a key set and returns its payload
///
/// When the header names a `kid`, only keys with that `kid` are tried, falling back
/// to keys without any `kid`. Without a header `kid`, every key of the right type is
/// tried.
///
/// # Errors
///
/// [`JoseError::InvalidSignature`] when no candidate key verifies the token, plus the
/// decoding errors of [`decode_unverified`].
pub fn verify_with_set(jwks: &Jwks, jws: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let decoded = decode_unverified(jws)?;
    let algorithm: Algorithm = decoded.header.alg.parse()?;

    let fits = |key: &&Jwk| key.key_type() == Some(algorithm.key_type());
    let candidates: Vec<&Jwk> = match decoded.header.kid.as_deref() {
        Some(kid) => {
            let named: Vec<&Jwk> = jwks
                .keys
                .iter()
                .filter(|key| key.kid.as_deref() == Some(kid))
                .collect();
            if named.is_empty() {
                jwks.keys
                    .iter()
                    .filter(|key| present(&key.kid).is_none())
                    .filter(fits)
                    .collect()
            } else {
                named
            }
        }
        None => jwks.keys.iter().filter(fits).collect(),
    };

    if candidates.is_empty() {
        return Err(JoseError::invalid_signature(format!(
            "no key in the set matches kid {:?} and alg {algorithm}",
            decoded.header.kid
        )));
    }

    for key in &candidates {
        match verify_decoded(key, &decoded) {
            Ok(()) => return Ok(decoded.payload),
            Err(e) => debug!(kid = ?key.kid, error = %e, "Key did not verify token"),
        }
    }

    Err(JoseError::invalid_signature(format!(
        "none of {} candidate keys verified the signature",
        candidates.len()
    )))
}

/// Splits and decodes a compact JWS without checking its signature
///
/// # Errors
///
/// [`JoseError::MalformedJws`] when the token does not have three base64url segments
/// or the header is not JSON, [`JoseError::InvalidSignature`] when only the signature
/// segment fails to decode.
pub fn decode_unverified(jws: impl AsRef<[u8]>) -> Result<UnverifiedJws> {
    let text = std::str::from_utf8(jws.as_ref())
        .map_err(|_| JoseError::malformed("token is not UTF-8"))?;

    let mut segments = text.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(JoseError::malformed("expected three dot-separated segments"));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| JoseError::malformed("header is not base64url"))?;
    let header: JwsHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| JoseError::malformed(format!("header is not a JOSE header: {e}")))?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| JoseError::malformed("payload is not base64url"))?;
    let signature_bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| JoseError::invalid_signature("signature is not base64url"))?;

    let signing_input_len = text.len() - signature.len() - 1;
    Ok(UnverifiedJws {
        header,
        payload: payload_bytes,
        signing_input: text[..signing_input_len].to_owned(),
        signature: signature_bytes,
    })
}

fn verify_decoded(jwk: &Jwk, decoded: &UnverifiedJws) -> Result<()> {
    let algorithm: Algorithm = decoded.header.alg.parse()?;

    if let Some(key_alg) = present(&jwk.alg)
        && key_alg != algorithm.as_str()
    {
        return Err(JoseError::invalid_signature(format!(
            "key is for {key_alg}, token is signed with {algorithm}"
        )));
    }

    let public = jwk.public_key();
    if public.key_type() != Some(algorithm.key_type()) {
        return Err(JoseError::invalid_key(format!(
            "{algorithm} needs a {} key",
            algorithm.key_type()
        )));
    }
    validate_pub_key(&public)?;

    algorithm
        .scheme()
        .verify(&public, decoded.signing_input.as_bytes(), &decoded.signature)
}
