//! RSASSA-PKCS1-v1_5 over the `rsa` crate

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::rngs::OsRng;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::algorithm::SignatureScheme;
use crate::jwk::{Jwk, present};
use crate::{JoseError, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) enum RsaDigest {
    Sha256,
    Sha384,
    Sha512,
}

/// Runs `$body` with `$digest` bound to the hash type for `$selector`.
macro_rules! with_digest {
    ($selector:expr, $digest:ident => $body:expr) => {
        match $selector {
            RsaDigest::Sha256 => {
                type $digest = sha2::Sha256;
                $body
            }
            RsaDigest::Sha384 => {
                type $digest = sha2::Sha384;
                $body
            }
            RsaDigest::Sha512 => {
                type $digest = sha2::Sha512;
                $body
            }
        }
    };
}

pub(crate) struct RsaScheme {
    pub(crate) digest: RsaDigest,
    pub(crate) modulus_bits: usize,
}

impl SignatureScheme for RsaScheme {
    fn generate(&self) -> Result<Jwk> {
        let key = RsaPrivateKey::new(&mut OsRng, self.modulus_bits)
            .map_err(|e| JoseError::crypto(format!("RSA key generation failed: {e}")))?;
        private_key_members(&key)
    }

    fn sign(&self, jwk: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
        let key = private_key(jwk)?;
        with_digest!(self.digest, D => {
            SigningKey::<D>::new(key)
                .try_sign(message)
                .map(|signature| signature.to_vec())
                .map_err(|e| JoseError::crypto(format!("RSA signing failed: {e}")))
        })
    }

    fn verify(&self, jwk: &Jwk, message: &[u8], signature: &[u8]) -> Result<()> {
        let key = public_key(jwk)?;
        let signature = Signature::try_from(signature)
            .map_err(|_| JoseError::invalid_signature("signature is not an RSA signature"))?;
        with_digest!(self.digest, D => {
            VerifyingKey::<D>::new(key)
                .verify(message, &signature)
                .map_err(|_| JoseError::invalid_signature("signature does not match"))
        })
    }
}

fn encode(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn decode(field: &Option<String>, name: &str) -> Result<BigUint> {
    let text = present(field).ok_or_else(|| JoseError::invalid_key(format!("missing '{name}'")))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|_| JoseError::invalid_key(format!("'{name}' is not base64url")))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

fn private_key_members(key: &RsaPrivateKey) -> Result<Jwk> {
    let [p, q] = key.primes() else {
        return Err(JoseError::crypto("RSA key does not have exactly two primes"));
    };
    let (Some(dp), Some(dq), Some(qinv)) = (key.dp(), key.dq(), key.qinv()) else {
        return Err(JoseError::crypto("RSA key is missing CRT values"));
    };
    let (_, qi) = qinv.to_bytes_be();

    Ok(Jwk {
        n: Some(encode(key.n())),
        e: Some(encode(key.e())),
        d: Some(encode(key.d())),
        p: Some(encode(p)),
        q: Some(encode(q)),
        dp: Some(encode(dp)),
        dq: Some(encode(dq)),
        qi: Some(URL_SAFE_NO_PAD.encode(qi)),
        ..Jwk::default()
    })
}

pub(crate) fn public_key(jwk: &Jwk) -> Result<RsaPublicKey> {
    let n = decode(&jwk.n, "n")?;
    let e = decode(&jwk.e, "e")?;
    RsaPublicKey::new(n, e).map_err(|e| JoseError::invalid_key(format!("RSA public key: {e}")))
}

pub(crate) fn private_key(jwk: &Jwk) -> Result<RsaPrivateKey> {
    let key = RsaPrivateKey::from_components(
        decode(&jwk.n, "n")?,
        decode(&jwk.e, "e")?,
        decode(&jwk.d, "d")?,
        vec![decode(&jwk.p, "p")?, decode(&jwk.q, "q")?],
    )
    .map_err(|e| JoseError::invalid_key(format!("RSA private key: {e}")))?;

    key.validate()
        .map_err(|e| JoseError::invalid_key(format!("RSA private key is inconsistent: {e}")))?;
    Ok(key)
}

/// Rebuilds the private key and checks the supplied CRT members against it
pub(crate) fn check_private(jwk: &Jwk) -> Result<()> {
    let key = private_key(jwk)?;
    let expected = private_key_members(&key)?;

    for (name, supplied, derived) in [
        ("dp", &jwk.dp, &expected.dp),
        ("dq", &jwk.dq, &expected.dq),
        ("qi", &jwk.qi, &expected.qi),
    ] {
        let supplied = decode(supplied, name)?;
        let derived = decode(derived, name)?;
        if supplied != derived {
            return Err(JoseError::invalid_key(format!(
                "'{name}' does not match the key"
            )));
        }
    }
    Ok(())
}
