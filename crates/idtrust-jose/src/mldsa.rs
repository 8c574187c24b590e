//! ML-DSA (FIPS 204) over `pqcrypto-mldsa`
//!
//! AKP keys carry the raw public and secret key encodings as base64url in `pub` and
//! `priv`. A key holding only a `seed` is structurally a private key, but the backing
//! implementation cannot expand seeds, so it cannot sign.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};

use crate::algorithm::SignatureScheme;
use crate::jwk::{Jwk, present};
use crate::{JoseError, Result};

/// Length of an ML-DSA key generation seed
pub(crate) const SEED_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MlDsaLevel {
    Ml44,
    Ml65,
    Ml87,
}

/// Runs `$body` with `$module` bound to the parameter set for `$level`.
macro_rules! with_level {
    ($level:expr, $module:ident => $body:expr) => {
        match $level {
            MlDsaLevel::Ml44 => {
                use pqcrypto_mldsa::mldsa44 as $module;
                $body
            }
            MlDsaLevel::Ml65 => {
                use pqcrypto_mldsa::mldsa65 as $module;
                $body
            }
            MlDsaLevel::Ml87 => {
                use pqcrypto_mldsa::mldsa87 as $module;
                $body
            }
        }
    };
}

impl MlDsaLevel {
    pub(crate) fn public_key_len(self) -> usize {
        with_level!(self, m => m::public_key_bytes())
    }

    pub(crate) fn secret_key_len(self) -> usize {
        with_level!(self, m => m::secret_key_bytes())
    }
}

pub(crate) struct MlDsaScheme {
    pub(crate) level: MlDsaLevel,
}

impl SignatureScheme for MlDsaScheme {
    fn generate(&self) -> Result<Jwk> {
        let (public, secret) = with_level!(self.level, m => {
            let (pk, sk) = m::keypair();
            (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        });

        Ok(Jwk {
            pub_key: Some(URL_SAFE_NO_PAD.encode(public)),
            priv_key: Some(URL_SAFE_NO_PAD.encode(secret)),
            ..Jwk::default()
        })
    }

    fn sign(&self, jwk: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
        if present(&jwk.priv_key).is_none() && present(&jwk.seed).is_some() {
            return Err(JoseError::invalid_key(
                "seed-only ML-DSA keys cannot be used for signing",
            ));
        }
        let secret = decode(&jwk.priv_key, "priv")?;

        with_level!(self.level, m => {
            let sk = m::SecretKey::from_bytes(&secret)
                .map_err(|_| JoseError::invalid_key("'priv' has the wrong length"))?;
            Ok(m::detached_sign(message, &sk).as_bytes().to_vec())
        })
    }

    fn verify(&self, jwk: &Jwk, message: &[u8], signature: &[u8]) -> Result<()> {
        let public = decode(&jwk.pub_key, "pub")?;

        with_level!(self.level, m => {
            let pk = m::PublicKey::from_bytes(&public)
                .map_err(|_| JoseError::invalid_key("'pub' has the wrong length"))?;
            let signature = m::DetachedSignature::from_bytes(signature)
                .map_err(|_| JoseError::invalid_signature("signature has the wrong length"))?;
            m::verify_detached_signature(&signature, message, &pk)
                .map_err(|_| JoseError::invalid_signature("signature does not match"))
        })
    }
}

pub(crate) fn decode(field: &Option<String>, name: &str) -> Result<Vec<u8>> {
    let text = present(field).ok_or_else(|| JoseError::invalid_key(format!("missing '{name}'")))?;
    URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|_| JoseError::invalid_key(format!("'{name}' is not base64url")))
}
