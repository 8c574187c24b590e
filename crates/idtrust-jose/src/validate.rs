//! Structural key validation

use crate::algorithm::Algorithm;
use crate::jwk::{Jwk, KeyType, present};
use crate::mldsa::{self, MlDsaLevel, SEED_LEN};
use crate::rsa_pkcs1;
use crate::{JoseError, Result};

/// Checks that `jwk` is a usable public key
///
/// A key carrying any private member is rejected even when its public members are
/// complete.
///
/// # Errors
///
/// Returns [`JoseError::InvalidKey`] describing the first problem found.
pub fn validate_pub_key(jwk: &Jwk) -> Result<()> {
    let kty = key_type(jwk)?;
    if jwk.has_private_material() {
        return Err(JoseError::invalid_key("public key carries private members"));
    }

    match kty {
        KeyType::Rsa => rsa_pkcs1::public_key(jwk).map(drop),
        KeyType::Akp => {
            let public = mldsa::decode(&jwk.pub_key, "pub")?;
            match declared_level(jwk) {
                Some(level) => expect_len("pub", public.len(), level.public_key_len()),
                None => Ok(()),
            }
        }
    }
}

/// Checks that `jwk` is a complete, self-consistent private key
///
/// RSA keys need every private member including the CRT values, which must agree
/// with `n`, `e`, `d`, `p` and `q`. AKP keys need `priv` or `seed`.
///
/// # Errors
///
/// Returns [`JoseError::InvalidKey`] describing the first problem found.
pub fn validate_priv_key(jwk: &Jwk) -> Result<()> {
    match key_type(jwk)? {
        KeyType::Rsa => {
            for (name, field) in [("dp", &jwk.dp), ("dq", &jwk.dq), ("qi", &jwk.qi)] {
                if present(field).is_none() {
                    return Err(JoseError::invalid_key(format!("missing '{name}'")));
                }
            }
            rsa_pkcs1::check_private(jwk)
        }
        KeyType::Akp => {
            let level = declared_level(jwk);
            if present(&jwk.priv_key).is_some() {
                let secret = mldsa::decode(&jwk.priv_key, "priv")?;
                if let Some(level) = level {
                    expect_len("priv", secret.len(), level.secret_key_len())?;
                }
                Ok(())
            } else if present(&jwk.seed).is_some() {
                let seed = mldsa::decode(&jwk.seed, "seed")?;
                expect_len("seed", seed.len(), SEED_LEN)
            } else {
                Err(JoseError::invalid_key("AKP key has neither 'priv' nor 'seed'"))
            }
        }
    }
}

fn key_type(jwk: &Jwk) -> Result<KeyType> {
    let kty = present(&jwk.kty).ok_or_else(|| JoseError::invalid_key("key is empty"))?;
    let key_type = jwk
        .key_type()
        .ok_or_else(|| JoseError::invalid_key(format!("unsupported kty '{kty}'")))?;

    if let Some(alg) = present(&jwk.alg)
        && let Ok(algorithm) = alg.parse::<Algorithm>()
        && algorithm.key_type() != key_type
    {
        return Err(JoseError::invalid_key(format!(
            "alg {algorithm} requires kty {}",
            algorithm.key_type()
        )));
    }
    Ok(key_type)
}

fn declared_level(jwk: &Jwk) -> Option<MlDsaLevel> {
    present(&jwk.alg)
        .and_then(|alg| alg.parse::<Algorithm>().ok())
        .and_then(Algorithm::mldsa_level)
}

fn expect_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(JoseError::invalid_key(format!(
            "'{name}' is {actual} bytes, expected {expected}"
        )))
    }
}
