//! Algorithm registry
//!
//! Every supported `alg` maps to one [`SignatureScheme`] that owns key generation,
//! signing and verification for it. Call sites go through [`Algorithm::scheme`], so a
//! new algorithm only needs a variant, a scheme and a registry entry.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use uuid::Uuid;

use crate::jwk::{Jwk, KeyType, present};
use crate::mldsa::{MlDsaLevel, MlDsaScheme};
use crate::rsa_pkcs1::{RsaDigest, RsaScheme};
use crate::{JoseError, Result};

/// Key generation, signing and verification for one algorithm
pub trait SignatureScheme: Send + Sync {
    /// Generates a fresh key pair. Only the key members are filled in; the caller
    /// stamps `alg`, `kty`, `use` and `kid`.
    fn generate(&self) -> Result<Jwk>;

    /// Signs `message` with the private half of `jwk`
    fn sign(&self, jwk: &Jwk, message: &[u8]) -> Result<Vec<u8>>;

    /// Checks `signature` over `message` with the public half of `jwk`
    fn verify(&self, jwk: &Jwk, message: &[u8], signature: &[u8]) -> Result<()>;
}

/// Supported JWS algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256, 2048-bit modulus
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384, 3072-bit modulus
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512, 4096-bit modulus
    Rs512,
    /// ML-DSA-44 (FIPS 204 category 2)
    MlDsa44,
    /// ML-DSA-65 (FIPS 204 category 3)
    MlDsa65,
    /// ML-DSA-87 (FIPS 204 category 5)
    MlDsa87,
}

static RS256: RsaScheme = RsaScheme {
    digest: RsaDigest::Sha256,
    modulus_bits: 2048,
};
static RS384: RsaScheme = RsaScheme {
    digest: RsaDigest::Sha384,
    modulus_bits: 3072,
};
static RS512: RsaScheme = RsaScheme {
    digest: RsaDigest::Sha512,
    modulus_bits: 4096,
};
static ML_DSA_44: MlDsaScheme = MlDsaScheme {
    level: MlDsaLevel::Ml44,
};
static ML_DSA_65: MlDsaScheme = MlDsaScheme {
    level: MlDsaLevel::Ml65,
};
static ML_DSA_87: MlDsaScheme = MlDsaScheme {
    level: MlDsaLevel::Ml87,
};

impl Algorithm {
    /// Every registered algorithm
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Rs256,
        Algorithm::Rs384,
        Algorithm::Rs512,
        Algorithm::MlDsa44,
        Algorithm::MlDsa65,
        Algorithm::MlDsa87,
    ];

    /// Wire value of the `alg` member
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::MlDsa44 => "ML-DSA-44",
            Self::MlDsa65 => "ML-DSA-65",
            Self::MlDsa87 => "ML-DSA-87",
        }
    }

    /// Key type a key for this algorithm must carry
    pub fn key_type(self) -> KeyType {
        match self {
            Self::Rs256 | Self::Rs384 | Self::Rs512 => KeyType::Rsa,
            Self::MlDsa44 | Self::MlDsa65 | Self::MlDsa87 => KeyType::Akp,
        }
    }

    /// Registered implementation for this algorithm
    pub fn scheme(self) -> &'static dyn SignatureScheme {
        match self {
            Self::Rs256 => &RS256,
            Self::Rs384 => &RS384,
            Self::Rs512 => &RS512,
            Self::MlDsa44 => &ML_DSA_44,
            Self::MlDsa65 => &ML_DSA_65,
            Self::MlDsa87 => &ML_DSA_87,
        }
    }

    pub(crate) fn mldsa_level(self) -> Option<MlDsaLevel> {
        match self {
            Self::MlDsa44 => Some(MlDsaLevel::Ml44),
            Self::MlDsa65 => Some(MlDsaLevel::Ml65),
            Self::MlDsa87 => Some(MlDsaLevel::Ml87),
            _ => None,
        }
    }

    /// Algorithm named by a key's `alg` member
    ///
    /// # Errors
    ///
    /// [`JoseError::InvalidKey`] when the key is empty or names no algorithm,
    /// [`JoseError::UnsupportedAlgorithm`] when the algorithm is not registered.
    pub fn for_key(jwk: &Jwk) -> Result<Self> {
        if present(&jwk.kty).is_none() {
            return Err(JoseError::invalid_key("key is empty"));
        }
        let alg =
            present(&jwk.alg).ok_or_else(|| JoseError::invalid_key("key does not name an alg"))?;
        alg.parse()
    }
}

impl FromStr for Algorithm {
    type Err = JoseError;

    fn from_str(alg: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == alg)
            .ok_or_else(|| JoseError::UnsupportedAlgorithm(alg.to_owned()))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a new key pair for `alg`
///
/// An empty `kid` is replaced with a random UUID. An empty `key_use` leaves `use` unset.
///
/// # Errors
///
/// Returns [`JoseError::UnsupportedAlgorithm`] for an unknown `alg`; no key material is
/// generated in that case.
pub fn generate_jwk(alg: &str, key_use: &str, kid: &str) -> Result<Jwk> {
    let algorithm: Algorithm = alg.parse()?;

    let mut jwk = algorithm.scheme().generate()?;
    jwk.alg = Some(algorithm.as_str().to_owned());
    jwk.kty = Some(algorithm.key_type().as_str().to_owned());
    jwk.key_use = (!key_use.is_empty()).then(|| key_use.to_owned());
    jwk.kid = Some(if kid.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        kid.to_owned()
    });

    debug!(alg = %algorithm, kid = ?jwk.kid, "Generated key pair");
    Ok(jwk)
}
