//! # idtrust-jose
//!
//! JSON Web Keys and compact JWS for agent identities, covering classical RSA and
//! post-quantum ML-DSA.
//!
//! ## Architecture
//!
//! - `jwk` - [`Jwk`] / [`Jwks`] model and public-key projection
//! - `algorithm` - the [`Algorithm`] registry and [`generate_jwk`]
//! - `validate` - structural checks for public and private keys
//! - `jws` - compact serialization, signing and verification
//!
//! ## Supported algorithms
//!
//! | `alg` | `kty` | Key size |
//! |-------|-------|----------|
//! | `RS256` | `RSA` | 2048 |
//! | `RS384` | `RSA` | 3072 |
//! | `RS512` | `RSA` | 4096 |
//! | `ML-DSA-44` | `AKP` | FIPS 204 category 2 |
//! | `ML-DSA-65` | `AKP` | FIPS 204 category 3 |
//! | `ML-DSA-87` | `AKP` | FIPS 204 category 5 |
//!
//! ## Example
//!
//! ```rust,no_run
//! use idtrust_jose::{generate_jwk, sign, verify};
//!
//! let key = generate_jwk("ML-DSA-65", "sig", "agent-key")?;
//! let token = sign(&key, br#"{"hello":"world"}"#)?;
//! let payload = verify(&key.public_key(), &token)?;
//! assert_eq!(payload, br#"{"hello":"world"}"#);
//! # Ok::<(), idtrust_jose::JoseError>(())
//! ```

pub mod algorithm;
pub mod error;
pub mod jwk;
pub mod jws;
pub mod validate;

mod mldsa;
mod rsa_pkcs1;

pub use algorithm::{Algorithm, SignatureScheme, generate_jwk};
pub use error::JoseError;
pub use jwk::{Jwk, Jwks, KeyType};
pub use jws::{
    JwsHeader, UnverifiedJws, decode_unverified, sign, sign_with_type, verify, verify_with_set,
};
pub use validate::{validate_priv_key, validate_pub_key};

/// Result type for key and signature operations
pub type Result<T> = std::result::Result<T, JoseError>;
