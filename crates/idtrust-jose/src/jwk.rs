//! JSON Web Key model
//!
//! Keys are kept as their wire strings (base64url big-endian integers for RSA,
//! base64url raw encodings for AKP) so a key read from a provider, a key file or a
//! secret manager round-trips without loss.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{JoseError, Result};

/// Key type tag carried in `kty`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// RSA key pair
    Rsa,
    /// Algorithm Key Pair, used by the ML-DSA family
    Akp,
}

impl KeyType {
    /// Wire value of the `kty` member
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Akp => "AKP",
        }
    }

    fn parse(kty: &str) -> Option<Self> {
        match kty {
            "RSA" => Some(Self::Rsa),
            "AKP" => Some(Self::Akp),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single JSON Web Key
///
/// RSA keys use `n`/`e` for the public half and `d`, `p`, `q`, `dp`, `dq`, `qi` for
/// the private half. AKP keys use `pub` for the public half and `priv` or `seed` for
/// the private half.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    #[serde(rename = "pub", default, skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
    #[serde(rename = "priv", default, skip_serializing_if = "Option::is_none")]
    pub priv_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

/// Treats empty strings as absent, the way the wire format's `omitempty` does.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

impl Jwk {
    /// Parsed `kty`, if it is one this crate understands
    pub fn key_type(&self) -> Option<KeyType> {
        present(&self.kty).and_then(KeyType::parse)
    }

    /// Whether any private member is populated
    pub fn has_private_material(&self) -> bool {
        [
            &self.d,
            &self.p,
            &self.q,
            &self.dp,
            &self.dq,
            &self.qi,
            &self.priv_key,
            &self.seed,
        ]
        .into_iter()
        .any(|field| present(field).is_some())
    }

    /// Whether the members needed to verify are populated
    pub fn has_public_material(&self) -> bool {
        match self.key_type() {
            Some(KeyType::Rsa) => present(&self.n).is_some() && present(&self.e).is_some(),
            Some(KeyType::Akp) => present(&self.pub_key).is_some(),
            None => false,
        }
    }

    /// Public projection of this key
    ///
    /// Only `alg`, `kty`, `use`, `kid` and the public members for the key type are
    /// copied. An unknown key type yields the metadata alone.
    pub fn public_key(&self) -> Jwk {
        let mut public = Jwk {
            alg: self.alg.clone(),
            kty: self.kty.clone(),
            key_use: self.key_use.clone(),
            kid: self.kid.clone(),
            ..Jwk::default()
        };

        match self.key_type() {
            Some(KeyType::Rsa) => {
                public.n = self.n.clone();
                public.e = self.e.clone();
            }
            Some(KeyType::Akp) => {
                public.pub_key = self.pub_key.clone();
            }
            None => {}
        }

        public
    }

    /// Wraps this key in a single-entry key set
    pub fn into_set(self) -> Jwks {
        Jwks { keys: vec![self] }
    }

    /// JSON encoding of the key
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a single key from JSON
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Serialization`] if the document is not a JWK object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |field: &Option<String>| present(field).map(|_| "<redacted>");

        f.debug_struct("Jwk")
            .field("alg", &self.alg)
            .field("kty", &self.kty)
            .field("use", &self.key_use)
            .field("kid", &self.kid)
            .field("pub", &self.pub_key)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("priv", &redact(&self.priv_key))
            .field("seed", &redact(&self.seed))
            .field("d", &redact(&self.d))
            .field("p", &redact(&self.p))
            .field("q", &redact(&self.q))
            .field("dp", &redact(&self.dp))
            .field("dq", &redact(&self.dq))
            .field("qi", &redact(&self.qi))
            .finish()
    }
}

/// An ordered JSON Web Key Set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// First key whose `kid` matches
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parses a JWKS document
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Serialization`] if the body is not a JWKS object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(JoseError::from)
    }

    /// JSON encoding of the set
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Vec<Jwk>> for Jwks {
    fn from(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }
}
