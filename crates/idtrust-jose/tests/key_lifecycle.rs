//! Generation, validation and sign/verify across every registered algorithm

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use idtrust_jose::{
    Algorithm, JoseError, Jwk, decode_unverified, generate_jwk, sign, validate_priv_key,
    validate_pub_key, verify,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::OnceLock;

/// RSA key generation is slow, so each algorithm gets one key per test binary.
fn key_for(algorithm: Algorithm) -> Jwk {
    static KEYS: OnceLock<HashMap<Algorithm, Jwk>> = OnceLock::new();
    KEYS.get_or_init(|| {
        Algorithm::ALL
            .into_iter()
            .map(|alg| {
                let key = generate_jwk(alg.as_str(), "sig", &format!("{alg}-key")).unwrap();
                (alg, key)
            })
            .collect()
    })[&algorithm]
        .clone()
}

fn flip_signature_bit(token: &str, bit: usize) -> String {
    let (signing_input, signature) = token.rsplit_once('.').unwrap();
    let mut bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
    let bit = bit % (bytes.len() * 8);
    bytes[bit / 8] ^= 1 << (bit % 8);
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

#[test]
fn generated_keys_validate_by_role() {
    for algorithm in Algorithm::ALL {
        let key = key_for(algorithm);

        assert_eq!(key.alg.as_deref(), Some(algorithm.as_str()));
        assert_eq!(key.key_type(), Some(algorithm.key_type()));
        assert!(validate_pub_key(&key.public_key()).is_ok(), "{algorithm}");
        assert!(validate_priv_key(&key).is_ok(), "{algorithm}");
        assert!(
            matches!(validate_pub_key(&key), Err(JoseError::InvalidKey { .. })),
            "{algorithm}: private key passed as public"
        );
    }
}

#[test]
fn sign_then_verify_returns_payload() {
    let payload = br#"{"sub":"agent","n":42}"#;

    for algorithm in Algorithm::ALL {
        let key = key_for(algorithm);
        let token = sign(&key, payload).unwrap();

        assert_eq!(verify(&key.public_key(), &token).unwrap(), payload);
        assert_eq!(verify(&key, token.as_bytes()).unwrap(), payload);
    }
}

#[test]
fn public_key_cannot_sign() {
    for algorithm in Algorithm::ALL {
        let public = key_for(algorithm).public_key();
        assert!(
            matches!(sign(&public, b"x"), Err(JoseError::InvalidKey { .. })),
            "{algorithm}"
        );
    }
}

#[test]
fn signature_from_another_key_is_rejected() {
    let signer = key_for(Algorithm::MlDsa44);
    let stranger = generate_jwk("ML-DSA-44", "sig", "ML-DSA-44-key").unwrap();
    let token = sign(&signer, b"payload").unwrap();

    assert!(matches!(
        verify(&stranger.public_key(), &token),
        Err(JoseError::InvalidSignature { .. })
    ));
}

#[test]
fn tampered_payload_is_rejected() {
    let key = key_for(Algorithm::Rs256);
    let token = sign(&key, b"original").unwrap();
    let decoded = decode_unverified(&token).unwrap();

    let mut segments: Vec<&str> = token.split('.').collect();
    let forged_payload = URL_SAFE_NO_PAD.encode(b"forged");
    segments[1] = &forged_payload;
    let forged = segments.join(".");

    assert_eq!(decoded.payload, b"original");
    assert!(matches!(
        verify(&key.public_key(), &forged),
        Err(JoseError::InvalidSignature { .. })
    ));
}

#[test]
fn unsupported_algorithm_generates_nothing() {
    let result = generate_jwk("unsupported-alg", "sig", "k1");
    assert_eq!(
        result,
        Err(JoseError::UnsupportedAlgorithm("unsupported-alg".into()))
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_flipped_signature_bit_fails(
        alg_index in 0..Algorithm::ALL.len(),
        bit in any::<usize>(),
    ) {
        let algorithm = Algorithm::ALL[alg_index];
        let key = key_for(algorithm);
        let token = sign(&key, b"tamper me").unwrap();
        let tampered = flip_signature_bit(&token, bit);

        let result = verify(&key.public_key(), &tampered);
        prop_assert!(
            matches!(result, Err(JoseError::InvalidSignature { .. })),
            "{algorithm} accepted a flipped bit: {result:?}"
        );
    }
}
