//! Factory-level behaviour: configuration presets, restricted mode, spec
//! predicates and generator caching.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

use loom_core::primitives::keys::KeyType;
use loom_core::primitives::spec::{
    AgreementSpec, AgreementType, AsymKeySpec, AsymKeyType, CipherMode, DigestType, EcCurve, KdfType, KeyLength,
    MacSpec, Padding, SignatureSpec, SignatureType, StreamCipherSpec, StreamKeyType, SymCipherSpec, SymKeySpec,
    SymKeyType,
};
use loom_core::{CryptoFactory, FactoryConfig, LoomError, RESTRICTED_KEY_BITS};
use std::sync::Arc;

fn development() -> CryptoFactory {
    CryptoFactory::new(FactoryConfig::for_development()).unwrap()
}

fn restricted() -> CryptoFactory {
    CryptoFactory::new(FactoryConfig::for_development().with_restricted(true)).unwrap()
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_invalid_config_is_rejected_by_factory() {
    let err = CryptoFactory::new(FactoryConfig::new().with_seed([0u8; 32])).unwrap_err();
    assert!(matches!(err, LoomError::InvalidParameter(_)));
}

#[test]
fn test_seeded_factories_reproduce_keys() {
    let key_type = KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len256));
    let a = CryptoFactory::new(FactoryConfig::for_development().with_seed([9u8; 32])).unwrap();
    let b = CryptoFactory::new(FactoryConfig::for_development().with_seed([9u8; 32])).unwrap();
    let key_a = a.key_generator(key_type).unwrap().generate_key();
    let key_b = b.key_generator(key_type).unwrap().generate_key();
    assert_eq!(key_a.as_bytes(), key_b.as_bytes());

    let c = development();
    let key_c = c.key_generator(key_type).unwrap().generate_key();
    assert_ne!(key_a.as_bytes(), key_c.as_bytes());
}

#[test]
fn test_defaults_factory() {
    let factory = CryptoFactory::with_defaults().unwrap();
    assert!(factory.config().pairwise_consistency_check);
    assert!(factory.xmss_registry().is_some());
    assert!(factory.cache().is_empty());
}

// ============================================================================
// Restricted mode
// ============================================================================

#[test]
fn test_restricted_caps_symmetric_keys() {
    let factory = restricted();
    for key_type in [SymKeyType::Aes, SymKeyType::Aria, SymKeyType::Camellia, SymKeyType::Serpent] {
        assert!(factory.supports_sym_key(SymKeySpec::new(key_type, KeyLength::Len128)));
        assert!(!factory.supports_sym_key(SymKeySpec::new(key_type, KeyLength::Len192)));
        assert!(!factory.supports_sym_key(SymKeySpec::new(key_type, KeyLength::Len256)));
    }
    assert_eq!(RESTRICTED_KEY_BITS, 128);
}

#[test]
fn test_restricted_caps_stream_keys() {
    let factory = restricted();
    for key_type in [StreamKeyType::ChaCha20, StreamKeyType::XSalsa20, StreamKeyType::Hc256] {
        assert!(!factory.supports_stream_key(key_type));
        assert!(factory.stream_cipher(StreamCipherSpec::stream(key_type)).is_err());
    }
    assert!(factory.stream_cipher(StreamCipherSpec::stream(StreamKeyType::Rabbit)).is_ok());
}

#[test]
fn test_restricted_leaves_asymmetric_and_digest_alone() {
    let factory = restricted();
    assert!(factory.supports_digest(DigestType::Sha512));
    assert!(factory.supports_key_pair(AsymKeySpec::Ec(EcCurve::Secp384r1)));
    assert!(factory.supports_mac(MacSpec::Blake2b));
    assert!(factory.supports_mac(MacSpec::Gmac(SymKeySpec::aes(KeyLength::Len128))));
    assert!(!factory.supports_mac(MacSpec::Gmac(SymKeySpec::aes(KeyLength::Len256))));
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_inconsistent_specs_are_rejected() {
    let factory = development();

    let padded_ctr = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Ctr, Padding::Pkcs7);
    assert!(!factory.supports_sym_cipher(padded_ctr));
    assert!(matches!(factory.block_cipher(padded_ctr), Err(LoomError::UnsupportedAlgorithm(_))));

    let des_gcm = SymCipherSpec::new(
        SymKeySpec::new(SymKeyType::DesEde, KeyLength::Len192),
        CipherMode::Gcm,
        Padding::None,
    );
    assert!(factory.aead_cipher(des_gcm).is_err());

    let salsa_aead = StreamCipherSpec::aead(StreamKeyType::Salsa20);
    assert!(!factory.supports_stream_cipher(salsa_aead));

    let ed_pss = SignatureSpec::new(AsymKeyType::Ed25519, SignatureType::Pss, Some(DigestType::Sha256));
    assert!(!factory.supports_signature(ed_pss));
    assert!(matches!(factory.signer(ed_pss), Err(LoomError::UnsupportedAlgorithm(_))));

    let ed_agreement = AgreementSpec::new(AsymKeySpec::Ed25519, AgreementType::Basic, KdfType::None);
    assert!(!factory.supports_agreement(ed_agreement));
    assert!(factory.agreement(ed_agreement).is_err());
}

#[test]
fn test_gcm_and_gmac_support_matches_engines() {
    for factory in [development(), restricted()] {
        for key_type in SymKeyType::ALL {
            for key_length in [KeyLength::Len128, KeyLength::Len192, KeyLength::Len256] {
                let key_spec = SymKeySpec::new(key_type, key_length);
                let gcm = SymCipherSpec::new(key_spec, CipherMode::Gcm, Padding::None);
                assert_eq!(factory.supports_sym_cipher(gcm), factory.aead_cipher(gcm).is_ok(), "{gcm}");

                let gmac = MacSpec::Gmac(key_spec);
                if factory.supports_mac(gmac) {
                    let key = factory.key_generator(KeyType::Mac(gmac)).unwrap().generate_key();
                    let mut engine = factory.mac(gmac).unwrap();
                    engine.init(&key, Some(&[0u8; 12])).unwrap_or_else(|e| panic!("{gmac}: {e}"));
                    assert_eq!(engine.compute(b"gmac").unwrap().len(), 16);
                } else {
                    assert!(factory.mac(gmac).is_err(), "{gmac}");
                }
            }
        }
    }
    let development = development();
    let aes192 = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len192), CipherMode::Gcm, Padding::None);
    assert!(!development.supports_sym_cipher(aes192));
    let camellia = SymKeySpec::new(SymKeyType::Camellia, KeyLength::Len128);
    assert!(!development.supports_mac(MacSpec::Gmac(camellia)));
    assert!(development.supports_mac(MacSpec::Cmac(camellia)));
}

#[test]
fn test_kem_support_by_family() {
    let factory = development();
    for key_type in [
        AsymKeyType::Rsa,
        AsymKeyType::Ec,
        AsymKeyType::Sm2,
        AsymKeyType::Dh,
        AsymKeyType::X25519,
        AsymKeyType::X448,
        AsymKeyType::MlKem,
        AsymKeyType::McEliece,
    ] {
        assert!(factory.supports_kem(key_type), "{key_type} should support KEM");
    }
    for key_type in [AsymKeyType::Ed25519, AsymKeyType::Dsa, AsymKeyType::MlDsa, AsymKeyType::Xmss] {
        assert!(!factory.supports_kem(key_type), "{key_type} should not support KEM");
    }

    let signer = factory.generate_key_pair(AsymKeySpec::Ed25519).unwrap();
    assert!(matches!(
        factory.kem_sender(&signer, DigestType::Sha256),
        Err(LoomError::UnsupportedAlgorithm(_))
    ));
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_equal_specs_share_generators() {
    let factory = development();
    let aes = KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len128));
    let hmac = KeyType::Mac(MacSpec::Hmac(DigestType::Sha256));

    let first = factory.key_generator(aes).unwrap();
    let second = factory.key_generator(aes).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let mac = factory.key_generator(hmac).unwrap();
    assert!(!Arc::ptr_eq(&first, &mac));

    let ed_a = factory.key_pair_generator(AsymKeySpec::Ed25519).unwrap();
    let ed_b = factory.key_pair_generator(AsymKeySpec::Ed25519).unwrap();
    assert!(Arc::ptr_eq(&ed_a, &ed_b));
    assert_eq!(factory.cache().len(), 3);
}

#[test]
fn test_cache_is_shared_across_threads() {
    let factory = Arc::new(development());
    let key_type = KeyType::Stream(StreamKeyType::XChaCha20);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let factory = Arc::clone(&factory);
            std::thread::spawn(move || factory.key_generator(key_type).unwrap())
        })
        .collect();
    let generators: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for generator in &generators[1..] {
        assert!(Arc::ptr_eq(&generators[0], generator));
    }
    assert_eq!(factory.cache().len(), 1);
}

#[test]
fn test_generated_pairs_pass_self_test() {
    let factory = CryptoFactory::new(FactoryConfig::for_production()).unwrap();
    for spec in [
        AsymKeySpec::Ec(EcCurve::Secp256r1),
        AsymKeySpec::Ed25519,
        AsymKeySpec::Sm2,
        AsymKeySpec::MlDsa(loom_core::primitives::spec::MlDsaParams::MlDsa44),
    ] {
        let pair = factory.generate_key_pair(spec).unwrap();
        assert_eq!(pair.spec(), spec);
        assert!(pair.has_private());
    }
}
