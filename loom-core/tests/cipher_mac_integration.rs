//! Symmetric engines built by the factory: block modes, stream ciphers,
//! AEAD, key wrap and MACs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

use loom_core::primitives::cipher::Cipher;
use loom_core::primitives::keys::{Key, KeyType};
use loom_core::primitives::spec::{
    AsymKeySpec, CipherMode, DigestType, KeyLength, MacSpec, Padding, StreamCipherSpec, StreamKeyType,
    SymCipherSpec, SymKeySpec, SymKeyType,
};
use loom_core::{CryptoFactory, FactoryConfig, LoomError};
use proptest::prelude::*;

fn factory() -> CryptoFactory {
    CryptoFactory::new(FactoryConfig::for_development()).unwrap()
}

fn key(factory: &CryptoFactory, key_type: KeyType) -> Key {
    factory.key_generator(key_type).unwrap().generate_key()
}

// ============================================================================
// Block and stream ciphers
// ============================================================================

#[test]
fn test_block_modes_round_trip() {
    let factory = factory();
    let message = b"forty-one bytes of plaintext for the mode";
    for (key_type, key_length) in [
        (SymKeyType::Aes, KeyLength::Len256),
        (SymKeyType::Camellia, KeyLength::Len192),
        (SymKeyType::Sm4, KeyLength::Len128),
        (SymKeyType::DesEde, KeyLength::Len192),
    ] {
        let key_spec = SymKeySpec::new(key_type, key_length);
        let key = key(&factory, KeyType::Symmetric(key_spec));
        for (mode, padding) in [
            (CipherMode::Cbc, Padding::Pkcs7),
            (CipherMode::Cbc, Padding::Iso7816d4),
            (CipherMode::Ctr, Padding::None),
            (CipherMode::Ofb, Padding::None),
        ] {
            let spec = SymCipherSpec::new(key_spec, mode, padding);
            let mut engine = factory.block_cipher(spec).unwrap();
            let iv = engine.init(true, &key, None).unwrap().unwrap();
            let ciphertext = engine.process(message).unwrap();
            assert_ne!(&ciphertext[..16], &message[..16]);

            engine.init(false, &key, Some(&iv)).unwrap();
            assert_eq!(engine.process(&ciphertext).unwrap(), message, "{spec} round trip failed");
        }
    }
}

#[test]
fn test_unpadded_cbc_rejects_unaligned_tail() {
    let factory = factory();
    let key_spec = SymKeySpec::aes(KeyLength::Len128);
    let spec = SymCipherSpec::new(key_spec, CipherMode::Cbc, Padding::None);
    let mut engine = factory.block_cipher(spec).unwrap();
    engine.init(true, &key(&factory, KeyType::Symmetric(key_spec)), None).unwrap();
    assert!(matches!(engine.process(&[0u8; 20]), Err(LoomError::DataLength(_))));
}

#[test]
fn test_stream_ciphers_round_trip() {
    let factory = factory();
    for key_type in [StreamKeyType::ChaCha20, StreamKeyType::XSalsa20, StreamKeyType::Hc256, StreamKeyType::Rabbit] {
        let key = key(&factory, KeyType::Stream(key_type));
        let mut engine = factory.stream_cipher(StreamCipherSpec::stream(key_type)).unwrap();
        let iv = engine.init(true, &key, None).unwrap().unwrap();
        assert_eq!(iv.len(), key_type.iv_len());
        let ciphertext = engine.process(b"a stream of bytes").unwrap();
        engine.init(false, &key, Some(&iv)).unwrap();
        assert_eq!(engine.process(&ciphertext).unwrap(), b"a stream of bytes");
    }
}

#[test]
fn test_stream_aead_detects_tampering() {
    let factory = factory();
    let key = key(&factory, KeyType::Stream(StreamKeyType::XChaCha20));
    let mut engine = factory.stream_aead(StreamCipherSpec::aead(StreamKeyType::XChaCha20)).unwrap();
    let nonce = engine.init(true, &key, None).unwrap().unwrap();
    let mut sealed = engine.process(b"authenticated").unwrap();
    assert_eq!(sealed.len(), b"authenticated".len() + 16);

    sealed[0] ^= 1;
    engine.init(false, &key, Some(&nonce)).unwrap();
    assert!(matches!(engine.process(&sealed), Err(LoomError::Authentication(_))));
}

#[test]
fn test_key_type_mismatch() {
    let factory = factory();
    let spec = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Cbc, Padding::Pkcs7);
    let wrong = key(&factory, KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len256)));
    let mut engine = factory.block_cipher(spec).unwrap();
    assert!(matches!(engine.init(true, &wrong, None), Err(LoomError::InvalidKey(_))));
}

// ============================================================================
// Key wrap
// ============================================================================

#[test]
fn test_wrap_keys_and_private_keys() {
    let factory = factory();
    let kek = key(&factory, KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len256)));
    let wrapper = factory.key_wrapper(&kek).unwrap();

    let hmac_type = KeyType::Mac(MacSpec::Hmac(DigestType::Sha256));
    let secret = key(&factory, hmac_type);
    let wrapped = wrapper.wrap_key(&secret).unwrap();
    assert_eq!(wrapper.unwrap_key(&wrapped, hmac_type).unwrap().as_bytes(), secret.as_bytes());

    let generator = factory.key_pair_generator(AsymKeySpec::Ed25519).unwrap();
    let pair = generator.generate_key_pair().unwrap();
    let wrapped = wrapper.wrap_private_key(&generator, &pair).unwrap();
    let public_der = generator.encode_public(&pair).unwrap();
    let restored = wrapper.unwrap_key_pair(&generator, &public_der, &wrapped).unwrap();
    assert!(restored.matches(&pair));
    assert!(restored.has_private());

    let mut tampered = wrapped;
    tampered[3] ^= 0x80;
    assert!(wrapper.unwrap_key_pair(&generator, &public_der, &tampered).is_err());
}

// ============================================================================
// MACs
// ============================================================================

#[test]
fn test_macs_verify() {
    let factory = factory();
    let aes = SymKeySpec::aes(KeyLength::Len128);
    for spec in [
        MacSpec::Hmac(DigestType::Sha3_256),
        MacSpec::Cmac(SymKeySpec::new(SymKeyType::Aria, KeyLength::Len256)),
        MacSpec::Blake2s,
        MacSpec::Poly1305,
    ] {
        let key = key(&factory, KeyType::Mac(spec));
        let mut engine = factory.mac(spec).unwrap();
        engine.init(&key, None).unwrap();
        let tag = engine.compute(b"message").unwrap();
        assert_eq!(tag.len(), spec.mac_len());

        engine.init(&key, None).unwrap();
        assert!(engine.verify(b"message", &tag).unwrap(), "{spec} rejected its own tag");
        engine.init(&key, None).unwrap();
        assert!(!engine.verify(b"massage", &tag).unwrap());
    }

    let gmac = MacSpec::Gmac(aes);
    let key = key(&factory, KeyType::Mac(gmac));
    let mut engine = factory.mac(gmac).unwrap();
    assert!(matches!(engine.init(&key, None), Err(LoomError::InvalidParameter(_))));
    engine.init(&key, Some(&[7u8; 12])).unwrap();
    assert_eq!(engine.compute(b"message").unwrap().len(), 16);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_mac_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..512), split in 0usize..512) {
        let factory = factory();
        let spec = MacSpec::Hmac(DigestType::Sha256);
        let key = key(&factory, KeyType::Mac(spec));
        let mut engine = factory.mac(spec).unwrap();

        engine.init(&key, None).unwrap();
        let whole = engine.compute(&data).unwrap();

        let (head, tail) = data.split_at(split.min(data.len()));
        engine.init(&key, None).unwrap();
        engine.update(head).unwrap();
        engine.update(tail).unwrap();
        prop_assert_eq!(whole, engine.finish().unwrap());
    }

    #[test]
    fn prop_cbc_round_trip(data in prop::collection::vec(any::<u8>(), 0..300)) {
        let factory = factory();
        let key_spec = SymKeySpec::new(SymKeyType::Twofish, KeyLength::Len256);
        let key = key(&factory, KeyType::Symmetric(key_spec));
        let mut engine = factory.block_cipher(SymCipherSpec::new(key_spec, CipherMode::Cbc, Padding::Pkcs7)).unwrap();
        let iv = engine.init(true, &key, None).unwrap().unwrap();
        let ciphertext = engine.process(&data).unwrap();
        prop_assert_eq!(ciphertext.len() % 16, 0);
        engine.init(false, &key, Some(&iv)).unwrap();
        prop_assert_eq!(engine.process(&ciphertext).unwrap(), data);
    }
}
