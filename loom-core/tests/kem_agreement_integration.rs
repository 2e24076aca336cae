//! Key encapsulation and key agreement through the factory, ending in
//! symmetric keys that actually encrypt.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

use loom_core::primitives::cipher::{AeadCipher, Cipher};
use loom_core::primitives::keys::KeyType;
use loom_core::primitives::spec::{
    AgreementSpec, AgreementType, AsymKeySpec, CipherMode, DigestType, EcCurve, KdfType, KeyLength, McElieceParams,
    MlKemParams, Padding, RsaModulus, SymCipherSpec, SymKeySpec,
};
use loom_core::{CryptoFactory, FactoryConfig, LoomError};

fn factory() -> CryptoFactory {
    CryptoFactory::new(FactoryConfig::for_development()).unwrap()
}

fn aes_gcm(key_length: KeyLength) -> SymCipherSpec {
    SymCipherSpec::new(SymKeySpec::aes(key_length), CipherMode::Gcm, Padding::None)
}

// ============================================================================
// KEM
// ============================================================================

#[test]
fn test_rsa_kem_2048_sha256_many_trials() {
    let factory = factory();
    let recipient = factory.generate_key_pair(AsymKeySpec::Rsa(RsaModulus::Mod2048)).unwrap();
    for _ in 0..100 {
        let sender = factory.kem_sender(&recipient, DigestType::Sha256).unwrap();
        let receiver = factory.kem_receiver(&recipient, DigestType::Sha256, sender.ciphertext()).unwrap();
        assert_eq!(sender.secret(), receiver.secret());
        assert_eq!(sender.init_vector(), receiver.init_vector());
        assert_eq!(sender.secret().len(), 32);
    }
}

#[test]
fn test_kem_families_agree() {
    let factory = factory();
    for spec in [
        AsymKeySpec::Ec(EcCurve::Secp256r1),
        AsymKeySpec::Sm2,
        AsymKeySpec::X25519,
        AsymKeySpec::X448,
        AsymKeySpec::MlKem(MlKemParams::MlKem512),
        AsymKeySpec::McEliece(McElieceParams::Cm348864f),
    ] {
        let recipient = factory.generate_key_pair(spec).unwrap();
        let sender = factory.kem_sender(&recipient, DigestType::Sha384).unwrap();
        let receiver = factory.kem_receiver(&recipient, DigestType::Sha384, sender.ciphertext()).unwrap();
        assert_eq!(sender.secret(), receiver.secret(), "{spec} secrets differ");
        assert_eq!(sender.secret().len(), 48);
    }
}

#[test]
fn test_kem_derived_key_encrypts() {
    let factory = factory();
    let recipient = factory.generate_key_pair(AsymKeySpec::MlKem(MlKemParams::MlKem1024)).unwrap();
    let key_generator = factory.key_generator(KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len256))).unwrap();

    let sender = factory.kem_sender(&recipient, DigestType::Sha512).unwrap();
    let sender_key = sender.derive_key(&key_generator).unwrap();
    let receiver = factory.kem_receiver(&recipient, DigestType::Sha512, sender.ciphertext()).unwrap();
    let receiver_key = receiver.derive_key(&key_generator).unwrap();
    assert_eq!(sender_key.as_bytes(), receiver_key.as_bytes());

    let mut cipher = factory.aead_cipher(aes_gcm(KeyLength::Len256)).unwrap();
    let nonce = cipher.init(true, &sender_key, None).unwrap().unwrap();
    let ciphertext = cipher.process(b"encapsulated").unwrap();
    cipher.init(false, &receiver_key, Some(&nonce)).unwrap();
    assert_eq!(cipher.process(&ciphertext).unwrap(), b"encapsulated");
}

#[test]
fn test_kem_rejects_garbage_ciphertext() {
    let factory = factory();
    let recipient = factory.generate_key_pair(AsymKeySpec::X25519).unwrap();
    let err = factory.kem_receiver(&recipient, DigestType::Sha256, &[0u8; 5]).unwrap_err();
    assert!(err.is_parse());
}

// ============================================================================
// Agreement
// ============================================================================

#[test]
fn test_x25519_basic_agreement() {
    let factory = factory();
    let spec = AgreementSpec::new(AsymKeySpec::X25519, AgreementType::Basic, KdfType::HkdfSha256);
    let alice = factory.generate_key_pair(AsymKeySpec::X25519).unwrap();
    let bob = factory.generate_key_pair(AsymKeySpec::X25519).unwrap();

    let mut initiator = factory.agreement(spec).unwrap();
    let mut responder = factory.agreement(spec).unwrap();
    let message = initiator.initiate(Some(&alice), &bob).unwrap();
    assert!(initiator.is_complete());
    assert!(responder.accept(Some(&alice.public_only()), &bob, &message).unwrap().is_none());
    assert_eq!(initiator.secret().unwrap(), responder.secret().unwrap());
}

#[test]
fn test_unified_agreement_keys_aead() {
    let factory = factory();
    let key_spec = AsymKeySpec::Ec(EcCurve::Secp384r1);
    let spec = AgreementSpec::new(key_spec, AgreementType::Unified, KdfType::HkdfSha512);
    let alice = factory.generate_key_pair(key_spec).unwrap();
    let bob = factory.generate_key_pair(key_spec).unwrap();

    let mut initiator = factory.agreement(spec).unwrap();
    let mut responder = factory.agreement(spec).unwrap();
    let message = initiator.initiate(Some(&alice), &bob.public_only()).unwrap();
    assert!(!initiator.is_complete());
    let response = responder.accept(Some(&alice.public_only()), &bob, &message).unwrap().unwrap();
    initiator.confirm(&response).unwrap();

    let key_generator = factory.key_generator(KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len128))).unwrap();
    let alice_key = initiator.derive_key(&key_generator).unwrap();
    let bob_key = responder.derive_key(&key_generator).unwrap();
    assert_eq!(alice_key.as_bytes(), bob_key.as_bytes());

    let mut sealer = factory.aead_cipher(aes_gcm(KeyLength::Len128)).unwrap();
    let nonce = sealer.init(true, &alice_key, None).unwrap().unwrap();
    sealer.update_aad(b"header").unwrap();
    let sealed = sealer.process(b"agreed and sealed").unwrap();

    let mut opener = factory.aead_cipher(aes_gcm(KeyLength::Len128)).unwrap();
    opener.init(false, &bob_key, Some(&nonce)).unwrap();
    opener.update_aad(b"header").unwrap();
    assert_eq!(opener.process(&sealed).unwrap(), b"agreed and sealed");

    opener.init(false, &bob_key, Some(&nonce)).unwrap();
    opener.update_aad(b"tampered").unwrap();
    assert!(matches!(opener.process(&sealed), Err(LoomError::Authentication(_))));
}

#[test]
fn test_anonymous_and_ephemeral_agreements() {
    let factory = factory();

    let anonymous = AgreementSpec::new(AsymKeySpec::X448, AgreementType::Anonymous, KdfType::HkdfSha256);
    let bob = factory.generate_key_pair(AsymKeySpec::X448).unwrap();
    let mut initiator = factory.agreement(anonymous).unwrap();
    let mut responder = factory.agreement(anonymous).unwrap();
    let message = initiator.initiate(None, &bob.public_only()).unwrap();
    responder.accept(None, &bob, &message).unwrap();
    assert_eq!(initiator.secret().unwrap(), responder.secret().unwrap());

    let key_spec = AsymKeySpec::MlKem(MlKemParams::MlKem768);
    let ephemeral = AgreementSpec::new(key_spec, AgreementType::Ephemeral, KdfType::None);
    let bob = factory.generate_key_pair(key_spec).unwrap();
    let mut initiator = factory.agreement(ephemeral).unwrap();
    let mut responder = factory.agreement(ephemeral).unwrap();
    let message = initiator.initiate(None, &bob.public_only()).unwrap();
    let response = responder.accept(None, &bob, &message).unwrap().unwrap();
    initiator.confirm(&response).unwrap();
    assert_eq!(initiator.secret().unwrap(), responder.secret().unwrap());
}

#[test]
fn test_agreement_rejects_mismatched_keys() {
    let factory = factory();
    let spec = AgreementSpec::new(AsymKeySpec::X25519, AgreementType::Basic, KdfType::None);
    let alice = factory.generate_key_pair(AsymKeySpec::X25519).unwrap();
    let other = factory.generate_key_pair(AsymKeySpec::X448).unwrap();
    let mut engine = factory.agreement(spec).unwrap();
    assert!(matches!(engine.initiate(Some(&alice), &other), Err(LoomError::KeyMismatch(_))));
    assert!(matches!(engine.secret(), Err(LoomError::State(_))));
}
