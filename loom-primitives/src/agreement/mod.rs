#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Key Agreement
//!
//! [`AgreementEngine`] runs one [`AgreementSpec`] between an initiator and a
//! responder. Every first message starts with a random 16-byte init vector
//! that salts the optional KDF and [`AgreementEngine::derive_key`].
//!
//! | Protocol | Initiator message | Response | Raw secret |
//! |----------|-------------------|----------|------------|
//! | Anonymous | KEM ciphertext to the responder's static key | none | KEM secret |
//! | Basic | init vector | none | `Z(A, B)` |
//! | Unified | init vector, ephemeral `eA` | ephemeral `eB` | `Z(eA, eB) \|\| Z(A, B)` |
//! | Ephemeral | init vector, ephemeral ML-KEM key | KEM ciphertext | KEM secret |
//!
//! Both parties must hold key pairs of the engine's key spec. A pair of any
//! other spec fails with [`LoomError::KeyMismatch`] before anything is
//! computed.

use crate::kdf;
use crate::kem::{KemReceiver, KemSender};
use crate::keypair::{exchange, pq, KeyPair, PrivateKey, PublicKey};
use crate::keys::{Key, KeyGenerator};
use crate::rand::SecureRandom;
use crate::spec::{AgreementSpec, AgreementType, DigestType, KdfType};
use loom_prelude::prelude::domains::AGREEMENT_KDF;
use loom_prelude::prelude::{LoomError, Result, INIT_VECTOR_LEN};
use std::fmt;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

type InitVector = [u8; INIT_VECTOR_LEN];

/// Initiator state between the first message and the response.
enum Pending {
    Unified { init_vector: InitVector, static_secret: Zeroizing<Vec<u8>>, ephemeral: PrivateKey, peer: PublicKey },
    Ephemeral { init_vector: InitVector, private: Zeroizing<Vec<u8>> },
}

enum Phase {
    Idle,
    AwaitingResponse(Box<Pending>),
    Complete { init_vector: InitVector, secret: Zeroizing<Vec<u8>> },
}

/// One side of a key agreement.
pub struct AgreementEngine {
    spec: AgreementSpec,
    random: SecureRandom,
    phase: Phase,
}

impl AgreementEngine {
    /// Create an engine for `spec`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] when the key family cannot run
    /// the protocol.
    pub fn new(spec: AgreementSpec, random: SecureRandom) -> Result<Self> {
        if !spec.is_consistent() {
            return Err(LoomError::unsupported(spec));
        }
        Ok(Self { spec, random, phase: Phase::Idle })
    }

    /// The spec this engine runs.
    #[must_use]
    pub fn spec(&self) -> AgreementSpec {
        self.spec
    }

    /// Whether the protocol expects a response to the first message.
    #[must_use]
    pub fn is_two_pass(&self) -> bool {
        self.spec.agreement_type.is_two_pass()
    }

    fn check_party(&self, role: &str, pair: &KeyPair) -> Result<()> {
        if pair.spec() == self.spec.key_spec {
            Ok(())
        } else {
            Err(LoomError::KeyMismatch(format!(
                "{role} holds a {} key pair; {} needs {}",
                pair.spec(),
                self.spec.agreement_type.name(),
                self.spec.key_spec
            )))
        }
    }

    fn identity<'a>(&self, role: &str, pair: Option<&'a KeyPair>) -> Result<&'a KeyPair> {
        pair.ok_or_else(|| {
            LoomError::InvalidKey(format!("{} agreement needs the {role}'s static key pair", self.spec.agreement_type.name()))
        })
    }

    /// Start the agreement towards `target`.
    ///
    /// `source` is the initiator's static pair; Basic and Unified need it,
    /// Anonymous and Ephemeral ignore it. Returns the message for the
    /// responder. One-pass protocols complete here.
    ///
    /// # Errors
    /// [`LoomError::KeyMismatch`] when either pair has another spec,
    /// [`LoomError::InvalidKey`] when a needed private key is missing.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec))]
    pub fn initiate(&mut self, source: Option<&KeyPair>, target: &KeyPair) -> Result<Vec<u8>> {
        self.check_party("target", target)?;
        if let Some(source) = source {
            self.check_party("source", source)?;
        }
        self.phase = Phase::Idle;
        let init_vector = self.random.array::<INIT_VECTOR_LEN>();
        let mut message = init_vector.to_vec();

        match self.spec.agreement_type {
            AgreementType::Anonymous => {
                let sender = KemSender::new(target, kem_digest(self.spec.kdf), &self.random)?;
                let init_vector = *sender.init_vector();
                self.complete(init_vector, sender.secret())?;
                return Ok(sender.ciphertext().to_vec());
            }
            AgreementType::Basic => {
                let source = self.identity("source", source)?;
                let raw = exchange::agree(source.require_private("agreement")?, target.public_key())?;
                self.complete(init_vector, &raw)?;
            }
            AgreementType::Unified => {
                let source = self.identity("source", source)?;
                let static_secret = exchange::agree(source.require_private("agreement")?, target.public_key())?;
                let (ephemeral, public) = exchange::ephemeral(target.public_key(), &self.random)?;
                message.extend(exchange::public_bytes(&public)?);
                self.phase = Phase::AwaitingResponse(Box::new(Pending::Unified {
                    init_vector,
                    static_secret,
                    ephemeral,
                    peer: target.public_key().clone(),
                }));
            }
            AgreementType::Ephemeral => {
                let (public, private) = pq::generate(self.spec.key_spec, &self.random)?;
                message.extend(public);
                self.phase = Phase::AwaitingResponse(Box::new(Pending::Ephemeral { init_vector, private }));
            }
        }
        debug!(len = message.len(), "agreement initiated");
        Ok(message)
    }

    /// Answer an initiator's `message` as the holder of `own`.
    ///
    /// `source` is the initiator's static pair (public half suffices);
    /// Basic and Unified need it. Returns the response for two-pass
    /// protocols. The responder's secret is available afterwards.
    ///
    /// # Errors
    /// [`LoomError::KeyMismatch`] when either pair has another spec,
    /// [`LoomError::Parse`] for a malformed message.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec, len = message.len()))]
    pub fn accept(&mut self, source: Option<&KeyPair>, own: &KeyPair, message: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_party("responder", own)?;
        if let Some(source) = source {
            self.check_party("source", source)?;
        }
        self.phase = Phase::Idle;

        let (init_vector, payload) = match self.spec.agreement_type {
            AgreementType::Anonymous => {
                let receiver = KemReceiver::new(own, kem_digest(self.spec.kdf), message, &self.random)?;
                let init_vector = *receiver.init_vector();
                self.complete(init_vector, receiver.secret())?;
                return Ok(None);
            }
            _ => split_message(message)?,
        };
        match self.spec.agreement_type {
            AgreementType::Anonymous => Ok(None),
            AgreementType::Basic => {
                if !payload.is_empty() {
                    return Err(LoomError::Parse("Basic agreement message carries trailing bytes".to_string()));
                }
                let source = self.identity("source", source)?;
                let raw = exchange::agree(own.require_private("agreement")?, source.public_key())?;
                self.complete(init_vector, &raw)?;
                Ok(None)
            }
            AgreementType::Unified => {
                let source = self.identity("source", source)?;
                let private = own.require_private("agreement")?;
                let their_ephemeral = exchange::public_from_bytes(own.public_key(), payload)?;
                let static_secret = exchange::agree(private, source.public_key())?;
                let (ephemeral, public) = exchange::ephemeral(own.public_key(), &self.random)?;
                let ephemeral_secret = exchange::agree(&ephemeral, &their_ephemeral)?;
                self.complete(init_vector, &unified(&ephemeral_secret, &static_secret))?;
                Ok(Some(exchange::public_bytes(&public)?))
            }
            AgreementType::Ephemeral => {
                let (secret, ciphertext) = pq::encapsulate(self.spec.key_spec, payload, &self.random)?;
                self.complete(init_vector, &secret)?;
                Ok(Some(ciphertext))
            }
        }
    }

    /// Finish a two-pass agreement with the responder's `response`.
    ///
    /// # Errors
    /// [`LoomError::State`] unless a two-pass agreement is awaiting its
    /// response, [`LoomError::Parse`] for a malformed response.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec, len = response.len()))]
    pub fn confirm(&mut self, response: &[u8]) -> Result<()> {
        let Phase::AwaitingResponse(pending) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Err(LoomError::State(format!("{} confirm called without a pending agreement", self.spec)));
        };
        match *pending {
            Pending::Unified { init_vector, static_secret, ephemeral, peer } => {
                let their_ephemeral = exchange::public_from_bytes(&peer, response)?;
                let ephemeral_secret = exchange::agree(&ephemeral, &their_ephemeral)?;
                self.complete(init_vector, &unified(&ephemeral_secret, &static_secret))
            }
            Pending::Ephemeral { init_vector, private } => {
                let secret = pq::decapsulate(self.spec.key_spec, &private, response)?;
                self.complete(init_vector, &secret)
            }
        }
    }

    fn complete(&mut self, init_vector: InitVector, raw: &[u8]) -> Result<()> {
        let secret = match self.spec.kdf {
            KdfType::None => Zeroizing::new(raw.to_vec()),
            KdfType::HkdfSha256 => expand(DigestType::Sha256, raw, &init_vector)?,
            KdfType::HkdfSha512 => expand(DigestType::Sha512, raw, &init_vector)?,
        };
        debug!(secret_len = secret.len(), "agreement complete");
        self.phase = Phase::Complete { init_vector, secret };
        Ok(())
    }

    /// Whether the agreed secret is available.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Complete { .. })
    }

    /// The agreed secret.
    ///
    /// # Errors
    /// [`LoomError::State`] before the agreement completes.
    pub fn secret(&self) -> Result<&[u8]> {
        match &self.phase {
            Phase::Complete { secret, .. } => Ok(secret),
            _ => Err(LoomError::State(format!("{} secret requested before completion", self.spec))),
        }
    }

    /// Typed key from the agreed secret, salted with the init vector.
    ///
    /// # Errors
    /// [`LoomError::State`] before the agreement completes.
    pub fn derive_key(&self, generator: &KeyGenerator) -> Result<Key> {
        match &self.phase {
            Phase::Complete { init_vector, secret } => generator.generate_key_from_secret(secret, init_vector),
            _ => Err(LoomError::State(format!("{} key requested before completion", self.spec))),
        }
    }
}

impl fmt::Debug for AgreementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Idle => "idle",
            Phase::AwaitingResponse(_) => "awaiting-response",
            Phase::Complete { .. } => "complete",
        };
        f.debug_struct("AgreementEngine").field("spec", &self.spec).field("phase", &phase).finish()
    }
}

/// Digest for the KEM step of an Anonymous agreement.
fn kem_digest(kdf: KdfType) -> DigestType {
    match kdf {
        KdfType::HkdfSha512 => DigestType::Sha512,
        KdfType::None | KdfType::HkdfSha256 => DigestType::Sha256,
    }
}

fn expand(digest: DigestType, raw: &[u8], init_vector: &InitVector) -> Result<Zeroizing<Vec<u8>>> {
    kdf::hkdf(digest, raw, Some(init_vector), AGREEMENT_KDF, digest.output_len())
}

fn unified(ephemeral: &[u8], fixed: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut raw = Zeroizing::new(Vec::with_capacity(ephemeral.len() + fixed.len()));
    raw.extend_from_slice(ephemeral);
    raw.extend_from_slice(fixed);
    raw
}

fn split_message(message: &[u8]) -> Result<(InitVector, &[u8])> {
    if message.len() < INIT_VECTOR_LEN {
        return Err(LoomError::Parse("agreement message is shorter than its init vector".to_string()));
    }
    let (head, payload) = message.split_at(INIT_VECTOR_LEN);
    let init_vector =
        InitVector::try_from(head).map_err(|_| LoomError::Parse("agreement init vector".to_string()))?;
    Ok((init_vector, payload))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::keypair::KeyPairGenerator;
    use crate::keys::KeyType;
    use crate::spec::{AsymKeySpec, EcCurve, FfcParams, KeyLength, MlKemParams, RsaModulus, StreamKeyType};

    fn random() -> SecureRandom {
        SecureRandom::new().unwrap()
    }

    fn engine(key_spec: AsymKeySpec, agreement_type: AgreementType, kdf: KdfType) -> AgreementEngine {
        AgreementEngine::new(AgreementSpec::new(key_spec, agreement_type, kdf), random()).unwrap()
    }

    /// Run the protocol between `a` and `b` and return both secrets.
    fn run(key_spec: AsymKeySpec, agreement_type: AgreementType, kdf: KdfType, a: &KeyPair, b: &KeyPair) -> (Vec<u8>, Vec<u8>) {
        let mut initiator = engine(key_spec, agreement_type, kdf);
        let mut responder = engine(key_spec, agreement_type, kdf);
        let message = initiator.initiate(Some(a), b).unwrap();
        let response = responder.accept(Some(&a.public_only()), b, &message).unwrap();
        assert_eq!(response.is_some(), agreement_type.is_two_pass());
        if let Some(response) = response {
            assert!(!initiator.is_complete());
            initiator.confirm(&response).unwrap();
        }
        (initiator.secret().unwrap().to_vec(), responder.secret().unwrap().to_vec())
    }

    #[test]
    fn test_x25519_basic_symmetry() {
        let generator = KeyPairGenerator::new(AsymKeySpec::X25519, random());
        let (a, b) = (generator.generate_key_pair().unwrap(), generator.generate_key_pair().unwrap());
        let (ours, theirs) = run(AsymKeySpec::X25519, AgreementType::Basic, KdfType::None, &a, &b);
        assert_eq!(ours, theirs);
        assert_eq!(ours.len(), 32);
    }

    #[test]
    fn test_basic_and_unified_families() {
        for key_spec in [
            AsymKeySpec::Ec(EcCurve::Secp256r1),
            AsymKeySpec::Ec(EcCurve::Secp256k1),
            AsymKeySpec::Sm2,
            AsymKeySpec::X25519,
            AsymKeySpec::X448,
        ] {
            let generator = KeyPairGenerator::new(key_spec, random());
            let (a, b) = (generator.generate_key_pair().unwrap(), generator.generate_key_pair().unwrap());
            for agreement_type in [AgreementType::Basic, AgreementType::Unified] {
                for kdf in [KdfType::None, KdfType::HkdfSha256, KdfType::HkdfSha512] {
                    let (ours, theirs) = run(key_spec, agreement_type, kdf, &a, &b);
                    assert_eq!(ours, theirs, "{key_spec} {agreement_type:?} {kdf:?}");
                }
            }
        }
    }

    #[test]
    fn test_dh_unified() {
        let key_spec = AsymKeySpec::Dh(FfcParams::L2048N224);
        let generator = KeyPairGenerator::new(key_spec, random());
        let (a, b) = (generator.generate_key_pair().unwrap(), generator.generate_key_pair().unwrap());
        let (ours, theirs) = run(key_spec, AgreementType::Unified, KdfType::HkdfSha256, &a, &b);
        assert_eq!(ours, theirs);
        assert_eq!(ours.len(), 32);
    }

    #[test]
    fn test_unified_sessions_differ() {
        let generator = KeyPairGenerator::new(AsymKeySpec::X448, random());
        let (a, b) = (generator.generate_key_pair().unwrap(), generator.generate_key_pair().unwrap());
        let first = run(AsymKeySpec::X448, AgreementType::Unified, KdfType::None, &a, &b).0;
        let second = run(AsymKeySpec::X448, AgreementType::Unified, KdfType::None, &a, &b).0;
        assert_ne!(first, second);
        assert_eq!(first.len(), 112);
    }

    #[test]
    fn test_anonymous_over_kem_families() {
        for key_spec in [
            AsymKeySpec::Rsa(RsaModulus::Mod1024),
            AsymKeySpec::X25519,
            AsymKeySpec::MlKem(MlKemParams::MlKem512),
        ] {
            let b = KeyPairGenerator::new(key_spec, random()).generate_key_pair().unwrap();
            let mut initiator = engine(key_spec, AgreementType::Anonymous, KdfType::HkdfSha512);
            let mut responder = engine(key_spec, AgreementType::Anonymous, KdfType::HkdfSha512);
            let message = initiator.initiate(None, &b.public_only()).unwrap();
            assert!(responder.accept(None, &b, &message).unwrap().is_none());
            assert_eq!(initiator.secret().unwrap(), responder.secret().unwrap(), "{key_spec}");
        }
    }

    #[test]
    fn test_ml_kem_ephemeral() {
        let key_spec = AsymKeySpec::MlKem(MlKemParams::MlKem1024);
        let b = KeyPairGenerator::new(key_spec, random()).generate_key_pair().unwrap();
        let mut initiator = engine(key_spec, AgreementType::Ephemeral, KdfType::HkdfSha256);
        let mut responder = engine(key_spec, AgreementType::Ephemeral, KdfType::HkdfSha256);
        let message = initiator.initiate(None, &b.public_only()).unwrap();
        let response = responder.accept(None, &b, &message).unwrap().unwrap();
        initiator.confirm(&response).unwrap();
        assert_eq!(initiator.secret().unwrap(), responder.secret().unwrap());

        let generator = KeyGenerator::new(KeyType::Stream(StreamKeyType::ChaCha20), random());
        assert_eq!(initiator.derive_key(&generator).unwrap(), responder.derive_key(&generator).unwrap());
    }

    #[test]
    fn test_mismatched_families_fail_first() {
        let x25519 = KeyPairGenerator::new(AsymKeySpec::X25519, random()).generate_key_pair().unwrap();
        let x448 = KeyPairGenerator::new(AsymKeySpec::X448, random()).generate_key_pair().unwrap();
        let mut initiator = engine(AsymKeySpec::X25519, AgreementType::Basic, KdfType::None);
        assert!(matches!(initiator.initiate(Some(&x25519), &x448), Err(LoomError::KeyMismatch(_))));
        assert!(matches!(initiator.initiate(Some(&x448), &x25519), Err(LoomError::KeyMismatch(_))));
        assert!(!initiator.is_complete());

        let p256 = KeyPairGenerator::new(AsymKeySpec::Ec(EcCurve::Secp256r1), random()).generate_key_pair().unwrap();
        let p384 = KeyPairGenerator::new(AsymKeySpec::Ec(EcCurve::Secp384r1), random()).generate_key_pair().unwrap();
        let mut initiator = engine(AsymKeySpec::Ec(EcCurve::Secp256r1), AgreementType::Unified, KdfType::None);
        assert!(matches!(initiator.initiate(Some(&p256), &p384), Err(LoomError::KeyMismatch(_))));
    }

    #[test]
    fn test_phase_errors() {
        let generator = KeyPairGenerator::new(AsymKeySpec::X25519, random());
        let (a, b) = (generator.generate_key_pair().unwrap(), generator.generate_key_pair().unwrap());
        let mut initiator = engine(AsymKeySpec::X25519, AgreementType::Unified, KdfType::None);
        assert!(matches!(initiator.confirm(&[0u8; 32]), Err(LoomError::State(_))));
        assert!(matches!(initiator.secret(), Err(LoomError::State(_))));

        let message = initiator.initiate(Some(&a), &b).unwrap();
        assert!(matches!(initiator.secret(), Err(LoomError::State(_))));
        assert!(initiator.confirm(&[0u8; 31]).unwrap_err().is_parse());

        let mut responder = engine(AsymKeySpec::X25519, AgreementType::Unified, KdfType::None);
        assert!(responder.accept(Some(&a), &b, &message[..10]).unwrap_err().is_parse());
        assert!(matches!(responder.accept(None, &b, &message), Err(LoomError::InvalidKey(_))));
        assert!(matches!(
            responder.accept(Some(&a), &b.public_only(), &message),
            Err(LoomError::InvalidKey(_))
        ));

        let generator = KeyGenerator::new(
            KeyType::Symmetric(crate::spec::SymKeySpec::aes(KeyLength::Len128)),
            random(),
        );
        assert!(matches!(responder.derive_key(&generator), Err(LoomError::State(_))));
    }

    #[test]
    fn test_unsupported_protocols() {
        let rejected = AgreementSpec::new(AsymKeySpec::Rsa(RsaModulus::Mod2048), AgreementType::Unified, KdfType::None);
        assert!(matches!(AgreementEngine::new(rejected, random()), Err(LoomError::UnsupportedAlgorithm(_))));
    }
}
