//! The cipherloom factory.
//!
//! [`CryptoFactory`] is the single entry point: it validates a spec against
//! its predicates, builds the engine, and hands every engine a clone of the
//! one [`SecureRandom`] it owns. Key generators come from the
//! [`KeyGeneratorCache`], so equal specs always share one generator.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use crate::cache::KeyGeneratorCache;
use crate::config::FactoryConfig;
use crate::logging::fingerprint;
use loom_prelude::prelude::domains::PAIRWISE_CONSISTENCY;
use loom_prelude::prelude::{LoomError, Result};
use loom_primitives::cipher::{AeadCipherEngine, BlockCipherEngine, KeyWrapper, StreamCipherEngine};
use loom_primitives::hash::DigestEngine;
use loom_primitives::kem::{self, KemReceiver, KemSender};
use loom_primitives::keypair::{KeyPair, KeyPairGenerator};
use loom_primitives::keys::{Key, KeyGenerator, KeyType};
use loom_primitives::mac::MacEngine;
use loom_primitives::rand::SecureRandom;
use loom_primitives::signer::SignatureEngine;
use loom_primitives::spec::{
    AgreementSpec, AsymKeySpec, AsymKeyType, CipherMode, DigestType, MacSpec, SignatureSpec, SignatureType,
    StreamCipherSpec, StreamKeyType, SymCipherSpec, SymKeySpec,
};
use loom_primitives::xmss::XmssIndexRegistry;
use loom_primitives::AgreementEngine;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Signature scheme used to self-test a freshly generated pair, for the
/// families that sign without consuming state.
fn self_test_spec(key_type: AsymKeyType) -> Option<SignatureSpec> {
    match key_type {
        AsymKeyType::Rsa => Some(SignatureSpec::rsa(SignatureType::Pss, DigestType::Sha256)),
        AsymKeyType::Dsa => Some(SignatureSpec::dsa(SignatureType::Dsa, DigestType::Sha256)),
        AsymKeyType::Ec => Some(SignatureSpec::ec(SignatureType::Dsa, DigestType::Sha256)),
        AsymKeyType::Sm2 => Some(SignatureSpec::sm2()),
        AsymKeyType::Ed25519 | AsymKeyType::MlDsa | AsymKeyType::FnDsa | AsymKeyType::SlhDsa => {
            Some(SignatureSpec::native(key_type, None))
        }
        _ => None,
    }
}

/// Entry point for every engine.
///
/// # Examples
/// ```rust,no_run
/// use loom_core::{config::FactoryConfig, factory::CryptoFactory};
/// use loom_primitives::spec::{AsymKeySpec, SignatureSpec};
///
/// let factory = CryptoFactory::new(FactoryConfig::for_production())?;
/// let pair = factory.generate_key_pair(AsymKeySpec::Sm2)?;
/// let mut signer = factory.signer(SignatureSpec::sm2())?;
/// signer.init_for_signing(&pair)?;
/// let signature = signer.sign_message(b"hello")?;
/// signer.init_for_verifying(&pair)?;
/// assert!(signer.verify_message(b"hello", &signature)?);
/// # Ok::<(), loom_prelude::prelude::LoomError>(())
/// ```
#[derive(Debug)]
pub struct CryptoFactory {
    config: FactoryConfig,
    random: SecureRandom,
    cache: KeyGeneratorCache,
    xmss_registry: Option<XmssIndexRegistry>,
}

impl CryptoFactory {
    /// Build a factory.
    ///
    /// # Errors
    /// [`LoomError::InvalidParameter`] for an invalid configuration,
    /// [`LoomError::Random`] when the operating system cannot seed the
    /// random source.
    #[instrument(level = "debug", skip_all, fields(restricted = config.restricted))]
    pub fn new(config: FactoryConfig) -> Result<Self> {
        config.validate()?;
        let random = match config.seed {
            Some(seed) => {
                warn!("factory random source is seeded; output is reproducible");
                SecureRandom::from_seed(seed)
            }
            None => SecureRandom::new()?,
        };
        let xmss_registry = config.xmss_reuse_protection.then(XmssIndexRegistry::new);
        info!(
            restricted = config.restricted,
            pairwise_consistency_check = config.pairwise_consistency_check,
            xmss_reuse_protection = config.xmss_reuse_protection,
            "crypto factory ready"
        );
        Ok(Self { config, random, cache: KeyGeneratorCache::new(), xmss_registry })
    }

    /// Factory with [`FactoryConfig::default`].
    ///
    /// # Errors
    /// Same as [`Self::new`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(FactoryConfig::default())
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Handle to the shared random source.
    #[must_use]
    pub fn random(&self) -> &SecureRandom {
        &self.random
    }

    /// Generator cache.
    #[must_use]
    pub fn cache(&self) -> &KeyGeneratorCache {
        &self.cache
    }

    /// XMSS index registry, present when reuse protection is enabled.
    #[must_use]
    pub fn xmss_registry(&self) -> Option<&XmssIndexRegistry> {
        self.xmss_registry.as_ref()
    }

    // Predicates

    /// Every digest is available.
    #[must_use]
    pub fn supports_digest(&self, _digest: DigestType) -> bool {
        true
    }

    /// Whether a symmetric key spec is allowed.
    #[must_use]
    pub fn supports_sym_key(&self, spec: SymKeySpec) -> bool {
        spec.is_consistent() && self.config.allows_key_bits(spec.key_length.bits())
    }

    /// Whether a block or GCM cipher spec is allowed.
    #[must_use]
    pub fn supports_sym_cipher(&self, spec: SymCipherSpec) -> bool {
        spec.is_consistent() && self.supports_sym_key(spec.key_spec)
    }

    /// Whether a stream key type is allowed.
    #[must_use]
    pub fn supports_stream_key(&self, key_type: StreamKeyType) -> bool {
        self.config.allows_key_bits(key_type.key_len() * 8)
    }

    /// Whether a stream cipher spec is allowed.
    #[must_use]
    pub fn supports_stream_cipher(&self, spec: StreamCipherSpec) -> bool {
        spec.is_consistent() && self.supports_stream_key(spec.key_type)
    }

    /// Whether a MAC spec is allowed. Restricted mode applies to the
    /// cipher a MAC is built on, not to HMAC or BLAKE2 keys.
    #[must_use]
    pub fn supports_mac(&self, spec: MacSpec) -> bool {
        spec.is_consistent()
            && match spec {
                MacSpec::Cmac(key_spec) | MacSpec::Gmac(key_spec) | MacSpec::Poly1305Cipher(key_spec) => {
                    self.supports_sym_key(key_spec)
                }
                MacSpec::Hmac(_) | MacSpec::Poly1305 | MacSpec::Blake2b | MacSpec::Blake2s => true,
            }
    }

    /// Whether keys of `key_type` may be generated.
    #[must_use]
    pub fn supports_key_type(&self, key_type: KeyType) -> bool {
        match key_type {
            KeyType::Symmetric(spec) => self.supports_sym_key(spec),
            KeyType::Stream(key_type) => self.supports_stream_key(key_type),
            KeyType::Mac(spec) => self.supports_mac(spec),
        }
    }

    /// Whether a key-pair spec names a real combination.
    #[must_use]
    pub fn supports_key_pair(&self, spec: AsymKeySpec) -> bool {
        spec.is_consistent()
    }

    /// Whether a signature spec is available.
    #[must_use]
    pub fn supports_signature(&self, spec: SignatureSpec) -> bool {
        spec.is_consistent()
    }

    /// Whether a key family can receive a KEM.
    #[must_use]
    pub fn supports_kem(&self, key_type: AsymKeyType) -> bool {
        kem::supports(key_type)
    }

    /// Whether an agreement spec is available.
    #[must_use]
    pub fn supports_agreement(&self, spec: AgreementSpec) -> bool {
        spec.is_consistent()
    }

    fn require(&self, allowed: bool, what: impl std::fmt::Display) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            debug!(%what, "spec rejected");
            Err(LoomError::unsupported(what))
        }
    }

    // Symmetric engines

    /// Digest engine.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the digest is not available.
    pub fn digest(&self, digest: DigestType) -> Result<DigestEngine> {
        self.require(self.supports_digest(digest), digest)?;
        Ok(DigestEngine::new(digest))
    }

    /// MAC engine.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the spec is rejected.
    pub fn mac(&self, spec: MacSpec) -> Result<MacEngine> {
        self.require(self.supports_mac(spec), spec)?;
        MacEngine::new(spec)
    }

    /// Block cipher engine (any mode but GCM).
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the spec is rejected or names
    /// an AEAD mode.
    pub fn block_cipher(&self, spec: SymCipherSpec) -> Result<BlockCipherEngine> {
        self.require(self.supports_sym_cipher(spec) && !spec.mode.is_aead(), spec)?;
        BlockCipherEngine::new(spec, self.random.clone())
    }

    /// GCM engine for a block cipher spec.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] unless the spec is an allowed GCM
    /// spec.
    pub fn aead_cipher(&self, spec: SymCipherSpec) -> Result<AeadCipherEngine> {
        self.require(self.supports_sym_cipher(spec) && spec.mode == CipherMode::Gcm, spec)?;
        AeadCipherEngine::gcm(spec, self.random.clone())
    }

    /// Plain stream cipher engine.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the spec is rejected or asks
    /// for the authenticated variant.
    pub fn stream_cipher(&self, spec: StreamCipherSpec) -> Result<StreamCipherEngine> {
        self.require(self.supports_stream_cipher(spec) && !spec.aead, spec)?;
        StreamCipherEngine::new(spec, self.random.clone())
    }

    /// Poly1305-authenticated stream cipher engine.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] unless the spec is an allowed
    /// AEAD stream spec.
    pub fn stream_aead(&self, spec: StreamCipherSpec) -> Result<AeadCipherEngine> {
        self.require(self.supports_stream_cipher(spec) && spec.aead, spec)?;
        AeadCipherEngine::stream(spec, self.random.clone())
    }

    /// Key wrapper bound to `kek`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the KEK's type is rejected,
    /// [`LoomError::InvalidKey`] unless it is an AES key.
    pub fn key_wrapper(&self, kek: &Key) -> Result<KeyWrapper> {
        self.require(self.supports_key_type(kek.key_type()), kek.key_type())?;
        KeyWrapper::new(kek)
    }

    // Generators

    /// Cached key generator for `key_type`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the key type is rejected.
    pub fn key_generator(&self, key_type: KeyType) -> Result<Arc<KeyGenerator>> {
        self.require(self.supports_key_type(key_type), key_type)?;
        Ok(self.cache.key_generator(key_type, || KeyGenerator::new(key_type, self.random.clone())))
    }

    /// Cached key-pair generator for `spec`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the spec is rejected.
    pub fn key_pair_generator(&self, spec: AsymKeySpec) -> Result<Arc<KeyPairGenerator>> {
        self.require(self.supports_key_pair(spec), spec)?;
        Ok(self.cache.key_pair_generator(spec, || KeyPairGenerator::new(spec, self.random.clone())))
    }

    /// Generate a key pair through the cached generator, self-testing it
    /// when the pairwise consistency check is enabled.
    ///
    /// # Errors
    /// [`LoomError::KeyMismatch`] when the self-test fails, plus the
    /// generator's own failures.
    #[instrument(level = "debug", skip(self), fields(spec = %spec))]
    pub fn generate_key_pair(&self, spec: AsymKeySpec) -> Result<KeyPair> {
        let pair = self.key_pair_generator(spec)?.generate_key_pair()?;
        if self.config.pairwise_consistency_check {
            self.pairwise_consistency_check(&pair)?;
        }
        Ok(pair)
    }

    fn pairwise_consistency_check(&self, pair: &KeyPair) -> Result<()> {
        let Some(spec) = self_test_spec(pair.key_type()) else {
            return Ok(());
        };
        let mut engine = SignatureEngine::new(spec, self.random.clone())?;
        engine.init_for_signing(pair)?;
        let signature = engine.sign_message(PAIRWISE_CONSISTENCY)?;
        engine.init_for_verifying(pair)?;
        if engine.verify_message(PAIRWISE_CONSISTENCY, &signature)? {
            debug!(spec = %pair.spec(), "pairwise consistency check passed");
            Ok(())
        } else {
            warn!(spec = %pair.spec(), "pairwise consistency check failed");
            Err(LoomError::KeyMismatch(format!("{} pairwise consistency check failed", pair.spec())))
        }
    }

    // Asymmetric engines

    /// Signature engine. XMSS signers share the factory's index registry
    /// when reuse protection is enabled.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the spec is rejected.
    pub fn signer(&self, spec: SignatureSpec) -> Result<SignatureEngine> {
        self.require(self.supports_signature(spec), spec)?;
        let engine = SignatureEngine::new(spec, self.random.clone())?;
        Ok(match &self.xmss_registry {
            Some(registry) => engine.with_xmss_registry(registry.clone()),
            None => engine,
        })
    }

    /// Encapsulate a secret to `recipient`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for a family without a KEM.
    pub fn kem_sender(&self, recipient: &KeyPair, digest: DigestType) -> Result<KemSender> {
        self.require(self.supports_kem(recipient.key_type()), recipient.spec())?;
        let sender = KemSender::new(recipient, digest, &self.random)?;
        debug!(spec = %recipient.spec(), ciphertext = %fingerprint(sender.ciphertext()), "secret encapsulated");
        Ok(sender)
    }

    /// Recover a secret encapsulated to `recipient`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for a family without a KEM,
    /// [`LoomError::Parse`] for a malformed ciphertext.
    pub fn kem_receiver(&self, recipient: &KeyPair, digest: DigestType, ciphertext: &[u8]) -> Result<KemReceiver> {
        self.require(self.supports_kem(recipient.key_type()), recipient.spec())?;
        debug!(spec = %recipient.spec(), ciphertext = %fingerprint(ciphertext), "decapsulating");
        KemReceiver::new(recipient, digest, ciphertext, &self.random)
    }

    /// Key agreement engine.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] if the spec is rejected.
    pub fn agreement(&self, spec: AgreementSpec) -> Result<AgreementEngine> {
        self.require(self.supports_agreement(spec), spec)?;
        AgreementEngine::new(spec, self.random.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use loom_primitives::spec::{KeyLength, Padding, SymKeyType};

    fn factory(config: FactoryConfig) -> CryptoFactory {
        CryptoFactory::new(config).unwrap()
    }

    #[test]
    fn test_restricted_predicates() {
        let open = factory(FactoryConfig::for_development());
        let restricted = factory(FactoryConfig::for_development().with_restricted(true));
        let aes256 = SymKeySpec::aes(KeyLength::Len256);
        let aes128 = SymKeySpec::aes(KeyLength::Len128);

        assert!(open.supports_sym_key(aes256));
        assert!(!restricted.supports_sym_key(aes256));
        assert!(restricted.supports_sym_key(aes128));
        assert!(!restricted.supports_stream_key(StreamKeyType::ChaCha20));
        assert!(restricted.supports_stream_key(StreamKeyType::Rabbit));
        assert!(!restricted.supports_mac(MacSpec::Cmac(aes256)));
        assert!(restricted.supports_mac(MacSpec::Hmac(DigestType::Sha512)));

        let cbc = SymCipherSpec::new(aes256, CipherMode::Cbc, Padding::Pkcs7);
        assert!(matches!(restricted.block_cipher(cbc), Err(LoomError::UnsupportedAlgorithm(_))));
        assert!(open.block_cipher(cbc).is_ok());
        assert!(restricted.key_generator(KeyType::Symmetric(aes256)).is_err());
    }

    #[test]
    fn test_engine_kind_checks() {
        let factory = factory(FactoryConfig::for_development());
        let gcm = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Gcm, Padding::None);
        assert!(factory.block_cipher(gcm).is_err());
        assert!(factory.aead_cipher(gcm).is_ok());
        assert!(factory.stream_cipher(StreamCipherSpec::aead(StreamKeyType::ChaCha20)).is_err());
        assert!(factory.stream_aead(StreamCipherSpec::aead(StreamKeyType::ChaCha20)).is_ok());
        assert!(factory.stream_aead(StreamCipherSpec::aead(StreamKeyType::Hc256)).is_err());
    }

    #[test]
    fn test_generators_are_cached() {
        let factory = factory(FactoryConfig::for_development());
        let key_type = KeyType::Mac(MacSpec::Poly1305);
        let a = factory.key_generator(key_type).unwrap();
        let b = factory.key_generator(key_type).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = factory.key_pair_generator(AsymKeySpec::X25519).unwrap();
        let d = factory.key_pair_generator(AsymKeySpec::X25519).unwrap();
        assert!(Arc::ptr_eq(&c, &d));
        assert_eq!(factory.cache().len(), 2);
    }

    #[test]
    fn test_self_test_runs_for_signing_families() {
        let factory = factory(FactoryConfig::for_production());
        for spec in [AsymKeySpec::Ed25519, AsymKeySpec::Sm2, AsymKeySpec::X25519] {
            let pair = factory.generate_key_pair(spec).unwrap();
            assert!(pair.has_private());
        }
        assert!(self_test_spec(AsymKeyType::XmssMt).is_none());
        assert!(self_test_spec(AsymKeyType::MlKem).is_none());
    }

    #[test]
    fn test_registry_follows_config() {
        assert!(factory(FactoryConfig::new()).xmss_registry().is_some());
        assert!(factory(FactoryConfig::new().with_xmss_reuse_protection(false)).xmss_registry().is_none());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_kem_events_share_ciphertext_fingerprint() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let factory = factory(FactoryConfig::for_development());
        let recipient = factory.generate_key_pair(AsymKeySpec::X25519).unwrap();
        let expected = tracing::subscriber::with_default(subscriber, || {
            let sender = factory.kem_sender(&recipient, DigestType::Sha256).unwrap();
            factory.kem_receiver(&recipient, DigestType::Sha256, sender.ciphertext()).unwrap();
            fingerprint(sender.ciphertext()).to_string()
        });

        let text = String::from_utf8(log.0.lock().clone()).unwrap();
        assert_eq!(text.matches(&format!("ciphertext={expected}")).count(), 2, "{text}");
    }

    #[test]
    fn test_key_wrapper_needs_aes() {
        let factory = factory(FactoryConfig::for_development());
        let camellia = SymKeySpec::new(SymKeyType::Camellia, KeyLength::Len128);
        let kek = factory.key_generator(KeyType::Symmetric(camellia)).unwrap().generate_key();
        assert!(matches!(factory.key_wrapper(&kek), Err(LoomError::InvalidKey(_))));
    }
}
