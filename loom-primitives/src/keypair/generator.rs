//! Key-pair generation and encoding for one [`AsymKeySpec`].

use super::{encoding, ffc, pq, x448_public, KeyPair, PrivateKey, PublicKey};
use super::{DhDomain, DhPrivateKey, EcPrivateKey};
use crate::rand::SecureRandom;
use crate::spec::{AsymKeySpec, EcCurve};
use crate::xmss::{XmssParams, XmssPrivateKey};
use dsa::Components;
use loom_prelude::prelude::{LoomError, Result};
use rsa::RsaPrivateKey;
use std::sync::OnceLock;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Generates, encodes and decodes key pairs of a single spec.
///
/// DSA and Diffie-Hellman generators create their finite-field domain on
/// first use and reuse it for every later pair, so all pairs from one
/// generator can agree with each other. Domain generation is slow; the
/// factory caches generators per spec for that reason.
#[derive(Debug, Clone)]
pub struct KeyPairGenerator {
    spec: AsymKeySpec,
    random: SecureRandom,
    domain: OnceLock<Components>,
}

impl KeyPairGenerator {
    /// Create a generator for `spec`.
    #[must_use]
    pub fn new(spec: AsymKeySpec, random: SecureRandom) -> Self {
        Self { spec, random, domain: OnceLock::new() }
    }

    /// Spec of every pair this generator produces or accepts.
    #[must_use]
    pub fn spec(&self) -> AsymKeySpec {
        self.spec
    }

    fn components(&self) -> Result<&Components> {
        match self.spec {
            AsymKeySpec::Dsa(params) | AsymKeySpec::Dh(params) => Ok(self.domain.get_or_init(|| {
                debug!(spec = %self.spec, "generating finite-field domain");
                ffc::generate_domain(params, &self.random)
            })),
            other => Err(LoomError::unsupported(format!("{other} has no finite-field domain"))),
        }
    }

    /// Generate a fresh key pair.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for a spec that names no real
    /// combination, plus failures of the underlying generator.
    #[instrument(level = "debug", skip(self), fields(spec = %self.spec))]
    pub fn generate_key_pair(&self) -> Result<KeyPair> {
        if !self.spec.is_consistent() {
            return Err(LoomError::unsupported(self.spec));
        }
        let mut rng = self.random.clone();
        let (public, private) = match self.spec {
            AsymKeySpec::Rsa(modulus) => {
                let private = RsaPrivateKey::new(&mut rng, modulus.bits())?;
                (PublicKey::Rsa(private.to_public_key()), PrivateKey::Rsa(private))
            }
            AsymKeySpec::Dsa(_) => {
                let private = dsa::SigningKey::generate(&mut rng, self.components()?.clone());
                (PublicKey::Dsa(private.verifying_key().clone()), PrivateKey::Dsa(private))
            }
            AsymKeySpec::Dh(_) => {
                let domain = DhDomain::from_components(self.components()?);
                let private = DhPrivateKey::generate(&domain, &self.random);
                (PublicKey::Dh(private.public_key()), PrivateKey::Dh(private))
            }
            AsymKeySpec::Ec(curve) => {
                let private = EcPrivateKey::generate(curve, &self.random);
                (PublicKey::Ec(private.public_key()?), PrivateKey::Ec(private))
            }
            AsymKeySpec::Sm2 => {
                let private = EcPrivateKey::generate(EcCurve::Sm2p256v1, &self.random);
                (PublicKey::Ec(private.public_key()?), PrivateKey::Ec(private))
            }
            AsymKeySpec::Ed25519 => {
                let private = ed25519_dalek::SigningKey::generate(&mut rng);
                (PublicKey::Ed25519(private.verifying_key()), PrivateKey::Ed25519(private))
            }
            AsymKeySpec::X25519 => {
                let private = x25519_dalek::StaticSecret::random_from_rng(&mut rng);
                (PublicKey::X25519(x25519_dalek::PublicKey::from(&private)), PrivateKey::X25519(private))
            }
            AsymKeySpec::X448 => {
                let private = Zeroizing::new(self.random.array::<56>());
                let public = x448_public(&private)
                    .ok_or_else(|| LoomError::InvalidKey("X448 secret rejected".to_string()))?;
                (PublicKey::X448(public), PrivateKey::X448(private))
            }
            AsymKeySpec::McEliece(_)
            | AsymKeySpec::MlKem(_)
            | AsymKeySpec::MlDsa(_)
            | AsymKeySpec::FnDsa(_)
            | AsymKeySpec::SlhDsa(_) => {
                let (public, private) = pq::generate(self.spec, &self.random)?;
                (PublicKey::Encoded(public), PrivateKey::Encoded(private))
            }
            AsymKeySpec::Xmss(..) | AsymKeySpec::XmssMt(..) => {
                let private = XmssPrivateKey::generate(XmssParams::from_spec(self.spec)?, &self.random);
                (PublicKey::Xmss(private.public_key().clone()), PrivateKey::Xmss(private))
            }
        };
        Ok(KeyPair { spec: self.spec, public, private: Some(private) })
    }

    fn check_spec(&self, found: AsymKeySpec) -> Result<()> {
        if found == self.spec {
            Ok(())
        } else {
            Err(LoomError::InvalidKey(format!("expected a {} key, found {found}", self.spec)))
        }
    }

    fn check_pair(&self, pair: &KeyPair) -> Result<()> {
        if pair.spec() == self.spec {
            Ok(())
        } else {
            Err(LoomError::InvalidKey(format!(
                "{} generator cannot encode a {} key pair",
                self.spec,
                pair.spec()
            )))
        }
    }

    /// PKCS#8 encoding of the pair's private key.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a pair of another spec or a
    /// public-only pair.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec))]
    pub fn encode_private(&self, pair: &KeyPair) -> Result<Zeroizing<Vec<u8>>> {
        self.check_pair(pair)?;
        let private = pair.require_private("PKCS#8 encoding")?;
        encoding::encode_private(self.spec, private)
    }

    /// SubjectPublicKeyInfo encoding of the pair's public key.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a pair of another spec.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec))]
    pub fn encode_public(&self, pair: &KeyPair) -> Result<Vec<u8>> {
        self.check_pair(pair)?;
        encoding::encode_public(self.spec, pair.public_key())
    }

    /// Rebuild a full pair from its two encodings.
    ///
    /// # Errors
    /// [`LoomError::Parse`] for malformed structures,
    /// [`LoomError::InvalidKey`] for keys of another spec and
    /// [`LoomError::KeyMismatch`] when the private key does not belong to
    /// the public key.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec, public_len = public_der.len()))]
    pub fn decode_key_pair(&self, public_der: &[u8], private_der: &[u8]) -> Result<KeyPair> {
        let (public_spec, public) = encoding::decode_public(public_der)?;
        self.check_spec(public_spec)?;
        let (private_spec, private) = encoding::decode_private(private_der)?;
        self.check_spec(private_spec)?;
        KeyPair::assemble(self.spec, public, Some(private), &self.random)
    }

    /// Rebuild a public-only pair.
    ///
    /// # Errors
    /// [`LoomError::Parse`] for a malformed structure and
    /// [`LoomError::InvalidKey`] for a key of another spec.
    #[instrument(level = "debug", skip_all, fields(spec = %self.spec, public_len = public_der.len()))]
    pub fn decode_public_only(&self, public_der: &[u8]) -> Result<KeyPair> {
        let (public_spec, public) = encoding::decode_public(public_der)?;
        self.check_spec(public_spec)?;
        KeyPair::assemble(self.spec, public, None, &self.random)
    }
}
