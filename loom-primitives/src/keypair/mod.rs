#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Asymmetric Key Pairs
//!
//! [`PublicKey`] and [`PrivateKey`] are closed enums over every supported
//! family. A [`KeyPair`] binds a public key to an optional private key under
//! one [`AsymKeySpec`], and can only be built once the private key has been
//! checked against the public key (`g^x = y` for finite-field keys, point
//! derivation for curves, embedded public material for lattice keys).
//!
//! Identity is per family: RSA compares `(n, e, d)` and ignores the CRT
//! values, curve keys compare points and scalars, post-quantum keys compare
//! their encodings, XMSS keys ignore the signing index.

pub(crate) mod ec;
mod encoding;
pub(crate) mod exchange;
pub(crate) mod ffc;
mod generator;
pub(crate) mod pq;

pub use ec::{EcPrivateKey, EcPublicKey};
pub use ffc::{DhDomain, DhPrivateKey, DhPublicKey};
pub use generator::KeyPairGenerator;

use crate::rand::SecureRandom;
use crate::spec::{AsymKeySpec, AsymKeyType};
use crate::xmss::{XmssPrivateKey, XmssPublicKey};
use loom_prelude::prelude::{LoomError, Result};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Public half of a key pair.
#[derive(Clone, Debug, PartialEq)]
pub enum PublicKey {
    /// RSA modulus and public exponent
    Rsa(RsaPublicKey),
    /// DSA domain and public value
    Dsa(dsa::VerifyingKey),
    /// Diffie-Hellman domain and public value
    Dh(DhPublicKey),
    /// Point on a named curve (EC and SM2)
    Ec(EcPublicKey),
    /// Ed25519 verifying key
    Ed25519(ed25519_dalek::VerifyingKey),
    /// X25519 public key
    X25519(x25519_dalek::PublicKey),
    /// X448 public key
    X448([u8; 56]),
    /// Encoded post-quantum public key (ML-KEM, ML-DSA, SLH-DSA, FN-DSA, McEliece)
    Encoded(Vec<u8>),
    /// XMSS or XMSS^MT root and public seed
    Xmss(XmssPublicKey),
}

/// Private half of a key pair. `Debug` never prints key material.
#[derive(Clone)]
pub enum PrivateKey {
    /// RSA private key with CRT values
    Rsa(RsaPrivateKey),
    /// DSA signing key
    Dsa(dsa::SigningKey),
    /// Diffie-Hellman private value
    Dh(DhPrivateKey),
    /// Scalar on a named curve
    Ec(EcPrivateKey),
    /// Ed25519 signing key
    Ed25519(ed25519_dalek::SigningKey),
    /// X25519 static secret
    X25519(x25519_dalek::StaticSecret),
    /// X448 secret scalar
    X448(Zeroizing<[u8; 56]>),
    /// Encoded post-quantum private key
    Encoded(Zeroizing<Vec<u8>>),
    /// XMSS private key with shared signing state
    Xmss(XmssPrivateKey),
}

impl PrivateKey {
    fn family(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "Rsa",
            Self::Dsa(_) => "Dsa",
            Self::Dh(_) => "Dh",
            Self::Ec(_) => "Ec",
            Self::Ed25519(_) => "Ed25519",
            Self::X25519(_) => "X25519",
            Self::X448(_) => "X448",
            Self::Encoded(_) => "Encoded",
            Self::Xmss(_) => "Xmss",
        }
    }

    /// Family identity of two private keys.
    fn same_key(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Rsa(a), Self::Rsa(b)) => a.n() == b.n() && a.e() == b.e() && a.d() == b.d(),
            (Self::Dsa(a), Self::Dsa(b)) => a.verifying_key() == b.verifying_key() && a.x() == b.x(),
            (Self::Dh(a), Self::Dh(b)) => a.same_key(b),
            (Self::Ec(a), Self::Ec(b)) => a.same_key(b),
            (Self::Ed25519(a), Self::Ed25519(b)) => bool::from(a.to_bytes()[..].ct_eq(&b.to_bytes()[..])),
            (Self::X25519(a), Self::X25519(b)) => bool::from(a.as_bytes()[..].ct_eq(&b.as_bytes()[..])),
            (Self::X448(a), Self::X448(b)) => bool::from(a[..].ct_eq(&b[..])),
            (Self::Encoded(a), Self::Encoded(b)) => bool::from(a.as_slice().ct_eq(b.as_slice())),
            (Self::Xmss(a), Self::Xmss(b)) => a.same_key(b),
            _ => false,
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xmss(key) => key.fmt(f),
            other => f.debug_tuple(other.family()).field(&"[REDACTED]").finish(),
        }
    }
}

/// Whether `private` is the private counterpart of `public` under `spec`.
fn valid_private(spec: AsymKeySpec, public: &PublicKey, private: &PrivateKey, random: &SecureRandom) -> bool {
    match (public, private) {
        // `validate` checks that the primes multiply to n and d·e ≡ 1 mod p−1.
        (PublicKey::Rsa(public), PrivateKey::Rsa(private)) => {
            private.n() == public.n() && private.e() == public.e() && private.validate().is_ok()
        }
        (PublicKey::Dsa(public), PrivateKey::Dsa(private)) => ffc::dsa_pair_valid(public, private),
        (PublicKey::Dh(public), PrivateKey::Dh(private)) => private.public_key() == *public,
        (PublicKey::Ec(public), PrivateKey::Ec(private)) => {
            private.public_key().map_or(false, |derived| derived == *public)
        }
        (PublicKey::Ed25519(public), PrivateKey::Ed25519(private)) => private.verifying_key() == *public,
        (PublicKey::X25519(public), PrivateKey::X25519(private)) => {
            x25519_dalek::PublicKey::from(private) == *public
        }
        (PublicKey::X448(public), PrivateKey::X448(private)) => {
            x448_public(private).map_or(false, |derived| bool::from(derived[..].ct_eq(&public[..])))
        }
        (PublicKey::Encoded(public), PrivateKey::Encoded(private)) => {
            pq::pair_valid(spec, public, private, random)
        }
        (PublicKey::Xmss(public), PrivateKey::Xmss(private)) => private.matches_public(public),
        _ => false,
    }
}

/// X448 public key of a secret scalar.
pub(crate) fn x448_public(secret: &[u8; 56]) -> Option<[u8; 56]> {
    let secret = x448::Secret::from_bytes(secret)?;
    Some(*x448::PublicKey::from(&secret).as_bytes())
}

/// Asymmetric key pair: public key, optional private key, and the spec
/// both were generated under.
#[derive(Clone, Debug)]
pub struct KeyPair {
    spec: AsymKeySpec,
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl KeyPair {
    /// Pair up the halves after checking that they belong together.
    pub(crate) fn assemble(
        spec: AsymKeySpec,
        public: PublicKey,
        private: Option<PrivateKey>,
        random: &SecureRandom,
    ) -> Result<Self> {
        if let Some(private) = &private {
            if !valid_private(spec, &public, private, random) {
                return Err(LoomError::KeyMismatch(format!(
                    "{spec} private key does not belong to the public key"
                )));
            }
        }
        Ok(Self { spec, public, private })
    }

    /// Spec the pair was generated or decoded under.
    #[must_use]
    pub fn spec(&self) -> AsymKeySpec {
        self.spec
    }

    /// Family tag.
    #[must_use]
    pub fn key_type(&self) -> AsymKeyType {
        self.spec.key_type()
    }

    /// Public half.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half, if held.
    #[must_use]
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private.as_ref()
    }

    /// Whether the pair can sign, decapsulate or agree.
    #[must_use]
    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// Copy of the pair without its private key.
    #[must_use]
    pub fn public_only(&self) -> KeyPair {
        Self { spec: self.spec, public: self.public.clone(), private: None }
    }

    /// Whether both pairs hold the same public key under the same spec.
    #[must_use]
    pub fn matches(&self, other: &KeyPair) -> bool {
        self.spec == other.spec && self.public == other.public
    }

    pub(crate) fn require_private(&self, operation: &str) -> Result<&PrivateKey> {
        self.private.as_ref().ok_or_else(|| {
            LoomError::InvalidKey(format!("{operation} needs a private key; {} pair is public-only", self.spec))
        })
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
            && match (&self.private, &other.private) {
                (Some(a), Some(b)) => a.same_key(b),
                (None, None) => true,
                _ => false,
            }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::spec::{EcCurve, RsaModulus};

    #[test]
    fn test_public_only_drops_private_but_matches() {
        let random = SecureRandom::new().unwrap();
        let generator = KeyPairGenerator::new(AsymKeySpec::Ed25519, random);
        let pair = generator.generate_key_pair().unwrap();
        let public = pair.public_only();
        assert!(!public.has_private());
        assert!(public.matches(&pair));
        assert_ne!(public, pair);
        assert!(public.require_private("signing").is_err());
    }

    #[test]
    fn test_cross_curve_private_is_key_mismatch() {
        let random = SecureRandom::new().unwrap();
        let p256 = KeyPairGenerator::new(AsymKeySpec::Ec(EcCurve::Secp256r1), random.clone())
            .generate_key_pair()
            .unwrap();
        let k256 = KeyPairGenerator::new(AsymKeySpec::Ec(EcCurve::Secp256k1), random.clone())
            .generate_key_pair()
            .unwrap();
        let err = KeyPair::assemble(
            p256.spec(),
            p256.public_key().clone(),
            k256.private_key().cloned(),
            &random,
        )
        .unwrap_err();
        assert!(matches!(err, LoomError::KeyMismatch(_)));
    }

    #[test]
    fn test_rsa_identity_ignores_crt_values() {
        let random = SecureRandom::new().unwrap();
        let pair = KeyPairGenerator::new(AsymKeySpec::Rsa(RsaModulus::Mod1024), random.clone())
            .generate_key_pair()
            .unwrap();
        assert!(matches!(pair.private_key(), Some(PrivateKey::Rsa(_))));
        if let Some(PrivateKey::Rsa(private)) = pair.private_key() {
            let mut stripped = private.clone();
            stripped.clear_precomputed();
            let rebuilt = KeyPair::assemble(
                pair.spec(),
                pair.public_key().clone(),
                Some(PrivateKey::Rsa(stripped)),
                &random,
            )
            .unwrap();
            assert_eq!(rebuilt, pair);
        }
    }

    #[test]
    fn test_rsa_private_exponent_must_match() {
        let random = SecureRandom::new().unwrap();
        let pair = KeyPairGenerator::new(AsymKeySpec::Rsa(RsaModulus::Mod1024), random.clone())
            .generate_key_pair()
            .unwrap();
        assert!(matches!(pair.private_key(), Some(PrivateKey::Rsa(_))));
        if let Some(PrivateKey::Rsa(private)) = pair.private_key() {
            let wrong_d = private.d() + rsa::BigUint::from(2u8);
            let forged = RsaPrivateKey::from_components(
                private.n().clone(),
                private.e().clone(),
                wrong_d,
                private.primes().to_vec(),
            )
            .unwrap();
            let err = KeyPair::assemble(pair.spec(), pair.public_key().clone(), Some(PrivateKey::Rsa(forged)), &random)
                .unwrap_err();
            assert!(matches!(err, LoomError::KeyMismatch(_)));
        }
    }

    #[test]
    fn test_private_debug_is_redacted() {
        let random = SecureRandom::new().unwrap();
        let pair = KeyPairGenerator::new(AsymKeySpec::X25519, random).generate_key_pair().unwrap();
        let text = format!("{:?}", pair.private_key().unwrap());
        assert!(text.contains("REDACTED"));
    }
}
