//! Finite-field key material shared by DSA and Diffie-Hellman.
//!
//! Both families draw their domain `(p, q, g)` from FIPS 186 generation in
//! the `dsa` crate. DH keeps `p`, `g` and the private value length, which is
//! what the PKCS#3 parameter block carries.

use crate::rand::SecureRandom;
use crate::spec::FfcParams;
use dsa::{Components, KeySize};
use loom_prelude::prelude::{LoomError, Result};
use num_bigint_dig::{BigUint, RandBigInt};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

pub(crate) fn key_size(params: FfcParams) -> KeySize {
    match params {
        FfcParams::L2048N224 => KeySize::DSA_2048_224,
        FfcParams::L2048N256 => KeySize::DSA_2048_256,
        FfcParams::L3072N256 => KeySize::DSA_3072_256,
    }
}

/// Generate a fresh `(p, q, g)` domain. Slow: prime search dominates.
pub(crate) fn generate_domain(params: FfcParams, random: &SecureRandom) -> Components {
    let mut rng = random.clone();
    Components::generate(&mut rng, key_size(params))
}

/// Diffie-Hellman domain as carried by a PKCS#3 `DHParameter`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DhDomain {
    p: BigUint,
    g: BigUint,
    private_bits: usize,
}

impl DhDomain {
    /// Build and sanity check a domain.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] when `g` is outside `[2, p - 2]` or
    /// the private value length is zero or wider than `p`.
    pub fn new(p: BigUint, g: BigUint, private_bits: usize) -> Result<Self> {
        let two = BigUint::from(2u32);
        if p.bits() < 512 || g < two || g > &p - &two {
            return Err(LoomError::InvalidKey("DH domain out of range".to_string()));
        }
        if private_bits == 0 || private_bits > p.bits() {
            return Err(LoomError::InvalidKey("DH private value length out of range".to_string()));
        }
        Ok(Self { p, g, private_bits })
    }

    pub(crate) fn from_components(components: &Components) -> Self {
        Self {
            p: components.p().clone(),
            g: components.g().clone(),
            private_bits: components.q().bits(),
        }
    }

    /// Prime modulus.
    #[must_use]
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Generator.
    #[must_use]
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Bit length of private values.
    #[must_use]
    pub fn private_bits(&self) -> usize {
        self.private_bits
    }

    /// Length of `p` in bytes; agreed secrets are padded to it.
    #[must_use]
    pub fn modulus_len(&self) -> usize {
        (self.p.bits() + 7) / 8
    }

    fn in_public_range(&self, y: &BigUint) -> bool {
        let two = BigUint::from(2u32);
        *y >= two && *y <= &self.p - &two
    }
}

/// DH public value `y = g^x mod p`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DhPublicKey {
    domain: DhDomain,
    y: BigUint,
}

impl DhPublicKey {
    /// Attach a public value to a domain.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] when `y` is outside `[2, p - 2]`.
    pub fn new(domain: DhDomain, y: BigUint) -> Result<Self> {
        if !domain.in_public_range(&y) {
            return Err(LoomError::InvalidKey("DH public value out of range".to_string()));
        }
        Ok(Self { domain, y })
    }

    /// Domain parameters.
    #[must_use]
    pub fn domain(&self) -> &DhDomain {
        &self.domain
    }

    /// Public value.
    #[must_use]
    pub fn y(&self) -> &BigUint {
        &self.y
    }
}

/// DH private value.
#[derive(Clone)]
pub struct DhPrivateKey {
    domain: DhDomain,
    x: BigUint,
}

impl DhPrivateKey {
    pub(crate) fn new(domain: DhDomain, x: BigUint) -> Result<Self> {
        if x < BigUint::from(2u32) || x >= *domain.p() {
            return Err(LoomError::InvalidKey("DH private value out of range".to_string()));
        }
        Ok(Self { domain, x })
    }

    pub(crate) fn generate(domain: &DhDomain, random: &SecureRandom) -> Self {
        let mut rng = random.clone();
        let low = BigUint::from(2u32);
        let high = BigUint::from(1u32) << domain.private_bits();
        let high = if high >= *domain.p() { domain.p() - &low } else { high };
        let x = rng.gen_biguint_range(&low, &high);
        Self { domain: domain.clone(), x }
    }

    /// Domain parameters.
    #[must_use]
    pub fn domain(&self) -> &DhDomain {
        &self.domain
    }

    pub(crate) fn x(&self) -> &BigUint {
        &self.x
    }

    /// `g^x mod p`.
    #[must_use]
    pub fn public_key(&self) -> DhPublicKey {
        let y = self.domain.g.modpow(&self.x, &self.domain.p);
        DhPublicKey { domain: self.domain.clone(), y }
    }

    /// Raw agreement `peer^x mod p`, left-padded to the modulus length.
    ///
    /// # Errors
    /// Returns [`LoomError::KeyMismatch`] for a peer on another domain and
    /// [`LoomError::InvalidKey`] when the result is degenerate.
    pub(crate) fn agree(&self, peer: &DhPublicKey) -> Result<Zeroizing<Vec<u8>>> {
        if peer.domain != self.domain {
            return Err(LoomError::KeyMismatch("DH parties use different domains".to_string()));
        }
        let mut z = peer.y.modpow(&self.x, &self.domain.p);
        let one = BigUint::from(1u32);
        if z <= one || z == &self.domain.p - &one {
            z.zeroize();
            return Err(LoomError::InvalidKey("degenerate DH shared value".to_string()));
        }
        let out = left_pad(&z.to_bytes_be(), self.domain.modulus_len());
        z.zeroize();
        Ok(out)
    }

    pub(crate) fn same_key(&self, other: &Self) -> bool {
        let a = Zeroizing::new(self.x.to_bytes_be());
        let b = Zeroizing::new(other.x.to_bytes_be());
        self.domain == other.domain && bool::from(a.as_slice().ct_eq(b.as_slice()))
    }
}

impl Drop for DhPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl fmt::Debug for DhPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhPrivateKey").field("x", &"[REDACTED]").finish_non_exhaustive()
    }
}

/// Big-endian bytes of `value` left-padded with zeros to `len`.
pub(crate) fn left_pad(value: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len.max(value.len())]);
    let offset = out.len() - value.len();
    out[offset..].copy_from_slice(value);
    out
}

/// Whether a DSA private key belongs to a public key: same domain and
/// `g^x mod p == y`.
pub(crate) fn dsa_pair_valid(public: &dsa::VerifyingKey, private: &dsa::SigningKey) -> bool {
    let components = public.components();
    if components != private.verifying_key().components() {
        return false;
    }
    components.g().modpow(private.x(), components.p()) == *public.y()
}
