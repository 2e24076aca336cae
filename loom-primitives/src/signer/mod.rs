#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Signature Engine
//!
//! [`SignatureEngine`] runs every [`SignatureSpec`] through one
//! digest-then-sign protocol: `init_for_signing` or `init_for_verifying`
//! binds a key pair and a direction, `update` feeds the message, and `sign`
//! or `verify` consumes what was fed so far. The engine stays bound to its
//! key afterwards, ready for the next message.
//!
//! | Family | Schemes |
//! |--------|---------|
//! | RSA | PSS, PKCS#1 v1.5, X9.31, ISO 9796-2 |
//! | DSA | DSA, deterministic DSA (RFC 6979) |
//! | EC | ECDSA, deterministic ECDSA, Nyberg-Rueppel |
//! | SM2 | SM2 with its internal SM3 hash |
//! | Ed25519, ML-DSA, FN-DSA, SLH-DSA, XMSS | native, optionally over a pre-hash |
//!
//! `verify` answers `false` for a signature that does not match. Only a
//! DER signature whose structure is broken is reported as
//! [`LoomError::Parse`]; raw signatures of the wrong size simply fail.

mod dlog;
mod rsassa;

use crate::hash::DigestEngine;
use crate::keypair::{KeyPair, PrivateKey, PublicKey};
use crate::rand::SecureRandom;
use crate::spec::{DigestType, SignatureSpec, SignatureType};
use crate::xmss::XmssIndexRegistry;
use crate::keypair::pq;
use loom_prelude::prelude::{LoomError, Result};
use rsa::traits::PublicKeyParts;
use signature::Signer as _;
use std::fmt;
use tracing::{debug, instrument};

/// Message accumulated since the last sign or verify.
struct Accumulator {
    digest: Option<DigestEngine>,
    /// Leading message bytes, up to `limit` (everything when `None`)
    buffer: Vec<u8>,
    limit: Option<usize>,
    total: usize,
}

impl Accumulator {
    fn new(digest: Option<DigestType>, limit: Option<usize>) -> Self {
        Self { digest: digest.map(DigestEngine::new), buffer: Vec::new(), limit, total: 0 }
    }

    fn update(&mut self, data: &[u8]) {
        if let Some(digest) = &mut self.digest {
            digest.update(data);
        }
        let room = self.limit.map_or(data.len(), |limit| limit.saturating_sub(self.buffer.len()));
        self.buffer.extend_from_slice(data.get(..room.min(data.len())).unwrap_or_default());
        self.total += data.len();
    }

    fn take(&mut self) -> Prepared {
        let prepared = Prepared {
            hash: self.digest.as_mut().map(DigestEngine::finish),
            message: std::mem::take(&mut self.buffer),
            total: self.total,
        };
        self.total = 0;
        prepared
    }
}

struct Prepared {
    hash: Option<Vec<u8>>,
    message: Vec<u8>,
    total: usize,
}

impl Prepared {
    /// What the scheme signs: the digest when there is one, else the message.
    fn payload(&self) -> &[u8] {
        self.hash.as_deref().unwrap_or(&self.message)
    }
}

enum Mode {
    Uninitialized,
    Signing(KeyPair),
    Verifying(KeyPair),
}

/// Signer and verifier for one [`SignatureSpec`].
pub struct SignatureEngine {
    spec: SignatureSpec,
    random: SecureRandom,
    registry: Option<XmssIndexRegistry>,
    mode: Mode,
    input: Accumulator,
}

impl SignatureEngine {
    /// Create an engine for `spec`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] when the family does not support
    /// the scheme or digest choice.
    pub fn new(spec: SignatureSpec, random: SecureRandom) -> Result<Self> {
        if !spec.is_consistent() {
            return Err(LoomError::unsupported(spec));
        }
        Ok(Self {
            spec,
            random,
            registry: None,
            mode: Mode::Uninitialized,
            input: Accumulator::new(spec.digest, Some(0)),
        })
    }

    /// Record every XMSS signature in `registry` so a stale copy of a
    /// private key cannot reuse a one-time index.
    #[must_use]
    pub fn with_xmss_registry(mut self, registry: XmssIndexRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The spec this engine runs.
    #[must_use]
    pub fn spec(&self) -> SignatureSpec {
        self.spec
    }

    fn check_family(&self, pair: &KeyPair) -> Result<()> {
        if pair.key_type() == self.spec.key_type {
            Ok(())
        } else {
            Err(LoomError::InvalidKey(format!(
                "{} engine cannot use a {} key pair",
                self.spec,
                pair.spec()
            )))
        }
    }

    /// Message bytes the scheme needs besides the digest.
    fn buffer_limit(&self, pair: &KeyPair) -> Option<usize> {
        match (self.spec.signature_type, pair.public_key(), self.spec.digest) {
            (SignatureType::Iso9796d2, PublicKey::Rsa(key), Some(digest)) => {
                Some(rsassa::iso9796_capacity(key.size(), digest.output_len()))
            }
            (SignatureType::Sm2 | SignatureType::Native, _, None) => None,
            _ => Some(0),
        }
    }

    fn bind(&mut self, mode: Mode) {
        if let Mode::Signing(pair) | Mode::Verifying(pair) = &mode {
            self.input = Accumulator::new(self.spec.digest, self.buffer_limit(pair));
        }
        self.mode = mode;
    }

    /// Bind a key pair for signing. Discards any accumulated message.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a pair of another family or one
    /// without a private key.
    #[instrument(level = "debug", skip(self, pair), fields(spec = %self.spec, key = %pair.spec()))]
    pub fn init_for_signing(&mut self, pair: &KeyPair) -> Result<()> {
        self.check_family(pair)?;
        pair.require_private("signing")?;
        self.bind(Mode::Signing(pair.clone()));
        Ok(())
    }

    /// Bind a key pair for verification. Discards any accumulated message.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a pair of another family.
    #[instrument(level = "debug", skip(self, pair), fields(spec = %self.spec, key = %pair.spec()))]
    pub fn init_for_verifying(&mut self, pair: &KeyPair) -> Result<()> {
        self.check_family(pair)?;
        self.bind(Mode::Verifying(pair.public_only()));
        Ok(())
    }

    /// Feed message bytes.
    ///
    /// # Errors
    /// [`LoomError::State`] before either init.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        if matches!(self.mode, Mode::Uninitialized) {
            return Err(LoomError::State(format!("{} update called before init", self.spec)));
        }
        self.input.update(data);
        Ok(())
    }

    /// Sign everything fed since the last sign.
    ///
    /// # Errors
    /// [`LoomError::State`] unless initialised for signing,
    /// [`LoomError::KeyExhausted`] for a used-up XMSS key, plus failures of
    /// the primitive.
    #[instrument(level = "debug", skip(self), fields(spec = %self.spec))]
    pub fn sign(&mut self) -> Result<Vec<u8>> {
        let Mode::Signing(pair) = &self.mode else {
            return Err(LoomError::State(format!("{} engine is not initialised for signing", self.spec)));
        };
        let input = self.input.take();
        let signature = sign_with(self.spec, pair, &input, &self.random, self.registry.as_ref())?;
        debug!(len = signature.len(), "signed");
        Ok(signature)
    }

    /// Verify `signature` over everything fed since the last verify.
    ///
    /// # Errors
    /// [`LoomError::State`] unless initialised for verifying,
    /// [`LoomError::Parse`] for a DER signature with a broken structure.
    #[instrument(level = "debug", skip(self, signature), fields(spec = %self.spec, len = signature.len()))]
    pub fn verify(&mut self, signature: &[u8]) -> Result<bool> {
        let Mode::Verifying(pair) = &self.mode else {
            return Err(LoomError::State(format!("{} engine is not initialised for verifying", self.spec)));
        };
        let input = self.input.take();
        let valid = verify_with(self.spec, pair, &input, signature)?;
        debug!(valid, "verified");
        Ok(valid)
    }

    /// Feed `message` and sign it.
    ///
    /// # Errors
    /// Same as [`Self::sign`].
    pub fn sign_message(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        self.update(message)?;
        self.sign()
    }

    /// Feed `message` and verify `signature` over it.
    ///
    /// # Errors
    /// Same as [`Self::verify`].
    pub fn verify_message(&mut self, message: &[u8], signature: &[u8]) -> Result<bool> {
        self.update(message)?;
        self.verify(signature)
    }
}

impl fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.mode {
            Mode::Uninitialized => "uninitialized",
            Mode::Signing(_) => "signing",
            Mode::Verifying(_) => "verifying",
        };
        f.debug_struct("SignatureEngine").field("spec", &self.spec).field("phase", &phase).finish()
    }
}

fn digest_of(spec: SignatureSpec) -> Result<DigestType> {
    spec.digest.ok_or_else(|| LoomError::unsupported(format!("{spec} without a digest")))
}

fn hash_of(input: &Prepared) -> Result<&[u8]> {
    input
        .hash
        .as_deref()
        .ok_or_else(|| LoomError::State("digest-then-sign scheme without a digest".to_string()))
}

fn wrong_key(spec: SignatureSpec, pair: &KeyPair) -> LoomError {
    LoomError::InvalidKey(format!("{spec} cannot use a {} key", pair.spec()))
}

fn sign_with(
    spec: SignatureSpec,
    pair: &KeyPair,
    input: &Prepared,
    random: &SecureRandom,
    registry: Option<&XmssIndexRegistry>,
) -> Result<Vec<u8>> {
    let private = pair.require_private("signing")?;
    let deterministic = spec.signature_type == SignatureType::DetDsa;
    match (spec.signature_type, private) {
        (SignatureType::Pss, PrivateKey::Rsa(key)) => {
            rsassa::sign_pss(key, digest_of(spec)?, hash_of(input)?, random)
        }
        (SignatureType::Pkcs1v15, PrivateKey::Rsa(key)) => {
            rsassa::sign_pkcs1v15(key, digest_of(spec)?, hash_of(input)?, random)
        }
        (SignatureType::X931, PrivateKey::Rsa(key)) => {
            rsassa::sign_x931(key, digest_of(spec)?, hash_of(input)?, random)
        }
        (SignatureType::Iso9796d2, PrivateKey::Rsa(key)) => rsassa::sign_iso9796(
            key,
            digest_of(spec)?,
            hash_of(input)?,
            &input.message,
            input.total,
            random,
        ),
        (SignatureType::Dsa | SignatureType::DetDsa, PrivateKey::Dsa(key)) => {
            dlog::sign_dsa(key, digest_of(spec)?, hash_of(input)?, deterministic, random)
        }
        (SignatureType::Dsa | SignatureType::DetDsa, PrivateKey::Ec(key)) => {
            dlog::sign_ecdsa(key, hash_of(input)?, deterministic, random)
        }
        (SignatureType::Nr, PrivateKey::Ec(key)) => dlog::sign_nr(key, hash_of(input)?, random),
        (SignatureType::Sm2, PrivateKey::Ec(key)) => dlog::sign_sm2(key, &input.message),
        (SignatureType::Native, PrivateKey::Ed25519(key)) => Ok(key.sign(input.payload()).to_bytes().to_vec()),
        (SignatureType::Native, PrivateKey::Encoded(key)) => pq::sign(pair.spec(), key, input.payload(), random),
        (SignatureType::Native, PrivateKey::Xmss(key)) => key.sign(input.payload(), registry),
        _ => Err(wrong_key(spec, pair)),
    }
}

fn verify_with(spec: SignatureSpec, pair: &KeyPair, input: &Prepared, signature: &[u8]) -> Result<bool> {
    match (spec.signature_type, pair.public_key()) {
        (SignatureType::Pss, PublicKey::Rsa(key)) => {
            Ok(rsassa::verify_pss(key, digest_of(spec)?, hash_of(input)?, signature))
        }
        (SignatureType::Pkcs1v15, PublicKey::Rsa(key)) => {
            rsassa::verify_pkcs1v15(key, digest_of(spec)?, hash_of(input)?, signature)
        }
        (SignatureType::X931, PublicKey::Rsa(key)) => {
            rsassa::verify_x931(key, digest_of(spec)?, hash_of(input)?, signature)
        }
        (SignatureType::Iso9796d2, PublicKey::Rsa(key)) => rsassa::verify_iso9796(
            key,
            digest_of(spec)?,
            hash_of(input)?,
            &input.message,
            input.total,
            signature,
        ),
        (SignatureType::Dsa | SignatureType::DetDsa, PublicKey::Dsa(key)) => {
            dlog::verify_dsa(key, hash_of(input)?, signature)
        }
        (SignatureType::Dsa | SignatureType::DetDsa, PublicKey::Ec(key)) => {
            dlog::verify_ecdsa(key, hash_of(input)?, signature)
        }
        (SignatureType::Nr, PublicKey::Ec(key)) => dlog::verify_nr(key, hash_of(input)?, signature),
        (SignatureType::Sm2, PublicKey::Ec(key)) => dlog::verify_sm2(key, &input.message, signature),
        (SignatureType::Native, PublicKey::Ed25519(key)) => {
            Ok(ed25519_dalek::Signature::from_slice(signature)
                .map_or(false, |signature| key.verify_strict(input.payload(), &signature).is_ok()))
        }
        (SignatureType::Native, PublicKey::Encoded(key)) => {
            pq::verify(pair.spec(), key, input.payload(), signature)
        }
        (SignatureType::Native, PublicKey::Xmss(key)) => Ok(key.verify(input.payload(), signature)),
        _ => Err(wrong_key(spec, pair)),
    }
}
