#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Key Encapsulation
//!
//! A [`KemSender`] encapsulates a fresh secret to a recipient's public key;
//! a [`KemReceiver`] holding the matching private key recovers it from the
//! transported ciphertext.
//!
//! Ciphertext layout:
//!
//! ```text
//! init_vector (16 bytes) || encapsulated value
//! ```
//!
//! | Family | Encapsulated value |
//! |--------|--------------------|
//! | RSA | `r^e mod n` for a random `r < n`, left-padded to the modulus length |
//! | EC, SM2 | ephemeral uncompressed SEC1 point (ECIES-KEM) |
//! | DH | ephemeral public value, left-padded to the modulus length |
//! | X25519, X448 | ephemeral u-coordinate |
//! | ML-KEM, McEliece | native ciphertext |
//!
//! Both sides hash the raw value (`r`, the agreed x-coordinate or DH value,
//! or the native shared secret) through the chosen digest exactly once; the
//! result is the shared secret. The init vector is not hashed in: it salts
//! [`KemSender::derive_key`] and [`KemReceiver::derive_key`].

use crate::hash::DigestEngine;
use crate::keypair::ffc::left_pad;
use crate::keypair::{exchange, pq, KeyPair, PrivateKey, PublicKey};
use crate::keys::{Key, KeyGenerator};
use crate::rand::SecureRandom;
use crate::spec::{AsymKeyType, DigestType};
use loom_prelude::prelude::{LoomError, Result, INIT_VECTOR_LEN};
use num_bigint_dig::{BigUint, RandBigInt};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::{debug, instrument};
use zeroize::{Zeroize, Zeroizing};

/// Whether a key family can act as a KEM recipient.
#[must_use]
pub const fn supports(key_type: AsymKeyType) -> bool {
    matches!(
        key_type,
        AsymKeyType::Rsa
            | AsymKeyType::Ec
            | AsymKeyType::Sm2
            | AsymKeyType::Dh
            | AsymKeyType::X25519
            | AsymKeyType::X448
            | AsymKeyType::MlKem
            | AsymKeyType::McEliece
    )
}

fn check_family(recipient: &KeyPair) -> Result<()> {
    if supports(recipient.key_type()) {
        Ok(())
    } else {
        Err(LoomError::unsupported(format!("{} as a KEM recipient", recipient.spec())))
    }
}

fn hash_secret(digest: DigestType, raw: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(DigestEngine::digest_bytes(digest, raw))
}

fn rsa_encapsulate(key: &RsaPublicKey, random: &SecureRandom) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
    let mut rng = random.clone();
    let mut r = rng.gen_biguint_range(&BigUint::from(1u32), key.n());
    let c = rsa::hazmat::rsa_encrypt(key, &r)?;
    let raw = left_pad(&r.to_bytes_be(), key.size());
    r.zeroize();
    Ok((raw, left_pad(&c.to_bytes_be(), key.size()).to_vec()))
}

fn rsa_decapsulate(key: &RsaPrivateKey, encapsulated: &[u8], random: &SecureRandom) -> Result<Zeroizing<Vec<u8>>> {
    if encapsulated.len() != key.size() {
        return Err(LoomError::Parse(format!(
            "RSA-KEM value is {} bytes, expected {}",
            encapsulated.len(),
            key.size()
        )));
    }
    let c = BigUint::from_bytes_be(encapsulated);
    if &c >= key.n() {
        return Err(LoomError::Parse("RSA-KEM value is not below the modulus".to_string()));
    }
    let mut rng = random.clone();
    let mut r = rsa::hazmat::rsa_decrypt_and_check(key, Some(&mut rng), &c)?;
    let raw = left_pad(&r.to_bytes_be(), key.size());
    r.zeroize();
    Ok(raw)
}

/// Encapsulating side of a KEM exchange.
pub struct KemSender {
    digest: DigestType,
    init_vector: [u8; INIT_VECTOR_LEN],
    ciphertext: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl KemSender {
    /// Encapsulate a fresh secret to `recipient`. Only the public half of
    /// the pair is used.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for a family without a KEM, plus
    /// failures of the primitive.
    #[instrument(level = "debug", skip(recipient, random), fields(recipient = %recipient.spec(), digest = %digest))]
    pub fn new(recipient: &KeyPair, digest: DigestType, random: &SecureRandom) -> Result<Self> {
        check_family(recipient)?;
        let init_vector = random.array::<INIT_VECTOR_LEN>();
        let (raw, encapsulated) = match recipient.public_key() {
            PublicKey::Rsa(key) => rsa_encapsulate(key, random)?,
            PublicKey::Encoded(key) => pq::encapsulate(recipient.spec(), key, random)?,
            public => {
                let (private, ephemeral) = exchange::ephemeral(public, random)?;
                (exchange::agree(&private, public)?, exchange::public_bytes(&ephemeral)?)
            }
        };
        let mut ciphertext = Vec::with_capacity(INIT_VECTOR_LEN + encapsulated.len());
        ciphertext.extend_from_slice(&init_vector);
        ciphertext.extend_from_slice(&encapsulated);
        debug!(ciphertext_len = ciphertext.len(), "encapsulated");
        Ok(Self { digest, init_vector, ciphertext, secret: hash_secret(digest, &raw) })
    }

    /// Bytes to transport to the receiver.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Random prefix of the ciphertext.
    #[must_use]
    pub fn init_vector(&self) -> &[u8; INIT_VECTOR_LEN] {
        &self.init_vector
    }

    /// Digest of the raw encapsulated value.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Digest the secret was hashed with.
    #[must_use]
    pub fn digest(&self) -> DigestType {
        self.digest
    }

    /// Typed key from the shared secret, salted with the init vector.
    ///
    /// # Errors
    /// Same as [`KeyGenerator::generate_key_from_secret`].
    pub fn derive_key(&self, generator: &KeyGenerator) -> Result<Key> {
        generator.generate_key_from_secret(&self.secret, &self.init_vector)
    }
}

impl fmt::Debug for KemSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KemSender")
            .field("digest", &self.digest)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Decapsulating side of a KEM exchange.
pub struct KemReceiver {
    digest: DigestType,
    init_vector: [u8; INIT_VECTOR_LEN],
    secret: Zeroizing<Vec<u8>>,
}

impl KemReceiver {
    /// Recover the secret a [`KemSender`] encapsulated to `recipient`.
    ///
    /// # Errors
    /// - [`LoomError::InvalidKey`] when `recipient` has no private key
    /// - [`LoomError::Parse`] for a ciphertext that is too short or whose
    ///   encapsulated value has the wrong size
    /// - [`LoomError::UnsupportedAlgorithm`] for a family without a KEM
    #[instrument(level = "debug", skip(recipient, ciphertext, random), fields(recipient = %recipient.spec(), digest = %digest, len = ciphertext.len()))]
    pub fn new(recipient: &KeyPair, digest: DigestType, ciphertext: &[u8], random: &SecureRandom) -> Result<Self> {
        check_family(recipient)?;
        let private = recipient.require_private("decapsulation")?;
        if ciphertext.len() < INIT_VECTOR_LEN {
            return Err(LoomError::Parse("KEM ciphertext is shorter than its init vector".to_string()));
        }
        let (init_vector, encapsulated) = ciphertext.split_at(INIT_VECTOR_LEN);
        let init_vector = <[u8; INIT_VECTOR_LEN]>::try_from(init_vector)
            .map_err(|_| LoomError::Parse("KEM init vector".to_string()))?;
        let raw = match private {
            PrivateKey::Rsa(key) => rsa_decapsulate(key, encapsulated, random)?,
            PrivateKey::Encoded(key) => pq::decapsulate(recipient.spec(), key, encapsulated)?,
            private => {
                let ephemeral = exchange::public_from_bytes(recipient.public_key(), encapsulated)?;
                exchange::agree(private, &ephemeral)?
            }
        };
        debug!("decapsulated");
        Ok(Self { digest, init_vector, secret: hash_secret(digest, &raw) })
    }

    /// Init vector carried in the ciphertext.
    #[must_use]
    pub fn init_vector(&self) -> &[u8; INIT_VECTOR_LEN] {
        &self.init_vector
    }

    /// Digest of the raw encapsulated value.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Typed key from the shared secret, salted with the init vector.
    ///
    /// # Errors
    /// Same as [`KeyGenerator::generate_key_from_secret`].
    pub fn derive_key(&self, generator: &KeyGenerator) -> Result<Key> {
        generator.generate_key_from_secret(&self.secret, &self.init_vector)
    }
}

impl fmt::Debug for KemReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KemReceiver").field("digest", &self.digest).field("secret", &"[REDACTED]").finish()
    }
}
