//! Key generation, derivation and translation.

use super::{Key, KeyType};
use crate::kdf;
use crate::rand::SecureRandom;
use crate::spec::{DigestType, MacSpec};
use loom_prelude::prelude::domains::KEY_FROM_SECRET;
use loom_prelude::prelude::{LoomError, Result};
use tracing::instrument;

/// Produces keys of a single [`KeyType`].
///
/// The factory caches one generator per key type, so a generator must stay
/// cheap to share: it holds only the type tag and a handle to the shared
/// random source.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    key_type: KeyType,
    random: SecureRandom,
}

impl KeyGenerator {
    /// Create a generator for `key_type`.
    #[must_use]
    pub fn new(key_type: KeyType, random: SecureRandom) -> Self {
        Self { key_type, random }
    }

    /// The type of key this generator produces.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Generate a fresh random key.
    #[instrument(level = "debug", skip(self), fields(key_type = %self.key_type))]
    #[must_use]
    pub fn generate_key(&self) -> Key {
        let mut bytes = self.random.secret_bytes(self.key_type.key_len());
        self.condition(&mut bytes);
        Key::from_vec(self.key_type, bytes)
    }

    /// Derive a key deterministically from a shared secret and salt.
    ///
    /// HKDF-SHA512 with the salt as HKDF salt and a label naming the key
    /// type as info, so two generators for different types never produce
    /// the same bytes from one secret.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidParameter`] if the secret is empty.
    #[instrument(level = "debug", skip(self, secret, salt), fields(key_type = %self.key_type))]
    pub fn generate_key_from_secret(&self, secret: &[u8], salt: &[u8]) -> Result<Key> {
        if secret.is_empty() {
            return Err(LoomError::InvalidParameter("empty shared secret".to_string()));
        }
        let mut bytes = kdf::hkdf_labelled(
            DigestType::Sha512,
            secret,
            Some(salt),
            KEY_FROM_SECRET,
            self.key_type.to_string().as_bytes(),
            self.key_type.key_len(),
        )?;
        self.condition(&mut bytes);
        Ok(Key::from_vec(self.key_type, bytes))
    }

    /// Reinterpret another key's bytes under this generator's type.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] if the byte lengths differ.
    pub fn translate_key(&self, source: &Key) -> Result<Key> {
        Key::new(self.key_type, source.as_bytes())
    }

    fn condition(&self, bytes: &mut [u8]) {
        if let KeyType::Mac(MacSpec::Poly1305 | MacSpec::Poly1305Cipher(_)) = self.key_type {
            clamp_poly1305(bytes);
        }
    }
}

/// Clamp the `r` half of a Poly1305 key (RFC 8439 section 2.5).
pub(crate) fn clamp_poly1305(key: &mut [u8]) {
    for i in [3usize, 7, 11, 15] {
        if let Some(b) = key.get_mut(i) {
            *b &= 0x0f;
        }
    }
    for i in [4usize, 8, 12] {
        if let Some(b) = key.get_mut(i) {
            *b &= 0xfc;
        }
    }
}
