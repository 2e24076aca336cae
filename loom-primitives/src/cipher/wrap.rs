//! AES key wrapping (RFC 3394 KW and RFC 5649 KWP).
//!
//! Symmetric keys whose length is a multiple of eight bytes use KW, anything
//! else (odd-length HMAC keys, PKCS#8 private keys) uses KWP. Unwrapping a
//! blob that was altered or wrapped under another KEK fails with
//! [`LoomError::Authentication`].

use crate::keypair::{KeyPair, KeyPairGenerator};
use crate::keys::{Key, KeyType};
use crate::spec::{KeyLength, SymKeyType};
use aes_kw::{KekAes128, KekAes192, KekAes256};
use loom_prelude::prelude::{LoomError, Result};
use std::fmt;
use tracing::instrument;

enum Kek {
    Aes128(KekAes128),
    Aes192(KekAes192),
    Aes256(KekAes256),
}

macro_rules! with_kek {
    ($kek:expr, $k:ident => $body:expr) => {
        match $kek {
            Kek::Aes128($k) => $body,
            Kek::Aes192($k) => $body,
            Kek::Aes256($k) => $body,
        }
    };
}

/// Wraps keys and private keys under an AES key-encryption key.
pub struct KeyWrapper {
    kek: Kek,
    kek_type: KeyType,
}

fn uses_kw(len: usize) -> bool {
    len >= 16 && len % 8 == 0
}

impl KeyWrapper {
    /// Bind a key-encryption key.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] unless `kek` is an AES key.
    pub fn new(kek: &Key) -> Result<Self> {
        let KeyType::Symmetric(spec) = kek.key_type() else {
            return Err(LoomError::InvalidKey(format!("{} cannot wrap keys", kek.key_type())));
        };
        if spec.key_type != SymKeyType::Aes {
            return Err(LoomError::InvalidKey(format!("{spec} cannot wrap keys, AES required")));
        }
        let bytes = kek.as_bytes();
        let inner = match spec.key_length {
            KeyLength::Len128 => Kek::Aes128(KekAes128::try_from(bytes)?),
            KeyLength::Len192 => Kek::Aes192(KekAes192::try_from(bytes)?),
            KeyLength::Len256 => Kek::Aes256(KekAes256::try_from(bytes)?),
        };
        Ok(Self { kek: inner, kek_type: kek.key_type() })
    }

    /// Wrap arbitrary bytes with KWP.
    ///
    /// # Errors
    /// Propagates key-wrap failures.
    pub fn wrap_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(with_kek!(&self.kek, k => k.wrap_with_padding_vec(data))?)
    }

    /// Reverse [`Self::wrap_bytes`].
    ///
    /// # Errors
    /// [`LoomError::Authentication`] if the integrity check fails.
    pub fn unwrap_bytes(&self, wrapped: &[u8]) -> Result<zeroize::Zeroizing<Vec<u8>>> {
        let plain = with_kek!(&self.kek, k => k.unwrap_with_padding_vec(wrapped))?;
        Ok(zeroize::Zeroizing::new(plain))
    }

    /// Wrap a symmetric key.
    ///
    /// # Errors
    /// Propagates key-wrap failures.
    #[instrument(level = "debug", skip(self, key), fields(key_type = %key.key_type()))]
    pub fn wrap_key(&self, key: &Key) -> Result<Vec<u8>> {
        let bytes = key.as_bytes();
        if uses_kw(bytes.len()) {
            Ok(with_kek!(&self.kek, k => k.wrap_vec(bytes))?)
        } else {
            self.wrap_bytes(bytes)
        }
    }

    /// Unwrap a key previously wrapped with [`Self::wrap_key`] and tag it
    /// with `key_type`.
    ///
    /// # Errors
    /// [`LoomError::Authentication`] for a tampered blob or wrong KEK,
    /// [`LoomError::InvalidKey`] if the recovered length does not fit
    /// `key_type`.
    #[instrument(level = "debug", skip(self, wrapped), fields(key_type = %key_type))]
    pub fn unwrap_key(&self, wrapped: &[u8], key_type: KeyType) -> Result<Key> {
        let plain = if uses_kw(key_type.key_len()) {
            zeroize::Zeroizing::new(with_kek!(&self.kek, k => k.unwrap_vec(wrapped))?)
        } else {
            self.unwrap_bytes(wrapped)?
        };
        Key::new(key_type, &plain)
    }

    /// Wrap the PKCS#8 encoding of a key pair's private key.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a public-only pair, plus encoding and
    /// wrap failures.
    #[instrument(level = "debug", skip(self, generator, pair), fields(spec = %pair.spec()))]
    pub fn wrap_private_key(&self, generator: &KeyPairGenerator, pair: &KeyPair) -> Result<Vec<u8>> {
        let encoded = generator.encode_private(pair)?;
        self.wrap_bytes(&encoded)
    }

    /// Unwrap a private key and rebuild the pair from its public encoding.
    ///
    /// # Errors
    /// [`LoomError::Authentication`] for a tampered blob,
    /// [`LoomError::KeyMismatch`] if the private key does not belong to
    /// `public_der`, plus decoding failures.
    #[instrument(level = "debug", skip_all, fields(spec = %generator.spec()))]
    pub fn unwrap_key_pair(
        &self,
        generator: &KeyPairGenerator,
        public_der: &[u8],
        wrapped_private: &[u8],
    ) -> Result<KeyPair> {
        let private_der = self.unwrap_bytes(wrapped_private)?;
        generator.decode_key_pair(public_der, &private_der)
    }
}

impl fmt::Debug for KeyWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyWrapper").field("kek_type", &self.kek_type).finish_non_exhaustive()
    }
}
