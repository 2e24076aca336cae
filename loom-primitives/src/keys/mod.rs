#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Symmetric Keys
//!
//! One key abstraction serves block ciphers, stream ciphers and MACs: raw
//! bytes tagged with the [`KeyType`] they were generated for. Two keys are
//! equal iff tag and bytes are equal; the byte comparison is constant-time.

mod generator;

pub use generator::KeyGenerator;

use crate::spec::{MacSpec, StreamKeyType, SymKeySpec};
use loom_prelude::prelude::{LoomError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// The family a [`Key`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyType {
    /// Block cipher key.
    Symmetric(SymKeySpec),
    /// Stream cipher key.
    Stream(StreamKeyType),
    /// MAC key.
    Mac(MacSpec),
}

impl KeyType {
    /// Required key length in bytes.
    #[must_use]
    pub const fn key_len(&self) -> usize {
        match self {
            Self::Symmetric(spec) => spec.key_len(),
            Self::Stream(key_type) => key_type.key_len(),
            Self::Mac(spec) => spec.key_len(),
        }
    }

    /// Whether the tagged spec is internally consistent.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        match self {
            Self::Symmetric(spec) => spec.is_consistent(),
            Self::Stream(_) => true,
            Self::Mac(spec) => spec.is_consistent(),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric(spec) => write!(f, "{spec}"),
            Self::Stream(key_type) => write!(f, "{key_type}"),
            Self::Mac(spec) => write!(f, "{spec}"),
        }
    }
}

/// Typed symmetric key material.
#[derive(Clone)]
pub struct Key {
    key_type: KeyType,
    bytes: Zeroizing<Vec<u8>>,
}

impl Key {
    /// Wrap raw bytes as a key of the given type.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] if the length does not match the
    /// key type.
    pub fn new(key_type: KeyType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != key_type.key_len() {
            return Err(LoomError::InvalidKey(format!(
                "{key_type} key must be {} bytes, got {}",
                key_type.key_len(),
                bytes.len()
            )));
        }
        Ok(Self { key_type, bytes: Zeroizing::new(bytes.to_vec()) })
    }

    pub(crate) fn from_vec(key_type: KeyType, bytes: Zeroizing<Vec<u8>>) -> Self {
        Self { key_type, bytes }
    }

    /// The key's type tag.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the tag against what an engine expects.
    pub(crate) fn expect_type(&self, expected: KeyType) -> Result<()> {
        if self.key_type == expected {
            Ok(())
        } else {
            Err(LoomError::InvalidKey(format!(
                "expected {expected} key, got {}",
                self.key_type
            )))
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_type.hash(state);
        self.bytes.hash(state);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("key_type", &self.key_type)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::spec::{DigestType, KeyLength};
    use std::collections::HashSet;

    const AES128: KeyType = KeyType::Symmetric(SymKeySpec::aes(KeyLength::Len128));

    #[test]
    fn test_length_is_checked() {
        assert!(Key::new(AES128, &[0u8; 16]).is_ok());
        assert!(matches!(Key::new(AES128, &[0u8; 15]), Err(LoomError::InvalidKey(_))));
    }

    #[test]
    fn test_equality_needs_type_and_bytes() {
        let a = Key::new(AES128, &[1u8; 16]).unwrap();
        let b = Key::new(AES128, &[1u8; 16]).unwrap();
        let c = Key::new(AES128, &[2u8; 16]).unwrap();
        let d = Key::new(KeyType::Stream(StreamKeyType::Rabbit), &[1u8; 16]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        let set: HashSet<Key> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_debug_redacts_bytes() {
        let key = Key::new(KeyType::Mac(MacSpec::Hmac(DigestType::Sha256)), &[0xAB; 32]).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("171"));
    }
}
