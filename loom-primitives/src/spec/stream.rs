//! Stream cipher specifications.

use std::fmt;

/// Stream cipher families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKeyType {
    /// ChaCha20 with a 96-bit nonce (RFC 7539)
    ChaCha20,
    /// XChaCha20 with a 192-bit nonce
    XChaCha20,
    /// Salsa20/20
    Salsa20,
    /// XSalsa20
    XSalsa20,
    /// HC-256
    Hc256,
    /// Rabbit (RFC 4503)
    Rabbit,
}

impl StreamKeyType {
    /// Every supported stream cipher.
    pub const ALL: [StreamKeyType; 6] =
        [Self::ChaCha20, Self::XChaCha20, Self::Salsa20, Self::XSalsa20, Self::Hc256, Self::Rabbit];

    /// Key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Rabbit => 16,
            _ => 32,
        }
    }

    /// IV (nonce) length in bytes.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        match self {
            Self::ChaCha20 => 12,
            Self::XChaCha20 | Self::XSalsa20 => 24,
            Self::Salsa20 | Self::Rabbit => 8,
            Self::Hc256 => 32,
        }
    }

    /// Whether a Poly1305-authenticated variant exists.
    #[must_use]
    pub const fn supports_aead(self) -> bool {
        matches!(self, Self::ChaCha20 | Self::XChaCha20)
    }

    /// Canonical algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChaCha20 => "ChaCha20",
            Self::XChaCha20 => "XChaCha20",
            Self::Salsa20 => "Salsa20",
            Self::XSalsa20 => "XSalsa20",
            Self::Hc256 => "HC-256",
            Self::Rabbit => "Rabbit",
        }
    }
}

impl fmt::Display for StreamKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stream cipher engine description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamCipherSpec {
    /// Stream cipher family
    pub key_type: StreamKeyType,
    /// Whether the Poly1305-authenticated variant is wanted
    pub aead: bool,
}

impl StreamCipherSpec {
    /// Plain keystream cipher.
    #[must_use]
    pub const fn stream(key_type: StreamKeyType) -> Self {
        Self { key_type, aead: false }
    }

    /// Poly1305-authenticated variant.
    #[must_use]
    pub const fn aead(key_type: StreamKeyType) -> Self {
        Self { key_type, aead: true }
    }

    /// Whether the requested combination exists.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !self.aead || self.key_type.supports_aead()
    }
}

impl fmt::Display for StreamCipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.aead {
            write!(f, "{}-Poly1305", self.key_type)
        } else {
            write!(f, "{}", self.key_type)
        }
    }
}
