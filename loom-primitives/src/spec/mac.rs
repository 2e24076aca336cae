//! MAC specifications.

use super::{DigestType, SymKeySpec};
use std::fmt;

/// MAC algorithm together with the primitive it is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MacSpec {
    /// HMAC over a digest
    Hmac(DigestType),
    /// CMAC over a block cipher
    Cmac(SymKeySpec),
    /// GMAC over a 128-bit block cipher
    Gmac(SymKeySpec),
    /// Raw one-time Poly1305
    Poly1305,
    /// Poly1305 keyed through a 128-bit block cipher (Poly1305-AES)
    Poly1305Cipher(SymKeySpec),
    /// Keyed BLAKE2b with 512-bit output
    Blake2b,
    /// Keyed BLAKE2s with 256-bit output
    Blake2s,
}

impl MacSpec {
    /// Tag length in bytes.
    #[must_use]
    pub const fn mac_len(&self) -> usize {
        match self {
            Self::Hmac(digest) => digest.output_len(),
            Self::Cmac(key_spec) => key_spec.block_len(),
            Self::Gmac(_) | Self::Poly1305 | Self::Poly1305Cipher(_) => 16,
            Self::Blake2b => 64,
            Self::Blake2s => 32,
        }
    }

    /// Key length in bytes.
    #[must_use]
    pub const fn key_len(&self) -> usize {
        match self {
            Self::Hmac(digest) => digest.output_len(),
            Self::Cmac(key_spec) | Self::Gmac(key_spec) => key_spec.key_len(),
            Self::Poly1305 | Self::Poly1305Cipher(_) => 32,
            Self::Blake2b => 64,
            Self::Blake2s => 32,
        }
    }

    /// IV length in bytes, zero when the MAC takes none.
    #[must_use]
    pub const fn iv_len(&self) -> usize {
        match self {
            Self::Gmac(_) => 12,
            Self::Poly1305Cipher(_) => 16,
            _ => 0,
        }
    }

    /// Whether the underlying primitive combination exists.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        match self {
            Self::Cmac(key_spec) => key_spec.is_consistent(),
            Self::Gmac(key_spec) => key_spec.supports_gcm(),
            Self::Poly1305Cipher(key_spec) => {
                key_spec.is_consistent()
                    && key_spec.block_len() == 16
                    && key_spec.key_len() == 16
            }
            _ => true,
        }
    }
}

impl fmt::Display for MacSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hmac(digest) => write!(f, "HMAC-{digest}"),
            Self::Cmac(key_spec) => write!(f, "CMAC-{key_spec}"),
            Self::Gmac(key_spec) => write!(f, "GMAC-{key_spec}"),
            Self::Poly1305 => f.write_str("Poly1305"),
            Self::Poly1305Cipher(key_spec) => write!(f, "Poly1305-{key_spec}"),
            Self::Blake2b => f.write_str("BLAKE2b-MAC"),
            Self::Blake2s => f.write_str("BLAKE2s-MAC"),
        }
    }
}
