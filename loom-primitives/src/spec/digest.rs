//! Digest algorithm identifiers.

use std::fmt;

/// Hash algorithms available to digest, MAC, signature and KEM engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum DigestType {
    /// SHA-1 (legacy, kept for interoperability)
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
    /// SHA-512/224
    Sha512_224,
    /// SHA-512/256
    Sha512_256,
    /// SHA3-224
    Sha3_224,
    /// SHA3-256
    Sha3_256,
    /// SHA3-384
    Sha3_384,
    /// SHA3-512
    Sha3_512,
    /// BLAKE2b with 512-bit output
    Blake2b512,
    /// BLAKE2s with 256-bit output
    Blake2s256,
    /// SM3
    Sm3,
}

impl DigestType {
    /// Every supported digest.
    pub const ALL: [DigestType; 14] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha512_224,
        Self::Sha512_256,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
        Self::Blake2b512,
        Self::Blake2s256,
        Self::Sm3,
    ];

    /// Output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha512_224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha512_256 | Self::Sha3_256 | Self::Blake2s256 | Self::Sm3 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 | Self::Blake2b512 => 64,
        }
    }

    /// Internal block (rate) length in bytes.
    #[must_use]
    pub const fn block_len(self) -> usize {
        match self {
            Self::Sha1 | Self::Sha224 | Self::Sha256 | Self::Blake2s256 | Self::Sm3 => 64,
            Self::Sha384 | Self::Sha512 | Self::Sha512_224 | Self::Sha512_256 => 128,
            Self::Blake2b512 => 128,
            Self::Sha3_224 => 144,
            Self::Sha3_256 => 136,
            Self::Sha3_384 => 104,
            Self::Sha3_512 => 72,
        }
    }

    /// ISO/IEC 10118 hash identifier used in X9.31 and ISO9796-2 trailers.
    ///
    /// Only digests with an assigned trailer byte can drive those schemes.
    #[must_use]
    pub const fn iso_trailer(self) -> Option<u8> {
        match self {
            Self::Sha1 => Some(0x33),
            Self::Sha256 => Some(0x34),
            Self::Sha512 => Some(0x35),
            Self::Sha384 => Some(0x36),
            Self::Sha224 => Some(0x38),
            Self::Sha512_224 => Some(0x39),
            Self::Sha512_256 => Some(0x3A),
            _ => None,
        }
    }

    /// Whether the digest carries an ASN.1 object identifier (required for
    /// PKCS#1 v1.5 DigestInfo).
    #[must_use]
    pub const fn has_oid(self) -> bool {
        !matches!(self, Self::Blake2b512 | Self::Blake2s256 | Self::Sm3)
    }

    /// Canonical algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Sha512_224 => "SHA-512/224",
            Self::Sha512_256 => "SHA-512/256",
            Self::Sha3_224 => "SHA3-224",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_384 => "SHA3-384",
            Self::Sha3_512 => "SHA3-512",
            Self::Blake2b512 => "BLAKE2b-512",
            Self::Blake2s256 => "BLAKE2s-256",
            Self::Sm3 => "SM3",
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_lengths_are_within_block() {
        for digest in DigestType::ALL {
            assert!(digest.output_len() <= digest.block_len(), "{digest}");
        }
    }

    #[test]
    fn test_trailers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for trailer in DigestType::ALL.iter().filter_map(|d| d.iso_trailer()) {
            assert!(seen.insert(trailer));
        }
    }
}
