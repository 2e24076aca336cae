//! Symmetric key and block cipher specifications.

use std::fmt;

/// Symmetric key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyLength {
    /// 128-bit key
    Len128,
    /// 192-bit key
    Len192,
    /// 256-bit key
    Len256,
}

impl KeyLength {
    /// Length in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::Len128 => 128,
            Self::Len192 => 192,
            Self::Len256 => 256,
        }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self.bits() / 8
    }
}

/// Block cipher families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymKeyType {
    /// AES (FIPS 197)
    Aes,
    /// ARIA (RFC 5794)
    Aria,
    /// Camellia (RFC 3713)
    Camellia,
    /// SM4 (GB/T 32907)
    Sm4,
    /// Twofish
    Twofish,
    /// Serpent
    Serpent,
    /// Blowfish, 64-bit block
    Blowfish,
    /// Triple DES in EDE mode, 64-bit block
    DesEde,
}

impl SymKeyType {
    /// Every supported block cipher family.
    pub const ALL: [SymKeyType; 8] = [
        Self::Aes,
        Self::Aria,
        Self::Camellia,
        Self::Sm4,
        Self::Twofish,
        Self::Serpent,
        Self::Blowfish,
        Self::DesEde,
    ];

    /// Cipher block length in bytes.
    #[must_use]
    pub const fn block_len(self) -> usize {
        match self {
            Self::Blowfish | Self::DesEde => 8,
            _ => 16,
        }
    }

    /// Whether the cipher accepts keys of the given length.
    #[must_use]
    pub const fn supports_length(self, length: KeyLength) -> bool {
        match self {
            Self::Sm4 | Self::Blowfish => matches!(length, KeyLength::Len128),
            Self::DesEde => matches!(length, KeyLength::Len192),
            _ => true,
        }
    }

    /// Canonical algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aes => "AES",
            Self::Aria => "ARIA",
            Self::Camellia => "Camellia",
            Self::Sm4 => "SM4",
            Self::Twofish => "Twofish",
            Self::Serpent => "Serpent",
            Self::Blowfish => "Blowfish",
            Self::DesEde => "DESede",
        }
    }
}

/// A symmetric key type together with its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymKeySpec {
    /// Cipher family
    pub key_type: SymKeyType,
    /// Key length
    pub key_length: KeyLength,
}

impl SymKeySpec {
    /// Create a key spec.
    #[must_use]
    pub const fn new(key_type: SymKeyType, key_length: KeyLength) -> Self {
        Self { key_type, key_length }
    }

    /// AES key of the given length.
    #[must_use]
    pub const fn aes(key_length: KeyLength) -> Self {
        Self::new(SymKeyType::Aes, key_length)
    }

    /// Key length in bytes.
    #[must_use]
    pub const fn key_len(&self) -> usize {
        self.key_length.bytes()
    }

    /// Block length of the underlying cipher in bytes.
    #[must_use]
    pub const fn block_len(&self) -> usize {
        self.key_type.block_len()
    }

    /// Whether the cipher family accepts this key length.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.key_type.supports_length(self.key_length)
    }

    /// Whether GCM and GMAC are available for this key: AES-128 and AES-256
    /// only.
    #[must_use]
    pub const fn supports_gcm(&self) -> bool {
        matches!(self.key_type, SymKeyType::Aes) && matches!(self.key_length, KeyLength::Len128 | KeyLength::Len256)
    }
}

impl fmt::Display for SymKeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key_type.name(), self.key_length.bits())
    }
}

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CipherMode {
    /// Electronic codebook
    Ecb,
    /// Cipher block chaining
    Cbc,
    /// Counter mode (SIC)
    Ctr,
    /// Full-block cipher feedback
    Cfb,
    /// Output feedback
    Ofb,
    /// Galois/counter mode (AEAD)
    Gcm,
}

impl CipherMode {
    /// Whether the mode needs an IV.
    #[must_use]
    pub const fn needs_iv(self) -> bool {
        !matches!(self, Self::Ecb)
    }

    /// Whether the mode turns the block cipher into a keystream generator
    /// that accepts arbitrary-length input without padding.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Ctr | Self::Cfb | Self::Ofb)
    }

    /// Whether the mode provides authenticated encryption.
    #[must_use]
    pub const fn is_aead(self) -> bool {
        matches!(self, Self::Gcm)
    }

    /// Canonical mode name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ecb => "ECB",
            Self::Cbc => "CBC",
            Self::Ctr => "CTR",
            Self::Cfb => "CFB",
            Self::Ofb => "OFB",
            Self::Gcm => "GCM",
        }
    }
}

/// Block padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Padding {
    /// No padding; input must be block aligned
    None,
    /// ISO/IEC 7816-4 (0x80 followed by zeros)
    Iso7816d4,
    /// PKCS#7
    Pkcs7,
    /// ANSI X9.23 (zeros followed by the pad length)
    X923,
}

impl Padding {
    /// Canonical padding name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NoPadding",
            Self::Iso7816d4 => "ISO7816-4",
            Self::Pkcs7 => "PKCS7",
            Self::X923 => "X9.23",
        }
    }
}

/// Full description of a block cipher engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymCipherSpec {
    /// Key type and length
    pub key_spec: SymKeySpec,
    /// Mode of operation
    pub mode: CipherMode,
    /// Padding scheme
    pub padding: Padding,
}

impl SymCipherSpec {
    /// Create a cipher spec.
    #[must_use]
    pub const fn new(key_spec: SymKeySpec, mode: CipherMode, padding: Padding) -> Self {
        Self { key_spec, mode, padding }
    }

    /// Length of the IV the mode expects, zero for ECB.
    #[must_use]
    pub const fn iv_len(&self) -> usize {
        match self.mode {
            CipherMode::Ecb => 0,
            CipherMode::Gcm => 12,
            _ => self.key_spec.block_len(),
        }
    }

    /// Whether the mode and padding combination is meaningful. Streaming and
    /// AEAD modes take no padding and GCM is limited to AES-128/256.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        if !self.key_spec.is_consistent() {
            return false;
        }
        match self.mode {
            CipherMode::Ecb | CipherMode::Cbc => true,
            CipherMode::Ctr | CipherMode::Cfb | CipherMode::Ofb => {
                matches!(self.padding, Padding::None)
            }
            CipherMode::Gcm => {
                matches!(self.padding, Padding::None) && self.key_spec.supports_gcm()
            }
        }
    }
}

impl fmt::Display for SymCipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.key_spec, self.mode.name(), self.padding.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_equality_and_hash() {
        use std::collections::HashSet;
        let a = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Cbc, Padding::Pkcs7);
        let b = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Cbc, Padding::Pkcs7);
        let c = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len256), CipherMode::Cbc, Padding::Pkcs7);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_streaming_modes_reject_padding() {
        let spec = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Ctr, Padding::Pkcs7);
        assert!(!spec.is_consistent());
        let spec = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len128), CipherMode::Ctr, Padding::None);
        assert!(spec.is_consistent());
    }

    #[test]
    fn test_gcm_limited_to_aes_128_and_256() {
        let gcm = |key_type, key_length| {
            SymCipherSpec::new(SymKeySpec::new(key_type, key_length), CipherMode::Gcm, Padding::None)
        };
        assert!(gcm(SymKeyType::Aes, KeyLength::Len128).is_consistent());
        assert!(gcm(SymKeyType::Aes, KeyLength::Len256).is_consistent());
        assert!(!gcm(SymKeyType::Aes, KeyLength::Len192).is_consistent());
        assert!(!gcm(SymKeyType::Blowfish, KeyLength::Len128).is_consistent());
        for key_type in [SymKeyType::Aria, SymKeyType::Camellia, SymKeyType::Sm4, SymKeyType::Twofish, SymKeyType::Serpent] {
            assert!(!gcm(key_type, KeyLength::Len128).is_consistent(), "{key_type:?}");
        }
    }

    #[test]
    fn test_display() {
        let spec = SymCipherSpec::new(SymKeySpec::aes(KeyLength::Len256), CipherMode::Cbc, Padding::Iso7816d4);
        assert_eq!(spec.to_string(), "AES-256/CBC/ISO7816-4");
    }
}
