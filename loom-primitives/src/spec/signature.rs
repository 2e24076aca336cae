//! Signature scheme specifications.

use super::{AsymKeyType, DigestType};
use std::fmt;

/// Signature encoding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureType {
    /// RSASSA-PSS
    Pss,
    /// RSASSA-PKCS1-v1_5
    Pkcs1v15,
    /// ANSI X9.31 RSA
    X931,
    /// ISO/IEC 9796-2 scheme 1
    Iso9796d2,
    /// DSA or ECDSA with a random nonce
    Dsa,
    /// DSA or ECDSA with an RFC 6979 deterministic nonce
    DetDsa,
    /// Nyberg-Rueppel over an elliptic curve
    Nr,
    /// SM2 with its internal SM3 pre-hash
    Sm2,
    /// The family's native scheme (EdDSA, ML-DSA, FN-DSA, SLH-DSA, XMSS)
    Native,
}

impl SignatureType {
    /// Canonical scheme name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pss => "PSS",
            Self::Pkcs1v15 => "PKCS1v15",
            Self::X931 => "X9.31",
            Self::Iso9796d2 => "ISO9796-2",
            Self::Dsa => "DSA",
            Self::DetDsa => "DDSA",
            Self::Nr => "NR",
            Self::Sm2 => "SM2",
            Self::Native => "Native",
        }
    }
}

/// Signature engine description.
///
/// `digest` is the digest-then-sign hash. Native post-quantum and hash-based
/// schemes accept `None` to sign the message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureSpec {
    /// Key family the scheme runs over
    pub key_type: AsymKeyType,
    /// Encoding scheme
    pub signature_type: SignatureType,
    /// Pre-hash digest
    pub digest: Option<DigestType>,
}

impl SignatureSpec {
    /// Create a signature spec.
    #[must_use]
    pub const fn new(
        key_type: AsymKeyType,
        signature_type: SignatureType,
        digest: Option<DigestType>,
    ) -> Self {
        Self { key_type, signature_type, digest }
    }

    /// RSA with the given scheme and digest.
    #[must_use]
    pub const fn rsa(signature_type: SignatureType, digest: DigestType) -> Self {
        Self::new(AsymKeyType::Rsa, signature_type, Some(digest))
    }

    /// DSA with the given nonce scheme and digest.
    #[must_use]
    pub const fn dsa(signature_type: SignatureType, digest: DigestType) -> Self {
        Self::new(AsymKeyType::Dsa, signature_type, Some(digest))
    }

    /// EC with the given scheme and digest.
    #[must_use]
    pub const fn ec(signature_type: SignatureType, digest: DigestType) -> Self {
        Self::new(AsymKeyType::Ec, signature_type, Some(digest))
    }

    /// SM2 with its own hashing.
    #[must_use]
    pub const fn sm2() -> Self {
        Self::new(AsymKeyType::Sm2, SignatureType::Sm2, None)
    }

    /// The native scheme of the family, optionally over a pre-hash.
    #[must_use]
    pub const fn native(key_type: AsymKeyType, digest: Option<DigestType>) -> Self {
        Self::new(key_type, SignatureType::Native, digest)
    }

    /// Whether the family supports the scheme with this digest choice.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        match (self.key_type, self.signature_type, self.digest) {
            (AsymKeyType::Rsa, SignatureType::Pss, Some(_)) => true,
            (AsymKeyType::Rsa, SignatureType::Pkcs1v15, Some(digest)) => digest.has_oid(),
            (AsymKeyType::Rsa, SignatureType::X931 | SignatureType::Iso9796d2, Some(digest)) => {
                digest.iso_trailer().is_some()
            }
            (AsymKeyType::Dsa, SignatureType::Dsa | SignatureType::DetDsa, Some(_)) => true,
            (
                AsymKeyType::Ec,
                SignatureType::Dsa | SignatureType::DetDsa | SignatureType::Nr,
                Some(_),
            ) => true,
            (AsymKeyType::Sm2, SignatureType::Sm2, None) => true,
            (AsymKeyType::Ed25519, SignatureType::Native, None) => true,
            (
                AsymKeyType::MlDsa
                | AsymKeyType::FnDsa
                | AsymKeyType::SlhDsa
                | AsymKeyType::Xmss
                | AsymKeyType::XmssMt,
                SignatureType::Native,
                _,
            ) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SignatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key_type, self.signature_type.name())?;
        if let Some(digest) = self.digest {
            write!(f, "-{digest}")?;
        }
        Ok(())
    }
}
