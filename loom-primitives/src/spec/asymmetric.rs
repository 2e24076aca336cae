//! Asymmetric key-pair specifications.
//!
//! [`AsymKeySpec`] names a family together with the parameter that fixes its
//! domain (modulus size, curve, parameter set, tree shape). [`AsymKeyType`] is
//! the bare family tag used to check that two parties speak the same
//! algorithm.

use std::fmt;

/// Asymmetric algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AsymKeyType {
    /// RSA
    Rsa,
    /// FIPS 186 DSA
    Dsa,
    /// Finite-field Diffie-Hellman
    Dh,
    /// Elliptic curve over a named prime curve
    Ec,
    /// SM2
    Sm2,
    /// Ed25519
    Ed25519,
    /// X25519
    X25519,
    /// X448
    X448,
    /// Classic McEliece
    McEliece,
    /// ML-KEM (FIPS 203)
    MlKem,
    /// ML-DSA (FIPS 204)
    MlDsa,
    /// FN-DSA (Falcon)
    FnDsa,
    /// SLH-DSA (FIPS 205)
    SlhDsa,
    /// XMSS (RFC 8391)
    Xmss,
    /// XMSS^MT (RFC 8391)
    XmssMt,
}

impl AsymKeyType {
    /// Canonical family name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Dsa => "DSA",
            Self::Dh => "DH",
            Self::Ec => "EC",
            Self::Sm2 => "SM2",
            Self::Ed25519 => "Ed25519",
            Self::X25519 => "X25519",
            Self::X448 => "X448",
            Self::McEliece => "McEliece",
            Self::MlKem => "ML-KEM",
            Self::MlDsa => "ML-DSA",
            Self::FnDsa => "FN-DSA",
            Self::SlhDsa => "SLH-DSA",
            Self::Xmss => "XMSS",
            Self::XmssMt => "XMSS-MT",
        }
    }

    /// Whether private keys of the family carry a mutable signing state.
    #[must_use]
    pub const fn is_stateful(self) -> bool {
        matches!(self, Self::Xmss | Self::XmssMt)
    }
}

impl fmt::Display for AsymKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// RSA modulus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RsaModulus {
    /// 1024-bit modulus (legacy interoperability only)
    Mod1024,
    /// 2048-bit modulus
    Mod2048,
    /// 3072-bit modulus
    Mod3072,
    /// 4096-bit modulus
    Mod4096,
}

impl RsaModulus {
    /// Modulus length in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::Mod1024 => 1024,
            Self::Mod2048 => 2048,
            Self::Mod3072 => 3072,
            Self::Mod4096 => 4096,
        }
    }

    /// Look up the modulus size from a bit length.
    #[must_use]
    pub const fn from_bits(bits: usize) -> Option<Self> {
        match bits {
            1024 => Some(Self::Mod1024),
            2048 => Some(Self::Mod2048),
            3072 => Some(Self::Mod3072),
            4096 => Some(Self::Mod4096),
            _ => None,
        }
    }
}

/// Finite-field domain size (L = bits of p, N = bits of q) shared by DSA
/// and Diffie-Hellman.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FfcParams {
    /// L = 2048, N = 224
    L2048N224,
    /// L = 2048, N = 256
    L2048N256,
    /// L = 3072, N = 256
    L3072N256,
}

impl FfcParams {
    /// Bit lengths (L, N).
    #[must_use]
    pub const fn lengths(self) -> (usize, usize) {
        match self {
            Self::L2048N224 => (2048, 224),
            Self::L2048N256 => (2048, 256),
            Self::L3072N256 => (3072, 256),
        }
    }

    /// Look up the domain size from the bit lengths of p and q.
    #[must_use]
    pub const fn from_lengths(l: usize, n: usize) -> Option<Self> {
        match (l, n) {
            (2048, 224) => Some(Self::L2048N224),
            (2048, 256) => Some(Self::L2048N256),
            (3072, 256) => Some(Self::L3072N256),
            _ => None,
        }
    }
}

/// Named elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EcCurve {
    /// NIST P-256
    Secp256r1,
    /// NIST P-384
    Secp384r1,
    /// SEC2 secp256k1
    Secp256k1,
    /// SM2 recommended curve
    Sm2p256v1,
}

impl EcCurve {
    /// Curves usable by the generic EC family.
    pub const GENERIC: [EcCurve; 3] = [Self::Secp256r1, Self::Secp384r1, Self::Secp256k1];

    /// Field element length in bytes.
    #[must_use]
    pub const fn field_len(self) -> usize {
        match self {
            Self::Secp384r1 => 48,
            _ => 32,
        }
    }

    /// Curve name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Secp256r1 => "secp256r1",
            Self::Secp384r1 => "secp384r1",
            Self::Secp256k1 => "secp256k1",
            Self::Sm2p256v1 => "sm2p256v1",
        }
    }
}

/// Classic McEliece parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum McElieceParams {
    /// mceliece348864
    Cm348864,
    /// mceliece348864f (semi-systematic key generation)
    Cm348864f,
}

/// ML-KEM parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MlKemParams {
    /// ML-KEM-512
    MlKem512,
    /// ML-KEM-768
    MlKem768,
    /// ML-KEM-1024
    MlKem1024,
}

/// ML-DSA parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MlDsaParams {
    /// ML-DSA-44
    MlDsa44,
    /// ML-DSA-65
    MlDsa65,
    /// ML-DSA-87
    MlDsa87,
}

/// FN-DSA parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FnDsaParams {
    /// FN-DSA-512
    FnDsa512,
    /// FN-DSA-1024
    FnDsa1024,
}

/// SLH-DSA parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum SlhDsaParams {
    /// SLH-DSA-SHA2-128s
    Sha2_128s,
    /// SLH-DSA-SHA2-128f
    Sha2_128f,
    /// SLH-DSA-SHAKE-128s
    Shake128s,
    /// SLH-DSA-SHAKE-128f
    Shake128f,
    /// SLH-DSA-SHA2-256s
    Sha2_256s,
    /// SLH-DSA-SHAKE-256s
    Shake256s,
}

/// Tree hash of an XMSS or XMSS^MT key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XmssDigest {
    /// SHA-256, n = 32
    Sha256,
    /// SHA-512, n = 64
    Sha512,
    /// SHAKE128, n = 32
    Shake128,
    /// SHAKE256, n = 64
    Shake256,
}

impl XmssDigest {
    /// Node size n in bytes.
    #[must_use]
    pub const fn n(self) -> usize {
        match self {
            Self::Sha256 | Self::Shake128 => 32,
            Self::Sha512 | Self::Shake256 => 64,
        }
    }
}

/// XMSS tree height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XmssHeight {
    /// 2^10 signatures
    H10,
    /// 2^16 signatures
    H16,
    /// 2^20 signatures
    H20,
}

impl XmssHeight {
    /// Tree height.
    #[must_use]
    pub const fn height(self) -> u32 {
        match self {
            Self::H10 => 10,
            Self::H16 => 16,
            Self::H20 => 20,
        }
    }
}

/// XMSS^MT total height and layer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XmssMtHeight {
    /// h = 20, d = 2
    H20D2,
    /// h = 20, d = 4
    H20D4,
    /// h = 40, d = 4
    H40D4,
    /// h = 40, d = 8
    H40D8,
}

impl XmssMtHeight {
    /// Total height h.
    #[must_use]
    pub const fn height(self) -> u32 {
        match self {
            Self::H20D2 | Self::H20D4 => 20,
            Self::H40D4 | Self::H40D8 => 40,
        }
    }

    /// Number of layers d.
    #[must_use]
    pub const fn layers(self) -> u32 {
        match self {
            Self::H20D2 => 2,
            Self::H20D4 | Self::H40D4 => 4,
            Self::H40D8 => 8,
        }
    }
}

/// Full key-pair specification: family plus domain parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AsymKeySpec {
    /// RSA with the given modulus
    Rsa(RsaModulus),
    /// DSA over a freshly generated domain of the given size
    Dsa(FfcParams),
    /// Diffie-Hellman over a freshly generated domain of the given size
    Dh(FfcParams),
    /// Elliptic curve key on a generic named curve
    Ec(EcCurve),
    /// SM2 key on sm2p256v1
    Sm2,
    /// Ed25519
    Ed25519,
    /// X25519
    X25519,
    /// X448
    X448,
    /// Classic McEliece
    McEliece(McElieceParams),
    /// ML-KEM
    MlKem(MlKemParams),
    /// ML-DSA
    MlDsa(MlDsaParams),
    /// FN-DSA
    FnDsa(FnDsaParams),
    /// SLH-DSA
    SlhDsa(SlhDsaParams),
    /// Single-tree XMSS
    Xmss(XmssDigest, XmssHeight),
    /// Multi-tree XMSS^MT
    XmssMt(XmssDigest, XmssMtHeight),
}

impl AsymKeySpec {
    /// Family tag.
    #[must_use]
    pub const fn key_type(&self) -> AsymKeyType {
        match self {
            Self::Rsa(_) => AsymKeyType::Rsa,
            Self::Dsa(_) => AsymKeyType::Dsa,
            Self::Dh(_) => AsymKeyType::Dh,
            Self::Ec(_) => AsymKeyType::Ec,
            Self::Sm2 => AsymKeyType::Sm2,
            Self::Ed25519 => AsymKeyType::Ed25519,
            Self::X25519 => AsymKeyType::X25519,
            Self::X448 => AsymKeyType::X448,
            Self::McEliece(_) => AsymKeyType::McEliece,
            Self::MlKem(_) => AsymKeyType::MlKem,
            Self::MlDsa(_) => AsymKeyType::MlDsa,
            Self::FnDsa(_) => AsymKeyType::FnDsa,
            Self::SlhDsa(_) => AsymKeyType::SlhDsa,
            Self::Xmss(..) => AsymKeyType::Xmss,
            Self::XmssMt(..) => AsymKeyType::XmssMt,
        }
    }

    /// Curve of an EC-shaped spec.
    #[must_use]
    pub const fn ec_curve(&self) -> Option<EcCurve> {
        match self {
            Self::Ec(curve) => Some(*curve),
            Self::Sm2 => Some(EcCurve::Sm2p256v1),
            _ => None,
        }
    }

    /// Whether the spec names a real combination (the SM2 curve belongs to
    /// the SM2 family only).
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !matches!(self, Self::Ec(EcCurve::Sm2p256v1))
    }
}

impl fmt::Display for AsymKeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa(modulus) => write!(f, "RSA-{}", modulus.bits()),
            Self::Dsa(params) | Self::Dh(params) => {
                let (l, n) = params.lengths();
                write!(f, "{}-{l}-{n}", self.key_type())
            }
            Self::Ec(curve) => write!(f, "EC-{}", curve.name()),
            Self::Sm2 => f.write_str("SM2-sm2p256v1"),
            Self::Ed25519 | Self::X25519 | Self::X448 => write!(f, "{}", self.key_type()),
            Self::McEliece(params) => write!(f, "McEliece-{params:?}"),
            Self::MlKem(params) => write!(f, "{params:?}"),
            Self::MlDsa(params) => write!(f, "{params:?}"),
            Self::FnDsa(params) => write!(f, "{params:?}"),
            Self::SlhDsa(params) => write!(f, "SLH-DSA-{params:?}"),
            Self::Xmss(digest, height) => write!(f, "XMSS-{digest:?}-{}", height.height()),
            Self::XmssMt(digest, height) => {
                write!(f, "XMSS-MT-{digest:?}-{}/{}", height.height(), height.layers())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_tags() {
        assert_eq!(AsymKeySpec::Rsa(RsaModulus::Mod2048).key_type(), AsymKeyType::Rsa);
        assert_eq!(AsymKeySpec::Sm2.ec_curve(), Some(EcCurve::Sm2p256v1));
        assert!(AsymKeySpec::Xmss(XmssDigest::Sha256, XmssHeight::H10).key_type().is_stateful());
    }

    #[test]
    fn test_sm2_curve_reserved_for_sm2_family() {
        assert!(!AsymKeySpec::Ec(EcCurve::Sm2p256v1).is_consistent());
        assert!(AsymKeySpec::Sm2.is_consistent());
    }

    #[test]
    fn test_display() {
        assert_eq!(AsymKeySpec::Rsa(RsaModulus::Mod3072).to_string(), "RSA-3072");
        assert_eq!(AsymKeySpec::Dh(FfcParams::L2048N256).to_string(), "DH-2048-256");
        assert_eq!(
            AsymKeySpec::XmssMt(XmssDigest::Sha256, XmssMtHeight::H20D4).to_string(),
            "XMSS-MT-Sha256-20/4"
        );
    }
}
