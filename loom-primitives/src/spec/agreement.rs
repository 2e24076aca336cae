//! Key-agreement specifications.

use super::{AsymKeySpec, AsymKeyType};
use std::fmt;

/// Agreement protocol shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgreementType {
    /// One-pass: the initiator encapsulates to the responder's static key
    Anonymous,
    /// One-pass static-static agreement bound to a fresh init vector
    Basic,
    /// Two-pass: static and ephemeral agreements combined on both sides
    Unified,
    /// Two-pass: the responder encapsulates to the initiator's ephemeral KEM key
    Ephemeral,
}

impl AgreementType {
    /// Whether the protocol needs a response message.
    #[must_use]
    pub const fn is_two_pass(self) -> bool {
        matches!(self, Self::Unified | Self::Ephemeral)
    }

    /// Canonical protocol name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Basic => "Basic",
            Self::Unified => "Unified",
            Self::Ephemeral => "Ephemeral",
        }
    }
}

/// Key derivation applied to the raw agreed secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KdfType {
    /// Raw secret is returned
    None,
    /// HKDF-SHA256 expansion
    HkdfSha256,
    /// HKDF-SHA512 expansion
    HkdfSha512,
}

/// Agreement engine description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgreementSpec {
    /// Key spec both parties must use; ephemeral pairs are generated under it
    pub key_spec: AsymKeySpec,
    /// Protocol shape
    pub agreement_type: AgreementType,
    /// Derivation applied to the raw secret
    pub kdf: KdfType,
}

impl AgreementSpec {
    /// Create an agreement spec.
    #[must_use]
    pub const fn new(key_spec: AsymKeySpec, agreement_type: AgreementType, kdf: KdfType) -> Self {
        Self { key_spec, agreement_type, kdf }
    }

    /// Key family both parties must use.
    #[must_use]
    pub const fn key_type(&self) -> AsymKeyType {
        self.key_spec.key_type()
    }

    /// Whether the family can run the protocol.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        if !self.key_spec.is_consistent() {
            return false;
        }
        match self.agreement_type {
            AgreementType::Anonymous => matches!(
                self.key_type(),
                AsymKeyType::Rsa
                    | AsymKeyType::Ec
                    | AsymKeyType::Sm2
                    | AsymKeyType::Dh
                    | AsymKeyType::X25519
                    | AsymKeyType::X448
                    | AsymKeyType::MlKem
                    | AsymKeyType::McEliece
            ),
            AgreementType::Basic | AgreementType::Unified => matches!(
                self.key_type(),
                AsymKeyType::Ec
                    | AsymKeyType::Sm2
                    | AsymKeyType::Dh
                    | AsymKeyType::X25519
                    | AsymKeyType::X448
            ),
            AgreementType::Ephemeral => matches!(self.key_type(), AsymKeyType::MlKem),
        }
    }
}

impl fmt::Display for AgreementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:?}", self.key_spec, self.agreement_type.name(), self.kdf)
    }
}
