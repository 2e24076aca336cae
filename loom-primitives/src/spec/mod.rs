//! Algorithm Specifications
//!
//! Immutable, hashable value types describing what an engine should be. Two
//! specs are equal iff every field is equal, which is what lets the factory
//! use them as cache keys.

pub mod agreement;
pub mod asymmetric;
pub mod digest;
pub mod mac;
pub mod signature;
pub mod stream;
pub mod symmetric;

pub use agreement::{AgreementSpec, AgreementType, KdfType};
pub use asymmetric::{
    AsymKeySpec, AsymKeyType, EcCurve, FfcParams, FnDsaParams, McElieceParams, MlDsaParams,
    MlKemParams, RsaModulus, SlhDsaParams, XmssDigest, XmssHeight, XmssMtHeight,
};
pub use digest::DigestType;
pub use mac::MacSpec;
pub use signature::{SignatureSpec, SignatureType};
pub use stream::{StreamCipherSpec, StreamKeyType};
pub use symmetric::{CipherMode, KeyLength, Padding, SymCipherSpec, SymKeySpec, SymKeyType};
