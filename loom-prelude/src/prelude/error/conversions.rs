//! Error Type Conversions
//!
//! `From` implementations for the third-party error types that cross engine
//! boundaries, so `?` lands every library failure in the taxonomy.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use super::LoomError;

impl From<der::Error> for LoomError {
    fn from(err: der::Error) -> Self {
        LoomError::Parse(format!("DER: {err}"))
    }
}

impl From<pkcs8::Error> for LoomError {
    fn from(err: pkcs8::Error) -> Self {
        LoomError::Parse(format!("PKCS#8: {err}"))
    }
}

impl From<spki::Error> for LoomError {
    fn from(err: spki::Error) -> Self {
        LoomError::Parse(format!("SubjectPublicKeyInfo: {err}"))
    }
}

impl From<rsa::Error> for LoomError {
    fn from(err: rsa::Error) -> Self {
        LoomError::operation("RSA", err)
    }
}

impl From<signature::Error> for LoomError {
    fn from(err: signature::Error) -> Self {
        LoomError::operation("signature primitive", err)
    }
}

impl From<elliptic_curve::Error> for LoomError {
    fn from(_err: elliptic_curve::Error) -> Self {
        LoomError::InvalidKey("elliptic curve point or scalar out of range".to_string())
    }
}

impl From<cipher::InvalidLength> for LoomError {
    fn from(_err: cipher::InvalidLength) -> Self {
        LoomError::InvalidParameter("invalid key or IV length".to_string())
    }
}

impl From<chacha20poly1305::Error> for LoomError {
    fn from(_err: chacha20poly1305::Error) -> Self {
        LoomError::Authentication("AEAD tag verification failed".to_string())
    }
}

impl From<aes_kw::Error> for LoomError {
    fn from(err: aes_kw::Error) -> Self {
        match err {
            aes_kw::Error::IntegrityCheckFailed => {
                LoomError::Authentication("key unwrap integrity check failed".to_string())
            }
            other => LoomError::InvalidParameter(format!("key wrap: {other}")),
        }
    }
}

impl From<hkdf::InvalidLength> for LoomError {
    fn from(_err: hkdf::InvalidLength) -> Self {
        LoomError::InvalidParameter("HKDF output length too large".to_string())
    }
}

impl From<aws_lc_rs::error::Unspecified> for LoomError {
    fn from(_err: aws_lc_rs::error::Unspecified) -> Self {
        LoomError::operation("aws-lc-rs", "unspecified cryptographic error")
    }
}
