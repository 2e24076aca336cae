//! Elliptic-curve key material for the EC and SM2 families.
//!
//! Keys are stored in curve-independent form (SEC1 uncompressed point,
//! big-endian scalar) and turned back into typed `elliptic_curve` values
//! through [`with_curve!`] whenever arithmetic is needed.

use crate::rand::SecureRandom;
use crate::spec::EcCurve;
use elliptic_curve::sec1::ToEncodedPoint;
use elliptic_curve::{PublicKey as CurvePublicKey, SecretKey};
use loom_prelude::prelude::{LoomError, Result};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Run `$body` with `$c` bound to the `elliptic_curve` curve type of an
/// [`EcCurve`].
macro_rules! with_curve {
    ($curve:expr, $c:ident => $body:expr) => {
        match $curve {
            $crate::spec::EcCurve::Secp256r1 => {
                type $c = p256::NistP256;
                $body
            }
            $crate::spec::EcCurve::Secp384r1 => {
                type $c = p384::NistP384;
                $body
            }
            $crate::spec::EcCurve::Secp256k1 => {
                type $c = k256::Secp256k1;
                $body
            }
            $crate::spec::EcCurve::Sm2p256v1 => {
                type $c = sm2::Sm2;
                $body
            }
        }
    };
}

pub(crate) use with_curve;

/// Public point on a named curve.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EcPublicKey {
    curve: EcCurve,
    point: Vec<u8>,
}

impl EcPublicKey {
    /// Parse a SEC1 point (compressed or not) and check it lies on `curve`.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] for an invalid or identity point.
    pub fn from_sec1(curve: EcCurve, bytes: &[u8]) -> Result<Self> {
        let point = with_curve!(curve, C => {
            let key = CurvePublicKey::<C>::from_sec1_bytes(bytes)?;
            key.to_encoded_point(false).as_bytes().to_vec()
        });
        Ok(Self { curve, point })
    }

    /// Curve of the point.
    #[must_use]
    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Uncompressed SEC1 encoding.
    #[must_use]
    pub fn sec1_bytes(&self) -> &[u8] {
        &self.point
    }
}

/// Secret scalar on a named curve.
#[derive(Clone)]
pub struct EcPrivateKey {
    curve: EcCurve,
    scalar: Zeroizing<Vec<u8>>,
}

impl EcPrivateKey {
    /// Load a big-endian scalar.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] for zero or out-of-range scalars.
    pub fn from_scalar(curve: EcCurve, bytes: &[u8]) -> Result<Self> {
        let scalar = with_curve!(curve, C => {
            let key = SecretKey::<C>::from_slice(bytes)?;
            Zeroizing::new(key.to_bytes().to_vec())
        });
        Ok(Self { curve, scalar })
    }

    pub(crate) fn generate(curve: EcCurve, random: &SecureRandom) -> Self {
        let mut rng = random.clone();
        let scalar = with_curve!(curve, C => {
            let key = SecretKey::<C>::random(&mut rng);
            Zeroizing::new(key.to_bytes().to_vec())
        });
        Self { curve, scalar }
    }

    /// Curve of the scalar.
    #[must_use]
    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    pub(crate) fn scalar_bytes(&self) -> &[u8] {
        &self.scalar
    }

    /// Derive the public point.
    ///
    /// # Errors
    /// Fails only if the stored scalar was corrupted.
    pub fn public_key(&self) -> Result<EcPublicKey> {
        let point = with_curve!(self.curve, C => {
            let key = SecretKey::<C>::from_slice(&self.scalar)?;
            key.public_key().to_encoded_point(false).as_bytes().to_vec()
        });
        Ok(EcPublicKey { curve: self.curve, point })
    }

    /// Raw ECDH: the x coordinate of `scalar * peer`.
    ///
    /// # Errors
    /// Returns [`LoomError::KeyMismatch`] when the peer is on another curve.
    pub(crate) fn agree(&self, peer: &EcPublicKey) -> Result<Zeroizing<Vec<u8>>> {
        if peer.curve != self.curve {
            return Err(LoomError::KeyMismatch(format!(
                "ECDH between {} and {}",
                self.curve.name(),
                peer.curve.name()
            )));
        }
        with_curve!(self.curve, C => {
            let secret = SecretKey::<C>::from_slice(&self.scalar)?;
            let public = CurvePublicKey::<C>::from_sec1_bytes(&peer.point)?;
            let shared =
                elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        })
    }

    pub(crate) fn same_key(&self, other: &Self) -> bool {
        self.curve == other.curve && bool::from(self.scalar.as_slice().ct_eq(other.scalar.as_slice()))
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.curve)
            .field("scalar", &"[REDACTED]")
            .finish()
    }
}

/// PKCS#8 `ECPrivateKey` with the named-curve parameter (RFC 5915).
pub(crate) fn encode_private(key: &EcPrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    with_curve!(key.curve, C => {
        let secret = SecretKey::<C>::from_slice(&key.scalar)?;
        let document = secret.to_pkcs8_der()?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    })
}

/// SubjectPublicKeyInfo with `id-ecPublicKey` and the named curve.
pub(crate) fn encode_public(key: &EcPublicKey) -> Result<Vec<u8>> {
    with_curve!(key.curve, C => {
        let public = CurvePublicKey::<C>::from_sec1_bytes(&key.point)?;
        Ok(public.to_public_key_der()?.into_vec())
    })
}

pub(crate) fn decode_private(curve: EcCurve, der: &[u8]) -> Result<EcPrivateKey> {
    let scalar = with_curve!(curve, C => {
        let secret = SecretKey::<C>::from_pkcs8_der(der)
            .map_err(|e| LoomError::parse("decode EC private key", e))?;
        Zeroizing::new(secret.to_bytes().to_vec())
    });
    Ok(EcPrivateKey { curve, scalar })
}

pub(crate) fn decode_public(curve: EcCurve, der: &[u8]) -> Result<EcPublicKey> {
    let point = with_curve!(curve, C => {
        let public = CurvePublicKey::<C>::from_public_key_der(der)
            .map_err(|e| LoomError::parse("decode EC public key", e))?;
        public.to_encoded_point(false).as_bytes().to_vec()
    });
    Ok(EcPublicKey { curve, point })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdh_is_symmetric_on_every_curve() {
        let random = SecureRandom::new().unwrap();
        for curve in [EcCurve::Secp256r1, EcCurve::Secp384r1, EcCurve::Secp256k1, EcCurve::Sm2p256v1] {
            let a = EcPrivateKey::generate(curve, &random);
            let b = EcPrivateKey::generate(curve, &random);
            let ab = a.agree(&b.public_key().unwrap()).unwrap();
            let ba = b.agree(&a.public_key().unwrap()).unwrap();
            assert_eq!(*ab, *ba);
            assert_eq!(ab.len(), curve.field_len());
        }
    }

    #[test]
    fn test_points_are_stored_uncompressed() {
        let random = SecureRandom::new().unwrap();
        let key = EcPrivateKey::generate(EcCurve::Secp256r1, &random);
        let public = key.public_key().unwrap();
        assert_eq!(public.sec1_bytes().len(), 65);
        assert_eq!(public.sec1_bytes()[0], 0x04);
    }

    #[test]
    fn test_cross_curve_agreement_is_key_mismatch() {
        let random = SecureRandom::new().unwrap();
        let a = EcPrivateKey::generate(EcCurve::Secp256r1, &random);
        let b = EcPrivateKey::generate(EcCurve::Secp256k1, &random);
        let err = a.agree(&b.public_key().unwrap()).unwrap_err();
        assert!(matches!(err, LoomError::KeyMismatch(_)));
    }

    #[test]
    fn test_zero_scalar_rejected() {
        assert!(EcPrivateKey::from_scalar(EcCurve::Secp256r1, &[0u8; 32]).is_err());
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let mut point = vec![0x04];
        point.extend_from_slice(&[1u8; 64]);
        assert!(EcPublicKey::from_sec1(EcCurve::Secp256r1, &point).is_err());
    }

    #[test]
    fn test_pkcs8_roundtrip_keeps_curve() {
        let random = SecureRandom::new().unwrap();
        let key = EcPrivateKey::generate(EcCurve::Sm2p256v1, &random);
        let der = encode_private(&key).unwrap();
        let decoded = decode_private(EcCurve::Sm2p256v1, &der).unwrap();
        assert!(decoded.same_key(&key));
        assert!(decode_private(EcCurve::Secp256r1, &der).unwrap_err().is_parse());
    }
}
