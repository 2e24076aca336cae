//! Discrete-logarithm signatures: DSA, ECDSA, EC Nyberg-Rueppel and SM2.
//!
//! Every scheme here emits the DER `SEQUENCE { r INTEGER, s INTEGER }`.
//! Decoding separates the two failure classes: a structure that is not
//! that SEQUENCE is a [`LoomError::Parse`], while well-formed integers
//! that are out of range or do not verify give `false`.

use crate::hash::with_digest;
use crate::keypair::ec::with_curve;
use crate::keypair::{EcPrivateKey, EcPublicKey};
use crate::rand::SecureRandom;
use crate::spec::{DigestType, EcCurve};
use der::asn1::UintRef;
use der::{Decode, Encode, Sequence};
use elliptic_curve::ff::{Field, PrimeField};
use elliptic_curve::group::{Curve as _, Group};
use elliptic_curve::ops::Reduce;
use elliptic_curve::point::AffineCoordinates;
use elliptic_curve::{CurveArithmetic, FieldBytes, NonZeroScalar, PublicKey as CurvePublicKey, SecretKey};
use loom_prelude::prelude::{LoomError, Result};
use num_bigint_dig::BigUint;
use signature::hazmat::{PrehashSigner, PrehashVerifier, RandomizedPrehashSigner};
use signature::{Signer, Verifier};
use std::borrow::Cow;
use subtle::ConstantTimeEq;

/// Nonces drawn before Nyberg-Rueppel signing gives up.
pub(crate) const NR_ATTEMPTS: u32 = 256;

/// SM2 distinguishing identifier (GM/T 0009 default user ID).
const SM2_DIST_ID: &str = "1234567812345678";

/// Two-integer signature as carried on the wire.
#[derive(Sequence)]
struct RsSignature<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

fn encode_rs(r: &[u8], s: &[u8]) -> Result<Vec<u8>> {
    Ok(RsSignature { r: UintRef::new(r)?, s: UintRef::new(s)? }.to_der()?)
}

/// Parse the SEQUENCE and return `r || s`, each left-padded to `width`
/// bytes. `Ok(None)` means well-formed but wider than the group order.
fn decode_rs(signature: &[u8], width: usize, scheme: &str) -> Result<Option<Vec<u8>>> {
    let parsed = RsSignature::from_der(signature).map_err(|e| LoomError::parse(scheme, e))?;
    let mut out = vec![0u8; width * 2];
    for (half, value) in [parsed.r.as_bytes(), parsed.s.as_bytes()].into_iter().enumerate() {
        let Some(offset) = width.checked_sub(value.len()) else {
            return Ok(None);
        };
        out[half * width + offset..(half + 1) * width].copy_from_slice(value);
    }
    Ok(Some(out))
}

/// Run `$body` with `$c` bound to a curve that `ecdsa` supports.
macro_rules! with_ecdsa_curve {
    ($curve:expr, $c:ident => $body:expr) => {
        match $curve {
            EcCurve::Secp256r1 => {
                type $c = p256::NistP256;
                $body
            }
            EcCurve::Secp384r1 => {
                type $c = p384::NistP384;
                $body
            }
            EcCurve::Secp256k1 => {
                type $c = k256::Secp256k1;
                $body
            }
            EcCurve::Sm2p256v1 => Err(LoomError::unsupported("ECDSA over sm2p256v1")),
        }
    };
}

/// DSA over a pre-computed digest. `deterministic` selects the RFC 6979
/// nonce keyed by `digest`.
pub(crate) fn sign_dsa(
    key: &dsa::SigningKey,
    digest: DigestType,
    hash: &[u8],
    deterministic: bool,
    random: &SecureRandom,
) -> Result<Vec<u8>> {
    let signature = if deterministic {
        with_digest!(digest, D => key.sign_prehashed_rfc6979::<D>(hash))?
    } else {
        let mut rng = random.clone();
        key.sign_prehash_with_rng(&mut rng, hash)?
    };
    Ok(signature.to_der()?)
}

pub(crate) fn verify_dsa(key: &dsa::VerifyingKey, hash: &[u8], signature: &[u8]) -> Result<bool> {
    let parsed = RsSignature::from_der(signature).map_err(|e| LoomError::parse("decode DSA signature", e))?;
    let r = BigUint::from_bytes_be(parsed.r.as_bytes());
    let s = BigUint::from_bytes_be(parsed.s.as_bytes());
    let Ok(signature) = dsa::Signature::from_components(r, s) else {
        return Ok(false);
    };
    Ok(key.verify_prehash(hash, &signature).is_ok())
}

/// `ecdsa` refuses a prehash shorter than half the field. Left-padding with
/// zeros keeps the integer the digest converts to, so signatures stay
/// standard for short digests such as SHA-1 on P-384.
fn ecdsa_prehash(hash: &[u8], field_len: usize) -> Cow<'_, [u8]> {
    let min = field_len / 2;
    match min.checked_sub(hash.len()) {
        Some(pad) if pad > 0 => {
            let mut widened = vec![0u8; min];
            widened[pad..].copy_from_slice(hash);
            Cow::Owned(widened)
        }
        _ => Cow::Borrowed(hash),
    }
}

/// ECDSA over a generic curve. The deterministic variant derives its nonce
/// per RFC 6979 with the curve's own digest.
pub(crate) fn sign_ecdsa(
    key: &EcPrivateKey,
    hash: &[u8],
    deterministic: bool,
    random: &SecureRandom,
) -> Result<Vec<u8>> {
    let hash = ecdsa_prehash(hash, key.curve().field_len());
    with_ecdsa_curve!(key.curve(), C => {
        let signer = ecdsa::SigningKey::<C>::from_slice(key.scalar_bytes())?;
        let signature: ecdsa::Signature<C> = if deterministic {
            signer.sign_prehash(&hash)?
        } else {
            let mut rng = random.clone();
            signer.sign_prehash_with_rng(&mut rng, &hash)?
        };
        Ok(signature.to_der().as_bytes().to_vec())
    })
}

pub(crate) fn verify_ecdsa(key: &EcPublicKey, hash: &[u8], signature: &[u8]) -> Result<bool> {
    let width = key.curve().field_len();
    let Some(rs) = decode_rs(signature, width, "decode ECDSA signature")? else {
        return Ok(false);
    };
    let hash = ecdsa_prehash(hash, width);
    with_ecdsa_curve!(key.curve(), C => {
        let verifier = ecdsa::VerifyingKey::<C>::from_sec1_bytes(key.sec1_bytes())?;
        let Ok(signature) = ecdsa::Signature::<C>::from_slice(&rs) else {
            return Ok(false);
        };
        Ok(verifier.verify_prehash(&hash, &signature).is_ok())
    })
}

/// Digest as a scalar: leftmost field-length bytes, or left-padded when
/// shorter, reduced modulo the group order.
fn digest_scalar<C: CurveArithmetic>(hash: &[u8]) -> C::Scalar {
    let mut bytes = FieldBytes::<C>::default();
    let take = hash.len().min(bytes.len());
    let offset = bytes.len() - take;
    bytes[offset..].copy_from_slice(&hash[..take]);
    <C::Scalar as Reduce<C::Uint>>::reduce_bytes(&bytes)
}

fn scalar_from_slice<C: CurveArithmetic>(bytes: &[u8]) -> Option<C::Scalar> {
    let mut repr = FieldBytes::<C>::default();
    if bytes.len() != repr.len() {
        return None;
    }
    repr.copy_from_slice(bytes);
    Option::from(C::Scalar::from_repr(repr))
}

/// Nyberg-Rueppel: `r = (kG).x + e`, `s = k - r·d`, both mod n.
fn nr_sign<C: CurveArithmetic>(scalar: &[u8], hash: &[u8], random: &SecureRandom) -> Result<Vec<u8>> {
    let secret = SecretKey::<C>::from_slice(scalar)?;
    let d = *secret.to_nonzero_scalar();
    let e = digest_scalar::<C>(hash);
    let mut rng = random.clone();
    for _ in 0..NR_ATTEMPTS {
        let k = NonZeroScalar::<C>::random(&mut rng);
        let v = (C::ProjectivePoint::generator() * *k).to_affine();
        let r = <C::Scalar as Reduce<C::Uint>>::reduce_bytes(&v.x()) + e;
        if bool::from(r.is_zero()) {
            continue;
        }
        let s = *k - r * d;
        if bool::from(s.is_zero()) {
            continue;
        }
        return encode_rs(&r.to_repr(), &s.to_repr());
    }
    Err(LoomError::PointNotFound { attempts: NR_ATTEMPTS })
}

/// Accept when `r - (sG + rQ).x ≡ e`.
fn nr_verify<C: CurveArithmetic>(point: &[u8], hash: &[u8], rs: &[u8]) -> Result<bool>
where
    elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
    C::AffinePoint: elliptic_curve::sec1::FromEncodedPoint<C> + elliptic_curve::sec1::ToEncodedPoint<C>,
{
    let public = CurvePublicKey::<C>::from_sec1_bytes(point)?;
    let (r, s) = rs.split_at(rs.len() / 2);
    let (Some(r), Some(s)) = (scalar_from_slice::<C>(r), scalar_from_slice::<C>(s)) else {
        return Ok(false);
    };
    if bool::from(r.is_zero() | s.is_zero()) {
        return Ok(false);
    }
    let p = (C::ProjectivePoint::generator() * s + public.to_projective() * r).to_affine();
    let t = r - <C::Scalar as Reduce<C::Uint>>::reduce_bytes(&p.x());
    let e = digest_scalar::<C>(hash);
    Ok(bool::from(t.to_repr().as_slice().ct_eq(e.to_repr().as_slice())))
}

pub(crate) fn sign_nr(key: &EcPrivateKey, hash: &[u8], random: &SecureRandom) -> Result<Vec<u8>> {
    with_curve!(key.curve(), C => nr_sign::<C>(key.scalar_bytes(), hash, random))
}

pub(crate) fn verify_nr(key: &EcPublicKey, hash: &[u8], signature: &[u8]) -> Result<bool> {
    let width = key.curve().field_len();
    let Some(rs) = decode_rs(signature, width, "decode NR signature")? else {
        return Ok(false);
    };
    with_curve!(key.curve(), C => nr_verify::<C>(key.sec1_bytes(), hash, &rs))
}

/// SM2 signature over the whole message; the SM3 pre-hash with the signer
/// identity happens inside the `sm2` crate.
pub(crate) fn sign_sm2(key: &EcPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let secret = SecretKey::<sm2::Sm2>::from_slice(key.scalar_bytes())?;
    let signer = sm2::dsa::SigningKey::new(SM2_DIST_ID, &secret)?;
    let signature: sm2::dsa::Signature = signer.try_sign(message)?;
    let bytes = signature.to_bytes();
    let (r, s) = bytes.split_at(bytes.len() / 2);
    encode_rs(r, s)
}

pub(crate) fn verify_sm2(key: &EcPublicKey, message: &[u8], signature: &[u8]) -> Result<bool> {
    let Some(rs) = decode_rs(signature, EcCurve::Sm2p256v1.field_len(), "decode SM2 signature")? else {
        return Ok(false);
    };
    let verifier = sm2::dsa::VerifyingKey::from_sec1_bytes(SM2_DIST_ID, key.sec1_bytes())?;
    let Ok(signature) = sm2::dsa::Signature::from_slice(&rs) else {
        return Ok(false);
    };
    Ok(verifier.verify(message, &signature).is_ok())
}
