//! RSA signature schemes.
//!
//! PSS and PKCS#1 v1.5 use the padding schemes of the `rsa` crate with the
//! digest selected at runtime. ANSI X9.31 and ISO/IEC 9796-2 scheme 1 build
//! their representative block here and apply the raw RSA permutation from
//! `rsa::hazmat`.
//!
//! X9.31 and ISO 9796-2 blocks always carry the explicit two-byte trailer
//! `hash-id || 0xCC`.

use crate::hash;
use crate::rand::SecureRandom;
use crate::spec::DigestType;
use der::asn1::ObjectIdentifier;
use loom_prelude::prelude::{LoomError, Result};
use num_bigint_dig::BigUint;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const X931_HEADER: u8 = 0x6B;
const X931_PAD: u8 = 0xBB;
const X931_DELIMITER: u8 = 0xBA;
const TRAILER_EXPLICIT: u8 = 0xCC;

const ISO_FULL_RECOVERY: u8 = 0x40;
const ISO_PARTIAL_RECOVERY: u8 = 0x60;

fn digest_oid(digest: DigestType) -> Option<ObjectIdentifier> {
    let oid = match digest {
        DigestType::Sha1 => "1.3.14.3.2.26",
        DigestType::Sha224 => "2.16.840.1.101.3.4.2.4",
        DigestType::Sha256 => "2.16.840.1.101.3.4.2.1",
        DigestType::Sha384 => "2.16.840.1.101.3.4.2.2",
        DigestType::Sha512 => "2.16.840.1.101.3.4.2.3",
        DigestType::Sha512_224 => "2.16.840.1.101.3.4.2.5",
        DigestType::Sha512_256 => "2.16.840.1.101.3.4.2.6",
        DigestType::Sha3_224 => "2.16.840.1.101.3.4.2.7",
        DigestType::Sha3_256 => "2.16.840.1.101.3.4.2.8",
        DigestType::Sha3_384 => "2.16.840.1.101.3.4.2.9",
        DigestType::Sha3_512 => "2.16.840.1.101.3.4.2.10",
        DigestType::Blake2b512 | DigestType::Blake2s256 | DigestType::Sm3 => return None,
    };
    ObjectIdentifier::new(oid).ok()
}

/// PKCS#1 v1.5 padding with the DigestInfo prefix of `digest`.
fn pkcs1v15(digest: DigestType) -> Result<Pkcs1v15Sign> {
    let oid = digest_oid(digest)
        .ok_or_else(|| LoomError::unsupported(format!("PKCS#1 v1.5 with {digest}")))?;
    let oid = oid.as_bytes();
    let hash_len = digest.output_len();
    // DigestInfo ::= SEQUENCE { SEQUENCE { OID, NULL }, OCTET STRING } minus the hash
    let mut prefix = Vec::with_capacity(oid.len() + 8);
    prefix.extend_from_slice(&[0x30, (oid.len() + 8 + hash_len) as u8, 0x30, (oid.len() + 4) as u8]);
    prefix.extend_from_slice(&[0x06, oid.len() as u8]);
    prefix.extend_from_slice(oid);
    prefix.extend_from_slice(&[0x05, 0x00, 0x04, hash_len as u8]);
    Ok(Pkcs1v15Sign { hash_len: Some(hash_len), prefix: prefix.into_boxed_slice() })
}

fn pss(digest: DigestType, blinded: bool) -> Pss {
    Pss { blinded, digest: hash::boxed(digest), salt_len: digest.output_len() }
}

fn trailer(digest: DigestType) -> Result<[u8; 2]> {
    digest
        .iso_trailer()
        .map(|id| [id, TRAILER_EXPLICIT])
        .ok_or_else(|| LoomError::unsupported(format!("ISO hash identifier for {digest}")))
}

fn modulus_len(n: &BigUint) -> usize {
    (n.bits() + 7) / 8
}

fn to_block(value: &BigUint, len: usize) -> Option<Zeroizing<Vec<u8>>> {
    let bytes = Zeroizing::new(value.to_bytes_be());
    let offset = len.checked_sub(bytes.len())?;
    let mut out = Zeroizing::new(vec![0u8; len]);
    out[offset..].copy_from_slice(&bytes);
    Some(out)
}

/// Raw private-key permutation with blinding.
fn private_op(key: &RsaPrivateKey, block: &[u8], random: &SecureRandom) -> Result<BigUint> {
    let m = BigUint::from_bytes_be(block);
    let mut rng = random.clone();
    Ok(rsa::hazmat::rsa_decrypt_and_check(key, Some(&mut rng), &m)?)
}

/// Raw public-key permutation; `None` when the signature is not below `n`.
fn public_op(key: &RsaPublicKey, signature: &[u8]) -> Option<BigUint> {
    if signature.len() != modulus_len(key.n()) {
        return None;
    }
    let s = BigUint::from_bytes_be(signature);
    if &s >= key.n() {
        return None;
    }
    rsa::hazmat::rsa_encrypt(key, &s).ok()
}

pub(crate) fn sign_pss(key: &RsaPrivateKey, digest: DigestType, hash: &[u8], random: &SecureRandom) -> Result<Vec<u8>> {
    let mut rng = random.clone();
    Ok(key.sign_with_rng(&mut rng, pss(digest, true), hash)?)
}

pub(crate) fn verify_pss(key: &RsaPublicKey, digest: DigestType, hash: &[u8], signature: &[u8]) -> bool {
    key.verify(pss(digest, false), hash, signature).is_ok()
}

pub(crate) fn sign_pkcs1v15(
    key: &RsaPrivateKey,
    digest: DigestType,
    hash: &[u8],
    random: &SecureRandom,
) -> Result<Vec<u8>> {
    let mut rng = random.clone();
    Ok(key.sign_with_rng(&mut rng, pkcs1v15(digest)?, hash)?)
}

pub(crate) fn verify_pkcs1v15(key: &RsaPublicKey, digest: DigestType, hash: &[u8], signature: &[u8]) -> Result<bool> {
    Ok(key.verify(pkcs1v15(digest)?, hash, signature).is_ok())
}

/// `6B BB .. BB BA || hash || id CC` at the modulus length. The leading
/// `6B` keeps the block below `n`.
fn x931_block(len: usize, digest: DigestType, hash: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let trailer = trailer(digest)?;
    let delta = len
        .checked_sub(hash.len() + trailer.len())
        .filter(|delta| *delta >= 2)
        .ok_or_else(|| LoomError::InvalidKey(format!("RSA modulus too small for X9.31 with {digest}")))?;
    let mut block = Zeroizing::new(vec![X931_PAD; len]);
    block[0] = X931_HEADER;
    block[delta - 1] = X931_DELIMITER;
    block[delta..delta + hash.len()].copy_from_slice(hash);
    block[len - 2..].copy_from_slice(&trailer);
    Ok(block)
}

pub(crate) fn sign_x931(key: &RsaPrivateKey, digest: DigestType, hash: &[u8], random: &SecureRandom) -> Result<Vec<u8>> {
    let len = modulus_len(key.n());
    let block = x931_block(len, digest, hash)?;
    let t = private_op(key, &block, random)?;
    // X9.31 publishes min(t, n - t)
    let other = key.n() - &t;
    let s = if other < t { other } else { t };
    to_block(&s, len)
        .map(|block| block.to_vec())
        .ok_or_else(|| LoomError::operation("X9.31 signing", "signature wider than modulus"))
}

pub(crate) fn verify_x931(key: &RsaPublicKey, digest: DigestType, hash: &[u8], signature: &[u8]) -> Result<bool> {
    let len = modulus_len(key.n());
    let expected = x931_block(len, digest, hash)?;
    let Some(t) = public_op(key, signature) else {
        return Ok(false);
    };
    let twelve = BigUint::from(12u32);
    let fifteen = BigUint::from(15u32);
    let f = if (&t & &fifteen) == twelve { t } else { key.n() - &t };
    if (&f & &fifteen) != twelve {
        return Ok(false);
    }
    Ok(to_block(&f, len).map_or(false, |block| bool::from(block.as_slice().ct_eq(expected.as_slice()))))
}

/// Number of message bytes an ISO 9796-2 block of `len` bytes can carry
/// next to a `hash_len` digest.
pub(crate) fn iso9796_capacity(len: usize, hash_len: usize) -> usize {
    // header nibble + delimiter byte + digest + two-byte trailer
    len.saturating_sub(hash_len + 3)
}

fn iso9796_block(
    len: usize,
    key_bits: usize,
    digest: DigestType,
    hash: &[u8],
    message: &[u8],
    total: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let trailer = trailer(digest)?;
    let mut block = Zeroizing::new(vec![0u8; len]);
    let hash_start = len
        .checked_sub(hash.len() + trailer.len())
        .filter(|start| *start >= 1)
        .ok_or_else(|| LoomError::InvalidKey(format!("RSA modulus too small for ISO 9796-2 with {digest}")))?;
    block[hash_start..hash_start + hash.len()].copy_from_slice(hash);
    block[len - 2..].copy_from_slice(&trailer);

    let needed_bits = (hash.len() + total) * 8 + 16 + 4;
    let (header, recovered) = if needed_bits > key_bits {
        let excess = needed_bits - key_bits;
        let keep = total.saturating_sub((excess + 7) / 8);
        (ISO_PARTIAL_RECOVERY, &message[..keep.min(message.len())])
    } else {
        (ISO_FULL_RECOVERY, &message[..total.min(message.len())])
    };
    let delta = hash_start
        .checked_sub(recovered.len())
        .ok_or_else(|| LoomError::operation("ISO 9796-2 signing", "recoverable part overflows block"))?;
    block[delta..hash_start].copy_from_slice(recovered);
    if delta > 1 {
        for byte in &mut block[1..delta] {
            *byte = X931_PAD;
        }
        block[delta - 1] = X931_DELIMITER;
        block[0] = 0x0B | header;
    } else {
        block[0] = 0x0A | header;
    }
    Ok(block)
}

/// ISO/IEC 9796-2 scheme 1 signature. `message` holds the leading bytes of
/// the message (at least the recoverable part); `total` is its full length.
pub(crate) fn sign_iso9796(
    key: &RsaPrivateKey,
    digest: DigestType,
    hash: &[u8],
    message: &[u8],
    total: usize,
    random: &SecureRandom,
) -> Result<Vec<u8>> {
    let len = modulus_len(key.n());
    let block = iso9796_block(len, key.n().bits(), digest, hash, message, total)?;
    let s = private_op(key, &block, random)?;
    to_block(&s, len)
        .map(|block| block.to_vec())
        .ok_or_else(|| LoomError::operation("ISO 9796-2 signing", "signature wider than modulus"))
}

/// Verify an ISO/IEC 9796-2 signature by rebuilding the expected block
/// from the received message.
pub(crate) fn verify_iso9796(
    key: &RsaPublicKey,
    digest: DigestType,
    hash: &[u8],
    message: &[u8],
    total: usize,
    signature: &[u8],
) -> Result<bool> {
    let len = modulus_len(key.n());
    let expected = iso9796_block(len, key.n().bits(), digest, hash, message, total)?;
    let Some(m) = public_op(key, signature) else {
        return Ok(false);
    };
    Ok(to_block(&m, len).map_or(false, |block| bool::from(block.as_slice().ct_eq(expected.as_slice()))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::hash::DigestEngine;

    fn key() -> RsaPrivateKey {
        let mut rng = SecureRandom::from_seed([7u8; 32]);
        RsaPrivateKey::new(&mut rng, 1024).unwrap()
    }

    #[test]
    fn test_sha256_digest_info_prefix() {
        let scheme = pkcs1v15(DigestType::Sha256).unwrap();
        assert_eq!(
            &*scheme.prefix,
            &[
                0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
                0x05, 0x00, 0x04, 0x20
            ][..]
        );
        assert!(pkcs1v15(DigestType::Sm3).is_err());
    }

    #[test]
    fn test_x931_block_layout() {
        let hash = [0x11u8; 32];
        let block = x931_block(128, DigestType::Sha256, &hash).unwrap();
        assert_eq!(block[0], 0x6B);
        assert_eq!(block[1], 0xBB);
        assert_eq!(block[128 - 2 - 32 - 1], 0xBA);
        assert_eq!(&block[126..], &[0x34, 0xCC]);
    }

    #[test]
    fn test_x931_roundtrip_and_tamper() {
        let private = key();
        let public = private.to_public_key();
        let random = SecureRandom::new().unwrap();
        let hash = DigestEngine::digest_bytes(DigestType::Sha256, b"x9.31");
        let signature = sign_x931(&private, DigestType::Sha256, &hash, &random).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verify_x931(&public, DigestType::Sha256, &hash, &signature).unwrap());
        let other = DigestEngine::digest_bytes(DigestType::Sha256, b"x9.32");
        assert!(!verify_x931(&public, DigestType::Sha256, &other, &signature).unwrap());
        assert!(!verify_x931(&public, DigestType::Sha256, &hash, &signature[1..]).unwrap());
    }

    #[test]
    fn test_iso9796_full_and_partial_recovery() {
        let private = key();
        let public = private.to_public_key();
        let random = SecureRandom::new().unwrap();
        let capacity = iso9796_capacity(128, 20);
        for message in [b"short".to_vec(), vec![0x5A; capacity + 40]] {
            let hash = DigestEngine::digest_bytes(DigestType::Sha1, &message);
            let signature =
                sign_iso9796(&private, DigestType::Sha1, &hash, &message, message.len(), &random).unwrap();
            assert!(verify_iso9796(&public, DigestType::Sha1, &hash, &message, message.len(), &signature).unwrap());
            let mut altered = message.clone();
            altered[0] ^= 1;
            let altered_hash = DigestEngine::digest_bytes(DigestType::Sha1, &altered);
            assert!(!verify_iso9796(&public, DigestType::Sha1, &altered_hash, &altered, altered.len(), &signature)
                .unwrap());
        }
    }

    #[test]
    fn test_iso9796_header_marks_recovery_mode() {
        let hash = [0u8; 20];
        let full = iso9796_block(128, 1024, DigestType::Sha1, &hash, b"abc", 3).unwrap();
        assert_eq!(full[0], 0x4B);
        let long = vec![1u8; 200];
        let partial = iso9796_block(128, 1024, DigestType::Sha1, &hash, &long, long.len()).unwrap();
        assert_eq!(partial[0] & 0xF0, 0x60);
    }
}
