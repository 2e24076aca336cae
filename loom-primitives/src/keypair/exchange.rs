//! Raw Diffie-Hellman style exchange shared by the KEM and agreement
//! engines: static or ephemeral scalar times a peer's public value, and the
//! fixed-width wire form of ephemeral public values.

use super::ffc::left_pad;
use super::{x448_public, DhPrivateKey, DhPublicKey, EcPrivateKey, EcPublicKey, PrivateKey, PublicKey};
use crate::rand::SecureRandom;
use loom_prelude::prelude::{LoomError, Result};
use num_bigint_dig::BigUint;
use zeroize::Zeroizing;

/// Raw agreed value between a private key and a peer's public key.
///
/// # Errors
/// [`LoomError::KeyMismatch`] when the keys belong to different families or
/// domains, [`LoomError::InvalidKey`] for a low-order or degenerate result.
pub(crate) fn agree(private: &PrivateKey, peer: &PublicKey) -> Result<Zeroizing<Vec<u8>>> {
    match (private, peer) {
        (PrivateKey::Ec(private), PublicKey::Ec(peer)) => private.agree(peer),
        (PrivateKey::Dh(private), PublicKey::Dh(peer)) => private.agree(peer),
        (PrivateKey::X25519(private), PublicKey::X25519(peer)) => {
            let shared = private.diffie_hellman(peer);
            if !shared.was_contributory() {
                return Err(LoomError::InvalidKey("X25519 peer is a low-order point".to_string()));
            }
            Ok(Zeroizing::new(shared.as_bytes().to_vec()))
        }
        (PrivateKey::X448(private), PublicKey::X448(peer)) => {
            let secret = x448::Secret::from_bytes(&private[..])
                .ok_or_else(|| LoomError::InvalidKey("X448 secret rejected".to_string()))?;
            let peer = x448::PublicKey::from_bytes(&peer[..])
                .ok_or_else(|| LoomError::InvalidKey("X448 peer is a low-order point".to_string()))?;
            let shared = secret
                .as_diffie_hellman(&peer)
                .ok_or_else(|| LoomError::InvalidKey("X448 agreement produced zero".to_string()))?;
            Ok(Zeroizing::new(shared.as_bytes().to_vec()))
        }
        _ => Err(LoomError::KeyMismatch("agreement between different key families".to_string())),
    }
}

/// Fresh key pair in the same group as `peer`.
pub(crate) fn ephemeral(peer: &PublicKey, random: &SecureRandom) -> Result<(PrivateKey, PublicKey)> {
    match peer {
        PublicKey::Ec(peer) => {
            let private = EcPrivateKey::generate(peer.curve(), random);
            let public = PublicKey::Ec(private.public_key()?);
            Ok((PrivateKey::Ec(private), public))
        }
        PublicKey::Dh(peer) => {
            let private = DhPrivateKey::generate(peer.domain(), random);
            let public = PublicKey::Dh(private.public_key());
            Ok((PrivateKey::Dh(private), public))
        }
        PublicKey::X25519(_) => {
            let private = x25519_dalek::StaticSecret::random_from_rng(&mut random.clone());
            let public = PublicKey::X25519(x25519_dalek::PublicKey::from(&private));
            Ok((PrivateKey::X25519(private), public))
        }
        PublicKey::X448(_) => {
            let private = Zeroizing::new(random.array::<56>());
            let public = x448_public(&private)
                .ok_or_else(|| LoomError::InvalidKey("X448 secret rejected".to_string()))?;
            Ok((PrivateKey::X448(private), PublicKey::X448(public)))
        }
        _ => Err(LoomError::unsupported("ephemeral exchange for this key family")),
    }
}

/// Wire form of an exchange public value: uncompressed SEC1 point, DH value
/// left-padded to the modulus length, or the raw Montgomery u-coordinate.
pub(crate) fn public_bytes(public: &PublicKey) -> Result<Vec<u8>> {
    match public {
        PublicKey::Ec(key) => Ok(key.sec1_bytes().to_vec()),
        PublicKey::Dh(key) => Ok(left_pad(&key.y().to_bytes_be(), key.domain().modulus_len()).to_vec()),
        PublicKey::X25519(key) => Ok(key.as_bytes().to_vec()),
        PublicKey::X448(key) => Ok(key.to_vec()),
        _ => Err(LoomError::unsupported("exchange encoding for this key family")),
    }
}

/// Length of [`public_bytes`] for a value in the group of `like`.
pub(crate) fn public_len(like: &PublicKey) -> Result<usize> {
    match like {
        PublicKey::Ec(key) => Ok(key.sec1_bytes().len()),
        PublicKey::Dh(key) => Ok(key.domain().modulus_len()),
        PublicKey::X25519(_) => Ok(32),
        PublicKey::X448(_) => Ok(56),
        _ => Err(LoomError::unsupported("exchange encoding for this key family")),
    }
}

/// Parse a value written by [`public_bytes`] in the group of `like`.
///
/// # Errors
/// [`LoomError::Parse`] for the wrong length, [`LoomError::InvalidKey`] for
/// a point off the curve or a value outside the DH range.
pub(crate) fn public_from_bytes(like: &PublicKey, bytes: &[u8]) -> Result<PublicKey> {
    let expected = public_len(like)?;
    if bytes.len() != expected {
        return Err(LoomError::Parse(format!(
            "exchange value is {} bytes, expected {expected}",
            bytes.len()
        )));
    }
    match like {
        PublicKey::Ec(key) => Ok(PublicKey::Ec(EcPublicKey::from_sec1(key.curve(), bytes)?)),
        PublicKey::Dh(key) => Ok(PublicKey::Dh(DhPublicKey::new(
            key.domain().clone(),
            BigUint::from_bytes_be(bytes),
        )?)),
        PublicKey::X25519(_) => {
            let mut raw = [0u8; 32];
            raw.copy_from_slice(bytes);
            Ok(PublicKey::X25519(x25519_dalek::PublicKey::from(raw)))
        }
        PublicKey::X448(_) => {
            let mut raw = [0u8; 56];
            raw.copy_from_slice(bytes);
            x448::PublicKey::from_bytes(&raw)
                .ok_or_else(|| LoomError::InvalidKey("X448 value is a low-order point".to_string()))?;
            Ok(PublicKey::X448(raw))
        }
        _ => Err(LoomError::unsupported("exchange encoding for this key family")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::keypair::KeyPairGenerator;
    use crate::spec::{AsymKeySpec, EcCurve};

    #[test]
    fn test_ephemeral_agrees_with_static() {
        let random = SecureRandom::new().unwrap();
        for spec in [AsymKeySpec::Ec(EcCurve::Secp384r1), AsymKeySpec::Sm2, AsymKeySpec::X25519, AsymKeySpec::X448] {
            let pair = KeyPairGenerator::new(spec, random.clone()).generate_key_pair().unwrap();
            let (private, public) = ephemeral(pair.public_key(), &random).unwrap();
            let wire = public_bytes(&public).unwrap();
            assert_eq!(wire.len(), public_len(pair.public_key()).unwrap());
            let decoded = public_from_bytes(pair.public_key(), &wire).unwrap();
            let ours = agree(&private, pair.public_key()).unwrap();
            let theirs = agree(pair.private_key().unwrap(), &decoded).unwrap();
            assert_eq!(*ours, *theirs, "{spec}");
        }
    }

    #[test]
    fn test_cross_family_is_mismatch() {
        let random = SecureRandom::new().unwrap();
        let x = KeyPairGenerator::new(AsymKeySpec::X25519, random.clone()).generate_key_pair().unwrap();
        let ec = KeyPairGenerator::new(AsymKeySpec::Ec(EcCurve::Secp256r1), random).generate_key_pair().unwrap();
        assert!(matches!(agree(x.private_key().unwrap(), ec.public_key()), Err(LoomError::KeyMismatch(_))));
    }

    #[test]
    fn test_wrong_length_is_parse_error() {
        let random = SecureRandom::new().unwrap();
        let pair = KeyPairGenerator::new(AsymKeySpec::X25519, random).generate_key_pair().unwrap();
        assert!(public_from_bytes(pair.public_key(), &[9u8; 31]).unwrap_err().is_parse());
    }
}
