#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Digest Engine
//!
//! Streaming hash over any [`DigestType`]. The engine is total: hashing
//! never fails, and `finish` leaves the engine reset and ready for the next
//! message.
//!
//! ## Example
//!
//! ```rust
//! use loom_primitives::hash::DigestEngine;
//! use loom_primitives::spec::DigestType;
//!
//! let mut engine = DigestEngine::new(DigestType::Sha256);
//! engine.update(b"a");
//! engine.update(b"bc");
//! let digest = engine.finish();
//! assert_eq!(digest, DigestEngine::digest_bytes(DigestType::Sha256, b"abc"));
//! ```

use crate::spec::DigestType;
use digest::DynDigest;
use loom_prelude::prelude::{LoomError, Result};
use std::fmt;

/// Run `$body` with `$d` bound to the concrete hash type of a [`DigestType`].
///
/// Used where a generic third-party API needs the digest as a type
/// parameter (HMAC, HKDF, PSS, RFC 6979).
macro_rules! with_digest {
    ($digest:expr, $d:ident => $body:expr) => {
        match $digest {
            $crate::spec::DigestType::Sha1 => {
                type $d = sha1::Sha1;
                $body
            }
            $crate::spec::DigestType::Sha224 => {
                type $d = sha2::Sha224;
                $body
            }
            $crate::spec::DigestType::Sha256 => {
                type $d = sha2::Sha256;
                $body
            }
            $crate::spec::DigestType::Sha384 => {
                type $d = sha2::Sha384;
                $body
            }
            $crate::spec::DigestType::Sha512 => {
                type $d = sha2::Sha512;
                $body
            }
            $crate::spec::DigestType::Sha512_224 => {
                type $d = sha2::Sha512_224;
                $body
            }
            $crate::spec::DigestType::Sha512_256 => {
                type $d = sha2::Sha512_256;
                $body
            }
            $crate::spec::DigestType::Sha3_224 => {
                type $d = sha3::Sha3_224;
                $body
            }
            $crate::spec::DigestType::Sha3_256 => {
                type $d = sha3::Sha3_256;
                $body
            }
            $crate::spec::DigestType::Sha3_384 => {
                type $d = sha3::Sha3_384;
                $body
            }
            $crate::spec::DigestType::Sha3_512 => {
                type $d = sha3::Sha3_512;
                $body
            }
            $crate::spec::DigestType::Blake2b512 => {
                type $d = blake2::Blake2b512;
                $body
            }
            $crate::spec::DigestType::Blake2s256 => {
                type $d = blake2::Blake2s256;
                $body
            }
            $crate::spec::DigestType::Sm3 => {
                type $d = sm3::Sm3;
                $body
            }
        }
    };
}
pub(crate) use with_digest;

pub(crate) fn boxed(digest_type: DigestType) -> Box<dyn DynDigest + Send + Sync> {
    with_digest!(digest_type, D => {
        let inner: Box<dyn DynDigest + Send + Sync> = Box::new(<D as Default>::default());
        inner
    })
}

/// Streaming digest engine.
pub struct DigestEngine {
    digest_type: DigestType,
    inner: Box<dyn DynDigest + Send + Sync>,
}

impl DigestEngine {
    /// Create an engine for the given digest.
    #[must_use]
    pub fn new(digest_type: DigestType) -> Self {
        Self { digest_type, inner: boxed(digest_type) }
    }

    /// One-shot digest of `data`.
    #[must_use]
    pub fn digest_bytes(digest_type: DigestType, data: &[u8]) -> Vec<u8> {
        let mut engine = Self::new(digest_type);
        engine.update(data);
        engine.finish()
    }

    /// The digest this engine computes.
    #[must_use]
    pub fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    /// Output size in bytes.
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.digest_type.output_len()
    }

    /// Absorb a slice.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Absorb a single byte.
    pub fn update_byte(&mut self, byte: u8) {
        self.inner.update(&[byte]);
    }

    /// Discard everything absorbed so far.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Finalize, returning the digest and resetting the engine.
    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        self.inner.finalize_reset().into_vec()
    }

    /// Finalize into `out`, returning the number of bytes written.
    ///
    /// # Errors
    /// Returns [`LoomError::DataLength`] if `out` is shorter than the digest;
    /// the absorbed state is kept in that case.
    pub fn finish_into(&mut self, out: &mut [u8]) -> Result<usize> {
        let len = self.output_len();
        let out_len = out.len();
        let target = out.get_mut(..len).ok_or_else(|| {
            LoomError::DataLength(format!(
                "{} output needs {len} bytes, buffer has {}",
                self.digest_type,
                out_len
            ))
        })?;
        target.copy_from_slice(&self.inner.finalize_reset());
        Ok(len)
    }
}

impl fmt::Debug for DigestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestEngine").field("digest_type", &self.digest_type).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_sha256_abc_vector() {
        // FIPS 180-4 example
        let expected = hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(DigestEngine::digest_bytes(DigestType::Sha256, b"abc"), expected);
    }

    #[test]
    fn test_sha3_256_empty_vector() {
        let expected = hex!("a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a");
        assert_eq!(DigestEngine::digest_bytes(DigestType::Sha3_256, b""), expected);
    }

    #[test]
    fn test_sm3_abc_vector() {
        // GB/T 32905 example 1
        let expected = hex!("66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0");
        assert_eq!(DigestEngine::digest_bytes(DigestType::Sm3, b"abc"), expected);
    }

    #[test]
    fn test_output_length_matches_spec() {
        for digest in DigestType::ALL {
            assert_eq!(DigestEngine::digest_bytes(digest, b"x").len(), digest.output_len(), "{digest}");
        }
    }

    #[test]
    fn test_finish_resets_state() {
        let mut engine = DigestEngine::new(DigestType::Sha512);
        engine.update(b"first");
        let first = engine.finish();
        engine.update(b"first");
        assert_eq!(engine.finish(), first);
    }

    #[test]
    fn test_reset_discards_input() {
        let mut engine = DigestEngine::new(DigestType::Blake2b512);
        engine.update(b"noise");
        engine.reset();
        engine.update_byte(b'a');
        assert_eq!(engine.finish(), DigestEngine::digest_bytes(DigestType::Blake2b512, b"a"));
    }

    #[test]
    fn test_finish_into_short_buffer() {
        let mut engine = DigestEngine::new(DigestType::Sha256);
        engine.update(b"abc");
        let mut small = [0u8; 16];
        assert!(matches!(engine.finish_into(&mut small), Err(LoomError::DataLength(_))));

        let mut out = [0u8; 40];
        assert_eq!(engine.finish_into(&mut out).unwrap(), 32);
        assert_eq!(&out[..32], DigestEngine::digest_bytes(DigestType::Sha256, b"abc").as_slice());
    }
}
