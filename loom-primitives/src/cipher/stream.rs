//! Stream cipher engine.
//!
//! Keystream ciphers need no buffering: `output_length(n) == n` and `finish`
//! writes nothing.

use super::{resolve_iv, short_output, Cipher, Phase};
use crate::keys::{Key, KeyType};
use crate::rand::SecureRandom;
use crate::spec::{StreamCipherSpec, StreamKeyType};
use cipher::{KeyIvInit, StreamCipher};
use loom_prelude::prelude::{LoomError, Result};
use std::fmt;
use tracing::instrument;

enum Keystream {
    ChaCha20(chacha20::ChaCha20),
    XChaCha20(chacha20::XChaCha20),
    Salsa20(salsa20::Salsa20),
    XSalsa20(salsa20::XSalsa20),
    Hc256(hc_256::Hc256),
    Rabbit(rabbit::Rabbit),
}

impl Keystream {
    fn new(key_type: StreamKeyType, key: &[u8], iv: &[u8]) -> Result<Self> {
        let keystream = match key_type {
            StreamKeyType::ChaCha20 => Self::ChaCha20(KeyIvInit::new_from_slices(key, iv)?),
            StreamKeyType::XChaCha20 => Self::XChaCha20(KeyIvInit::new_from_slices(key, iv)?),
            StreamKeyType::Salsa20 => Self::Salsa20(KeyIvInit::new_from_slices(key, iv)?),
            StreamKeyType::XSalsa20 => Self::XSalsa20(KeyIvInit::new_from_slices(key, iv)?),
            StreamKeyType::Hc256 => Self::Hc256(KeyIvInit::new_from_slices(key, iv)?),
            StreamKeyType::Rabbit => Self::Rabbit(KeyIvInit::new_from_slices(key, iv)?),
        };
        Ok(keystream)
    }

    fn apply(&mut self, buf: &mut [u8]) {
        match self {
            Self::ChaCha20(c) => c.apply_keystream(buf),
            Self::XChaCha20(c) => c.apply_keystream(buf),
            Self::Salsa20(c) => c.apply_keystream(buf),
            Self::XSalsa20(c) => c.apply_keystream(buf),
            Self::Hc256(c) => c.apply_keystream(buf),
            Self::Rabbit(c) => c.apply_keystream(buf),
        }
    }
}

/// Keystream cipher bound to one [`StreamKeyType`].
pub struct StreamCipherEngine {
    key_type: StreamKeyType,
    random: SecureRandom,
    phase: Phase,
    keystream: Option<Keystream>,
}

impl StreamCipherEngine {
    /// Create an engine for a non-AEAD stream spec.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for an AEAD spec, which is served
    /// by [`super::AeadCipherEngine`].
    pub fn new(spec: StreamCipherSpec, random: SecureRandom) -> Result<Self> {
        if spec.aead {
            return Err(LoomError::unsupported(spec));
        }
        Ok(Self { key_type: spec.key_type, random, phase: Phase::Uninitialized, keystream: None })
    }

    /// The cipher this engine runs.
    #[must_use]
    pub fn key_type(&self) -> StreamKeyType {
        self.key_type
    }
}

impl Cipher for StreamCipherEngine {
    #[instrument(level = "debug", skip(self, key, iv), fields(cipher = %self.key_type, encrypt = encrypt))]
    fn init(&mut self, encrypt: bool, key: &Key, iv: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        key.expect_type(KeyType::Stream(self.key_type))?;
        let iv = resolve_iv(iv, self.key_type.iv_len(), encrypt, &self.random)?;
        self.keystream = Some(Keystream::new(
            self.key_type,
            key.as_bytes(),
            iv.as_deref().unwrap_or_default(),
        )?);
        self.phase = Phase::Active;
        Ok(iv)
    }

    fn update_output_length(&self, len: usize) -> usize {
        len
    }

    fn output_length(&self, len: usize) -> usize {
        len
    }

    fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        self.phase.require_active("update")?;
        let output_len = output.len();
        let out = output
            .get_mut(..input.len())
            .ok_or_else(|| short_output(input.len(), output_len))?;
        out.copy_from_slice(input);
        if let Some(keystream) = self.keystream.as_mut() {
            keystream.apply(out);
        }
        Ok(input.len())
    }

    fn finish(&mut self, _output: &mut [u8]) -> Result<usize> {
        self.phase.require_active("finish")?;
        self.phase = Phase::Finished;
        Ok(0)
    }
}

impl fmt::Debug for StreamCipherEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCipherEngine")
            .field("key_type", &self.key_type)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn engine(key_type: StreamKeyType) -> StreamCipherEngine {
        StreamCipherEngine::new(StreamCipherSpec::stream(key_type), SecureRandom::new().unwrap())
            .unwrap()
    }

    #[test]
    fn test_chacha20_rfc8439_keystream() {
        // RFC 8439 A.1 test vector 1
        let mut chacha = engine(StreamKeyType::ChaCha20);
        let key = Key::new(KeyType::Stream(StreamKeyType::ChaCha20), &[0u8; 32]).unwrap();
        chacha.init(true, &key, Some(&[0u8; 12])).unwrap();
        let out = chacha.process(&[0u8; 32]).unwrap();
        assert_eq!(out, hex!("76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7"));
    }

    #[test]
    fn test_round_trip_every_cipher() {
        let random = SecureRandom::new().unwrap();
        for key_type in StreamKeyType::ALL {
            let key = Key::new(KeyType::Stream(key_type), &random.bytes(key_type.key_len())).unwrap();
            let plain = random.bytes(100);

            let mut enc = engine(key_type);
            let iv = enc.init(true, &key, None).unwrap();
            assert_eq!(iv.as_ref().map(Vec::len), Some(key_type.iv_len()), "{key_type}");
            let ct = enc.process(&plain).unwrap();
            assert_eq!(ct.len(), plain.len());
            assert_ne!(ct, plain);

            let mut dec = engine(key_type);
            dec.init(false, &key, iv.as_deref()).unwrap();
            assert_eq!(dec.process(&ct).unwrap(), plain, "{key_type}");
        }
    }

    #[test]
    fn test_chunked_updates_match_one_shot() {
        let key = Key::new(KeyType::Stream(StreamKeyType::Salsa20), &[3u8; 32]).unwrap();
        let iv = [1u8; 8];
        let data = [0x5Au8; 70];

        let mut one = engine(StreamKeyType::Salsa20);
        one.init(true, &key, Some(&iv)).unwrap();
        let expected = one.process(&data).unwrap();

        let mut chunked = engine(StreamKeyType::Salsa20);
        chunked.init(true, &key, Some(&iv)).unwrap();
        let mut out = vec![0u8; 70];
        let mut n = 0;
        for chunk in data.chunks(13) {
            n += chunked.update(chunk, &mut out[n..]).unwrap();
        }
        assert_eq!(chunked.finish(&mut []).unwrap(), 0);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_wrong_iv_length() {
        let mut rabbit = engine(StreamKeyType::Rabbit);
        let key = Key::new(KeyType::Stream(StreamKeyType::Rabbit), &[0u8; 16]).unwrap();
        assert!(matches!(rabbit.init(true, &key, Some(&[0u8; 12])), Err(LoomError::InvalidParameter(_))));
    }

    #[test]
    fn test_aead_spec_rejected() {
        let spec = StreamCipherSpec::aead(StreamKeyType::ChaCha20);
        assert!(StreamCipherEngine::new(spec, SecureRandom::new().unwrap()).is_err());
    }
}
