//! Authenticated encryption engines.
//!
//! AES-GCM goes through aws-lc-rs, the ChaCha family through
//! `chacha20poly1305`. Both directions buffer the whole message until
//! `finish`: on decrypt no plaintext is released before the tag verifies.

use super::{resolve_iv, short_output, AeadCipher, Cipher, Phase};
use crate::keys::{Key, KeyType};
use crate::rand::SecureRandom;
use crate::spec::{CipherMode, KeyLength, StreamCipherSpec, StreamKeyType, SymCipherSpec, SymKeySpec};
use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce as AwsNonce, UnboundKey, AES_128_GCM, AES_256_GCM};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, XChaCha20Poly1305};
use loom_prelude::prelude::{LoomError, Result};
use std::fmt;
use tracing::instrument;
use zeroize::Zeroizing;

/// AEAD tag length for every supported algorithm.
pub const TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AeadAlgorithm {
    Gcm(SymKeySpec),
    ChaCha20Poly1305,
    XChaCha20Poly1305,
}

impl AeadAlgorithm {
    fn nonce_len(self) -> usize {
        match self {
            Self::Gcm(_) | Self::ChaCha20Poly1305 => 12,
            Self::XChaCha20Poly1305 => 24,
        }
    }

    fn key_type(self) -> KeyType {
        match self {
            Self::Gcm(spec) => KeyType::Symmetric(spec),
            Self::ChaCha20Poly1305 => KeyType::Stream(StreamKeyType::ChaCha20),
            Self::XChaCha20Poly1305 => KeyType::Stream(StreamKeyType::XChaCha20),
        }
    }
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gcm(spec) => write!(f, "{spec}/GCM"),
            Self::ChaCha20Poly1305 => f.write_str("ChaCha20-Poly1305"),
            Self::XChaCha20Poly1305 => f.write_str("XChaCha20-Poly1305"),
        }
    }
}

/// Buffered AEAD cipher.
pub struct AeadCipherEngine {
    algorithm: AeadAlgorithm,
    random: SecureRandom,
    phase: Phase,
    encrypt: bool,
    key: Zeroizing<Vec<u8>>,
    nonce: Vec<u8>,
    aad: Vec<u8>,
    data: Zeroizing<Vec<u8>>,
    data_started: bool,
    last_encryption: Option<(Key, Vec<u8>)>,
}

impl AeadCipherEngine {
    fn with_algorithm(algorithm: AeadAlgorithm, random: SecureRandom) -> Self {
        Self {
            algorithm,
            random,
            phase: Phase::Uninitialized,
            encrypt: true,
            key: Zeroizing::new(Vec::new()),
            nonce: Vec::new(),
            aad: Vec::new(),
            data: Zeroizing::new(Vec::new()),
            data_started: false,
            last_encryption: None,
        }
    }

    /// AES-GCM engine for a `…/GCM/NoPadding` spec.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] unless the spec is AES-128 or
    /// AES-256 in GCM mode without padding.
    pub fn gcm(spec: SymCipherSpec, random: SecureRandom) -> Result<Self> {
        if spec.mode != CipherMode::Gcm || !spec.is_consistent() {
            return Err(LoomError::unsupported(spec));
        }
        Ok(Self::with_algorithm(AeadAlgorithm::Gcm(spec.key_spec), random))
    }

    /// ChaCha20-Poly1305 or XChaCha20-Poly1305 engine.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for a non-AEAD stream spec.
    pub fn stream(spec: StreamCipherSpec, random: SecureRandom) -> Result<Self> {
        let algorithm = match (spec.aead, spec.key_type) {
            (true, StreamKeyType::ChaCha20) => AeadAlgorithm::ChaCha20Poly1305,
            (true, StreamKeyType::XChaCha20) => AeadAlgorithm::XChaCha20Poly1305,
            _ => return Err(LoomError::unsupported(spec)),
        };
        Ok(Self::with_algorithm(algorithm, random))
    }

    /// Nonce length in bytes.
    #[must_use]
    pub fn nonce_len(&self) -> usize {
        self.algorithm.nonce_len()
    }

    fn seal(&self) -> Result<Vec<u8>> {
        match self.algorithm {
            AeadAlgorithm::Gcm(spec) => {
                let key = gcm_key(spec, &self.key)?;
                let nonce = AwsNonce::try_assume_unique_for_key(&self.nonce)
                    .map_err(|_| LoomError::InvalidParameter("GCM nonce".to_string()))?;
                let mut in_out = self.data.to_vec();
                key.seal_in_place_append_tag(nonce, Aad::from(self.aad.as_slice()), &mut in_out)
                    .map_err(|e| LoomError::operation("AES-GCM seal", e))?;
                Ok(in_out)
            }
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&self.key)?
                .encrypt(self.nonce.as_slice().into(), self.payload())
                .map_err(|e| LoomError::operation("ChaCha20-Poly1305 seal", e)),
            AeadAlgorithm::XChaCha20Poly1305 => XChaCha20Poly1305::new_from_slice(&self.key)?
                .encrypt(self.nonce.as_slice().into(), self.payload())
                .map_err(|e| LoomError::operation("XChaCha20-Poly1305 seal", e)),
        }
    }

    fn open(&self) -> Result<Zeroizing<Vec<u8>>> {
        if self.data.len() < TAG_LEN {
            return Err(LoomError::Authentication("ciphertext shorter than tag".to_string()));
        }
        let plain = match self.algorithm {
            AeadAlgorithm::Gcm(spec) => {
                let key = gcm_key(spec, &self.key)?;
                let nonce = AwsNonce::try_assume_unique_for_key(&self.nonce)
                    .map_err(|_| LoomError::InvalidParameter("GCM nonce".to_string()))?;
                let mut in_out = Zeroizing::new(self.data.to_vec());
                let len = key
                    .open_in_place(nonce, Aad::from(self.aad.as_slice()), &mut in_out)
                    .map_err(|_| LoomError::Authentication("AES-GCM tag mismatch".to_string()))?
                    .len();
                in_out.truncate(len);
                return Ok(in_out);
            }
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&self.key)?
                .decrypt(self.nonce.as_slice().into(), self.payload())?,
            AeadAlgorithm::XChaCha20Poly1305 => XChaCha20Poly1305::new_from_slice(&self.key)?
                .decrypt(self.nonce.as_slice().into(), self.payload())?,
        };
        Ok(Zeroizing::new(plain))
    }

    fn payload(&self) -> Payload<'_, '_> {
        Payload { msg: &self.data, aad: &self.aad }
    }
}

fn gcm_key(spec: SymKeySpec, key: &[u8]) -> Result<LessSafeKey> {
    let algorithm = match spec.key_length {
        KeyLength::Len128 => &AES_128_GCM,
        _ => &AES_256_GCM,
    };
    let unbound = UnboundKey::new(algorithm, key)
        .map_err(|_| LoomError::InvalidKey(format!("{spec} GCM key")))?;
    Ok(LessSafeKey::new(unbound))
}

impl Cipher for AeadCipherEngine {
    #[instrument(level = "debug", skip(self, key, iv), fields(algorithm = %self.algorithm, encrypt = encrypt))]
    fn init(&mut self, encrypt: bool, key: &Key, iv: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
        key.expect_type(self.algorithm.key_type())?;
        let nonce = resolve_iv(iv, self.algorithm.nonce_len(), encrypt, &self.random)?
            .unwrap_or_default();
        if encrypt {
            if let Some((last_key, last_nonce)) = &self.last_encryption {
                if last_key == key && *last_nonce == nonce {
                    return Err(LoomError::InvalidParameter(
                        "nonce reused with the same key".to_string(),
                    ));
                }
            }
            self.last_encryption = Some((key.clone(), nonce.clone()));
        }
        self.encrypt = encrypt;
        self.key = Zeroizing::new(key.as_bytes().to_vec());
        self.nonce = nonce.clone();
        self.aad.clear();
        self.data = Zeroizing::new(Vec::new());
        self.data_started = false;
        self.phase = Phase::Active;
        Ok(Some(nonce))
    }

    fn update_output_length(&self, _len: usize) -> usize {
        0
    }

    fn output_length(&self, len: usize) -> usize {
        let total = self.data.len() + len;
        if self.encrypt {
            total + TAG_LEN
        } else {
            total.saturating_sub(TAG_LEN)
        }
    }

    fn update(&mut self, input: &[u8], _output: &mut [u8]) -> Result<usize> {
        self.phase.require_active("update")?;
        self.data_started = true;
        self.data.extend_from_slice(input);
        Ok(0)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<usize> {
        self.phase.require_active("finish")?;
        let needed = self.output_length(0);
        if output.len() < needed {
            return Err(short_output(needed, output.len()));
        }
        self.phase = Phase::Finished;
        self.data_started = true;
        let result: Zeroizing<Vec<u8>> =
            if self.encrypt { Zeroizing::new(self.seal()?) } else { self.open()? };
        self.data = Zeroizing::new(Vec::new());
        let output_len = output.len();
        let out = output
            .get_mut(..result.len())
            .ok_or_else(|| short_output(result.len(), output_len))?;
        out.copy_from_slice(&result);
        Ok(result.len())
    }
}

impl AeadCipher for AeadCipherEngine {
    fn update_aad(&mut self, aad: &[u8]) -> Result<()> {
        self.phase.require_active("update_aad")?;
        if self.data_started {
            return Err(LoomError::State(
                "associated data must precede the message".to_string(),
            ));
        }
        self.aad.extend_from_slice(aad);
        Ok(())
    }
}

impl fmt::Debug for AeadCipherEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadCipherEngine")
            .field("algorithm", &self.algorithm)
            .field("phase", &self.phase)
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
