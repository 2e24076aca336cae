#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Symmetric Cipher Engines
//!
//! Every cipher engine follows the same lifecycle:
//!
//! 1. `init(encrypt, key, iv)` binds a key and direction. On encrypt an
//!    omitted IV is drawn from the shared random source and handed back.
//! 2. `update` processes as much input as the mode allows and writes it to
//!    the output buffer, possibly zero bytes.
//! 3. `finish` flushes the buffered tail (applying or stripping padding,
//!    emitting or checking the AEAD tag). The engine must then be
//!    re-initialised before further use.
//!
//! ## Engines
//!
//! - [`BlockCipherEngine`]: block cipher + ECB/CBC/CTR/CFB/OFB + padding
//! - [`AeadCipherEngine`]: AES-GCM, ChaCha20-Poly1305, XChaCha20-Poly1305
//! - [`StreamCipherEngine`]: ChaCha20, XChaCha20, Salsa20, XSalsa20, HC-256, Rabbit
//! - [`KeyWrapper`]: AES-KW / AES-KWP for keys and private keys

pub mod aead;
pub(crate) mod block;
pub mod mode;
pub mod stream;
pub mod wrap;

pub use aead::AeadCipherEngine;
pub use mode::BlockCipherEngine;
pub use stream::StreamCipherEngine;
pub use wrap::KeyWrapper;

use crate::keys::Key;
use loom_prelude::prelude::{LoomError, Result};

/// Common contract of every symmetric cipher engine.
pub trait Cipher {
    /// Bind a key and direction.
    ///
    /// Returns the IV in effect, which on encrypt may have been generated.
    /// Ciphers without an IV return `None`.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a key of the wrong type or length,
    /// [`LoomError::InvalidParameter`] for a bad or missing IV.
    fn init(&mut self, encrypt: bool, key: &Key, iv: Option<&[u8]>) -> Result<Option<Vec<u8>>>;

    /// Bytes the next `update` with `len` input bytes may write.
    fn update_output_length(&self, len: usize) -> usize;

    /// Bytes `update` plus `finish` may write for `len` more input bytes.
    fn output_length(&self, len: usize) -> usize;

    /// Process input, returning the number of bytes written to `output`.
    ///
    /// # Errors
    /// [`LoomError::State`] before init or after finish,
    /// [`LoomError::DataLength`] if `output` is too short.
    fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Flush buffered data, returning the number of bytes written.
    ///
    /// `output` must hold `output_length(0)` bytes. A shorter buffer is
    /// rejected before anything is consumed, so the call can be retried.
    ///
    /// # Errors
    /// [`LoomError::DataLength`] for a short `output`, an unaligned tail
    /// without padding or a corrupt pad. [`LoomError::Authentication`] for an AEAD tag mismatch.
    fn finish(&mut self, output: &mut [u8]) -> Result<usize>;

    /// One-shot `update` + `finish` over a whole message.
    ///
    /// # Errors
    /// Any error from `update` or `finish`.
    fn process(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = vec![0u8; self.output_length(input.len())];
        let written = self.update(input, &mut output)?;
        let tail = output.get_mut(written..).ok_or_else(|| short_output(written, 0))?;
        let flushed = self.finish(tail)?;
        output.truncate(written + flushed);
        Ok(output)
    }
}

/// Cipher that also authenticates associated data.
pub trait AeadCipher: Cipher {
    /// Absorb associated data. Only allowed before the first `update`.
    ///
    /// # Errors
    /// [`LoomError::State`] once ciphertext processing has begun.
    fn update_aad(&mut self, aad: &[u8]) -> Result<()>;
}

/// Lifecycle shared by the cipher engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Uninitialized,
    Active,
    Finished,
}

impl Phase {
    pub(crate) fn require_active(self, operation: &str) -> Result<()> {
        match self {
            Self::Active => Ok(()),
            Self::Uninitialized => {
                Err(LoomError::State(format!("{operation} called before init")))
            }
            Self::Finished => {
                Err(LoomError::State(format!("{operation} called after finish")))
            }
        }
    }
}

pub(crate) fn short_output(needed: usize, available: usize) -> LoomError {
    LoomError::DataLength(format!("output buffer too short: need {needed}, have {available}"))
}

/// Resolve the IV for an init call: validate a supplied one, generate one on
/// encrypt, fail on decrypt.
pub(crate) fn resolve_iv(
    iv: Option<&[u8]>,
    iv_len: usize,
    encrypt: bool,
    random: &crate::rand::SecureRandom,
) -> Result<Option<Vec<u8>>> {
    if iv_len == 0 {
        return match iv {
            Some(bytes) if !bytes.is_empty() => Err(LoomError::InvalidParameter(
                "cipher takes no IV".to_string(),
            )),
            _ => Ok(None),
        };
    }
    match iv {
        Some(bytes) if bytes.len() == iv_len => Ok(Some(bytes.to_vec())),
        Some(bytes) => Err(LoomError::InvalidParameter(format!(
            "IV must be {iv_len} bytes, got {}",
            bytes.len()
        ))),
        None if encrypt => Ok(Some(random.bytes(iv_len))),
        None => Err(LoomError::InvalidParameter("decryption requires the IV".to_string())),
    }
}
