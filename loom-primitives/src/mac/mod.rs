#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Message Authentication Codes
//!
//! [`MacEngine`] drives every [`MacSpec`] through one init/update/finish
//! contract:
//!
//! - **HMAC** over any [`crate::spec::DigestType`] (`hmac::SimpleHmac`)
//! - **CMAC** over any block cipher (NIST SP 800-38B)
//! - **GMAC** over AES-128/256 (aws-lc-rs GCM with an empty plaintext)
//! - **Poly1305**, raw or cipher-keyed (Poly1305-AES style)
//! - **BLAKE2b-MAC** / **BLAKE2s-MAC** (keyed BLAKE2)
//!
//! After `finish` the engine must be re-initialised; the key is not
//! retained once the tag has been produced.

mod cmac;
mod gmac;
mod hmac;
mod poly1305;

use crate::hash::with_digest;
use crate::keys::{Key, KeyType};
use crate::spec::MacSpec;
use loom_prelude::prelude::{LoomError, Result};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::instrument;

/// A running MAC computation.
pub(crate) trait MacCore: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Result<Vec<u8>>;
}

enum MacState {
    Uninitialized,
    Active(Box<dyn MacCore>),
    Finished,
}

/// Keyed authenticator for one [`MacSpec`].
pub struct MacEngine {
    spec: MacSpec,
    state: MacState,
}

impl MacEngine {
    /// Create an engine for `spec`.
    ///
    /// # Errors
    /// [`LoomError::UnsupportedAlgorithm`] for an inconsistent spec.
    pub fn new(spec: MacSpec) -> Result<Self> {
        if !spec.is_consistent() {
            return Err(LoomError::unsupported(spec));
        }
        Ok(Self { spec, state: MacState::Uninitialized })
    }

    /// The spec this engine computes.
    #[must_use]
    pub fn spec(&self) -> MacSpec {
        self.spec
    }

    /// Tag length in bytes.
    #[must_use]
    pub fn mac_len(&self) -> usize {
        self.spec.mac_len()
    }

    /// Bind a key (and IV, for GMAC and cipher-keyed Poly1305).
    ///
    /// Resets any accumulated input.
    ///
    /// # Errors
    /// [`LoomError::InvalidKey`] for a key of another type,
    /// [`LoomError::InvalidParameter`] for a missing or mis-sized IV.
    #[instrument(level = "debug", skip(self, key, iv), fields(spec = %self.spec))]
    pub fn init(&mut self, key: &Key, iv: Option<&[u8]>) -> Result<()> {
        key.expect_type(KeyType::Mac(self.spec))?;
        let iv = match (self.spec.iv_len(), iv) {
            (0, None) => &[][..],
            (0, Some(bytes)) if bytes.is_empty() => bytes,
            (0, Some(_)) => {
                return Err(LoomError::InvalidParameter(format!("{} takes no IV", self.spec)));
            }
            (len, Some(bytes)) if bytes.len() == len => bytes,
            (len, _) => {
                return Err(LoomError::InvalidParameter(format!(
                    "{} requires a {len}-byte IV",
                    self.spec
                )));
            }
        };
        let bytes = key.as_bytes();
        let core: Box<dyn MacCore> = match self.spec {
            MacSpec::Hmac(digest) => with_digest!(digest, D => {
                let core: Box<dyn MacCore> =
                    Box::new(hmac::KeyedMac::<::hmac::SimpleHmac<D>>::new(bytes)?);
                core
            }),
            MacSpec::Blake2b => Box::new(hmac::KeyedMac::<blake2::Blake2bMac512>::new(bytes)?),
            MacSpec::Blake2s => Box::new(hmac::KeyedMac::<blake2::Blake2sMac256>::new(bytes)?),
            MacSpec::Cmac(spec) => Box::new(cmac::Cmac::new(spec, bytes)?),
            MacSpec::Gmac(spec) => Box::new(gmac::Gmac::new(spec, bytes, iv)?),
            MacSpec::Poly1305 => Box::new(poly1305::Poly1305Mac::new(bytes)?),
            MacSpec::Poly1305Cipher(spec) => {
                Box::new(poly1305::Poly1305Mac::with_cipher(spec, bytes, iv)?)
            }
        };
        self.state = MacState::Active(core);
        Ok(())
    }

    fn core(&mut self, operation: &str) -> Result<&mut Box<dyn MacCore>> {
        match &mut self.state {
            MacState::Active(core) => Ok(core),
            MacState::Uninitialized => {
                Err(LoomError::State(format!("MAC {operation} called before init")))
            }
            MacState::Finished => {
                Err(LoomError::State(format!("MAC {operation} called after finish")))
            }
        }
    }

    /// Absorb a slice.
    ///
    /// # Errors
    /// [`LoomError::State`] before init or after finish.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        self.core("update")?.update(data);
        Ok(())
    }

    /// Absorb a single byte.
    ///
    /// # Errors
    /// [`LoomError::State`] before init or after finish.
    pub fn update_byte(&mut self, byte: u8) -> Result<()> {
        self.update(&[byte])
    }

    /// Produce the tag.
    ///
    /// # Errors
    /// [`LoomError::State`] before init or after finish.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.core("finish")?;
        match std::mem::replace(&mut self.state, MacState::Finished) {
            MacState::Active(core) => core.finalize(),
            _ => Err(LoomError::State("MAC finish called before init".to_string())),
        }
    }

    /// Absorb `data` and produce the tag in one call.
    ///
    /// # Errors
    /// Same as [`Self::finish`].
    pub fn compute(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.update(data)?;
        self.finish()
    }

    /// Absorb `data` and compare the tag against `expected` in constant
    /// time.
    ///
    /// # Errors
    /// Same as [`Self::finish`]; a wrong tag is `Ok(false)`.
    pub fn verify(&mut self, data: &[u8], expected: &[u8]) -> Result<bool> {
        let tag = self.compute(data)?;
        Ok(bool::from(tag.ct_eq(expected)))
    }
}

impl fmt::Debug for MacEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.state {
            MacState::Uninitialized => "uninitialized",
            MacState::Active(_) => "active",
            MacState::Finished => "finished",
        };
        f.debug_struct("MacEngine").field("spec", &self.spec).field("phase", &phase).finish()
    }
}
