#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Shared Secure Random Source
//!
//! A single ChaCha20 DRBG seeded from the operating system. The factory owns
//! one [`SecureRandom`]; every engine it creates holds a clone of the handle,
//! so all randomness in a factory comes from the same generator. Draws are
//! serialised through a mutex.

use loom_prelude::prelude::{LoomError, Result};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Cloneable handle to the shared DRBG.
#[derive(Clone)]
pub struct SecureRandom {
    inner: Arc<Mutex<ChaCha20Rng>>,
}

impl SecureRandom {
    /// Seed a fresh generator from the operating system.
    ///
    /// # Errors
    /// Returns [`LoomError::Random`] if the OS entropy source fails.
    pub fn new() -> Result<Self> {
        let rng = ChaCha20Rng::from_rng(OsRng).map_err(|e| LoomError::Random(e.to_string()))?;
        Ok(Self { inner: Arc::new(Mutex::new(rng)) })
    }

    /// Deterministic generator for reproducible test vectors.
    ///
    /// Never use outside tests: every handle built from the same seed yields
    /// the same stream.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { inner: Arc::new(Mutex::new(ChaCha20Rng::from_seed(seed))) }
    }

    /// Fill `dest` with random bytes.
    pub fn fill(&self, dest: &mut [u8]) {
        self.inner.lock().fill_bytes(dest);
    }

    /// Draw `count` random bytes.
    #[must_use]
    pub fn bytes(&self, count: usize) -> Vec<u8> {
        let mut out = vec![0u8; count];
        self.fill(&mut out);
        out
    }

    /// Draw `count` random bytes destined to become secret material.
    #[must_use]
    pub fn secret_bytes(&self, count: usize) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![0u8; count]);
        self.fill(&mut out);
        out
    }

    /// Draw a fixed-size array.
    #[must_use]
    pub fn array<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        self.fill(&mut out);
        out
    }
}

impl fmt::Debug for SecureRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureRandom").finish_non_exhaustive()
    }
}

impl RngCore for SecureRandom {
    fn next_u32(&mut self) -> u32 {
        self.inner.lock().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.lock().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.lock().fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
        self.inner.lock().try_fill_bytes(dest)
    }
}

impl CryptoRng for SecureRandom {}
