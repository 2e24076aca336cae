//! # cipherloom Logging
//!
//! Engines emit `tracing` spans and events carrying algorithm names and
//! lengths only. This module installs a subscriber for applications that
//! have none. Public protocol material such as KEM ciphertexts is logged as
//! a [`fingerprint`] so both ends of an exchange can be matched up in the
//! logs without dumping the bytes.
//!
//! ```rust,no_run
//! use loom_core::logging::{fingerprint, init_tracing};
//!
//! init_tracing().expect("no subscriber installed yet");
//! tracing::info!(ciphertext = %fingerprint(&[0u8; 48]), "encapsulated");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use blake2::{Blake2s256, Digest};
use std::fmt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "loom_core=info,loom_primitives=info";

/// Install a compact fmt subscriber filtered by `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .try_init()?;

    info!("cipherloom logging initialized");
    Ok(())
}

/// Bytes of BLAKE2s output kept in a [`Fingerprint`].
pub const FINGERPRINT_LEN: usize = 8;

/// Render public bytes as their length and a truncated BLAKE2s digest.
///
/// Only for material that is already public. A fingerprint of a secret is
/// a hash of that secret and must not be logged.
#[must_use]
pub fn fingerprint(data: &[u8]) -> Fingerprint {
    let digest = Blake2s256::digest(data);
    let mut prefix = [0u8; FINGERPRINT_LEN];
    for (dst, src) in prefix.iter_mut().zip(digest.iter()) {
        *dst = *src;
    }
    Fingerprint { len: data.len(), prefix }
}

/// Length plus digest prefix, displayed as `48B:1f2e3d4c5b6a7988`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    len: usize,
    prefix: [u8; FINGERPRINT_LEN],
}

impl Fingerprint {
    /// Length of the fingerprinted input.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the input was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B:{}", self.len, hex::encode(self.prefix))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}
