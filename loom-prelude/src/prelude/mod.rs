//! cipherloom prelude module
//!
//! Error handling and domain constants used by every other workspace crate.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Domain separation labels for HKDF expansion.
pub mod domains;
/// Error taxonomy and conversions.
pub mod error;

pub use error::{LoomError, Result};

/// Length in bytes of the init vector that prefixes every KEM ciphertext and
/// agreement message.
pub const INIT_VECTOR_LEN: usize = 16;
