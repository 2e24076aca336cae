//! cipherloom prelude crate
//!
//! Shared foundation for the cipherloom workspace: the error taxonomy every
//! engine reports through, conversions from third-party error types, and the
//! domain-separation labels used when secrets are expanded into keys.
//!
//! # Example
//!
//! ```rust
//! use loom_prelude::prelude::{LoomError, Result};
//!
//! fn check_tag(expected: &[u8], actual: &[u8]) -> Result<()> {
//!     if expected == actual {
//!         Ok(())
//!     } else {
//!         Err(LoomError::Authentication("tag mismatch".to_string()))
//!     }
//! }
//! # assert!(check_tag(b"a", b"a").is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Prelude module containing the commonly used types.
pub mod prelude;

pub use prelude::*;
