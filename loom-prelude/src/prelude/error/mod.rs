//! Error Taxonomy for cipherloom
//!
//! Every engine in the workspace reports failure through [`LoomError`]. The
//! variants follow the classes a caller has to tell apart:
//!
//! - [`LoomError::Parse`]: malformed encoded key or signature structure
//! - [`LoomError::InvalidKey`]: wrong key type, size, or failed domain check
//! - [`LoomError::State`]: operation invoked in the wrong lifecycle phase
//! - [`LoomError::UnsupportedAlgorithm`]: spec rejected by a factory predicate
//! - [`LoomError::Authentication`]: AEAD tag or key-unwrap integrity failure
//! - [`LoomError::KeyMismatch`]: key pairing or agreement parties incompatible
//!
//! Signature verification never produces an error for a merely invalid
//! signature; it returns `false`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use std::fmt::Display;
use thiserror::Error;

/// Conversions from third-party error types.
pub mod conversions;

/// Result type alias for cipherloom operations
pub type Result<T> = std::result::Result<T, LoomError>;

/// Error type for every cipherloom operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoomError {
    /// Malformed encoded key, parameter, or signature structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Key of the wrong type or size, or one that fails a validity check
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid argument such as an IV of the wrong length
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation invoked in the wrong lifecycle phase
    #[error("Invalid state: {0}")]
    State(String),

    /// Algorithm or size rejected by the factory predicates
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// AEAD tag mismatch or key-unwrap integrity failure
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Private/public pairing invalid, or agreement parties incompatible
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// Unaligned data without padding, corrupt padding, or short output buffer
    #[error("Data length error: {0}")]
    DataLength(String),

    /// Stateful signing key has used every one-time leaf
    #[error("Key exhausted: {0}")]
    KeyExhausted(String),

    /// Bounded retry loop ran out of iterations
    #[error("Point not found after {attempts} attempts")]
    PointNotFound {
        /// Number of attempts made
        attempts: u32,
    },

    /// Entropy source failure
    #[error("Random source error: {0}")]
    Random(String),

    /// Underlying primitive failed for a reason outside the taxonomy
    #[error("{operation} failed: {message}")]
    Operation {
        /// Operation being performed
        operation: String,
        /// Library error text
        message: String,
    },
}

impl LoomError {
    /// Wrap a decoding failure with the name of the operation that hit it.
    #[must_use]
    pub fn parse(operation: &str, err: impl Display) -> Self {
        Self::Parse(format!("{operation}: {err}"))
    }

    /// Wrap a key validation failure with the name of the operation.
    #[must_use]
    pub fn invalid_key(operation: &str, err: impl Display) -> Self {
        Self::InvalidKey(format!("{operation}: {err}"))
    }

    /// Wrap a library failure with the name of the operation.
    #[must_use]
    pub fn operation(operation: &str, err: impl Display) -> Self {
        Self::Operation { operation: operation.to_string(), message: err.to_string() }
    }

    /// Build an [`LoomError::UnsupportedAlgorithm`] naming the rejected spec.
    #[must_use]
    pub fn unsupported(spec: impl Display) -> Self {
        Self::UnsupportedAlgorithm(spec.to_string())
    }

    /// Returns true when the error belongs to the parse class.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
