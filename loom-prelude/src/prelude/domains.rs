//! Domain Separation Labels for HKDF
//!
//! Every place that expands a shared secret into key material uses HKDF with
//! one of these labels as the `info` prefix, so a secret derived for one
//! purpose can never collide with a secret derived for another.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Prefix for symmetric keys derived from a secret and salt.
///
/// The key type name is appended, so two key types fed the same secret
/// produce unrelated keys.
pub const KEY_FROM_SECRET: &[u8] = b"cipherloom-v1-KeyFromSecret-";

/// Prefix for agreement secrets expanded through the configured KDF.
pub const AGREEMENT_KDF: &[u8] = b"cipherloom-v1-AgreementKdf";

/// Message signed and verified by the pairwise consistency self-test.
pub const PAIRWISE_CONSISTENCY: &[u8] = b"cipherloom-v1-PairwiseConsistency";
