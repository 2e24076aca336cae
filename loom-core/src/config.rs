//! Factory configuration.
//!
//! [`FactoryConfig`] is a small builder owned by the
//! [`CryptoFactory`](crate::factory::CryptoFactory). It decides which specs
//! the factory accepts and which self-checks run on the keys it hands out.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use loom_prelude::prelude::{LoomError, Result};
use std::fmt;

/// Largest symmetric key, in bits, a restricted factory accepts.
pub const RESTRICTED_KEY_BITS: usize = 128;

/// Settings of a [`CryptoFactory`](crate::factory::CryptoFactory).
///
/// # Examples
/// ```rust
/// use loom_core::config::FactoryConfig;
///
/// let config = FactoryConfig::new()
///     .with_restricted(true)
///     .with_pairwise_consistency_check(false)
///     .build()
///     .expect("valid config");
/// assert!(config.restricted);
///
/// let production = FactoryConfig::for_production();
/// assert!(production.pairwise_consistency_check);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Limit symmetric and stream keys to 128 bits.
    ///
    /// Default: `false`
    pub restricted: bool,

    /// Sign and verify a fixed message with every freshly generated
    /// stateless signing key pair before returning it.
    ///
    /// Default: `true`
    pub pairwise_consistency_check: bool,

    /// Track the next unused leaf of every XMSS key the factory's signers
    /// touch, so a stale private key copy cannot reuse a one-time index.
    ///
    /// Default: `true`
    pub xmss_reuse_protection: bool,

    /// Seed for a reproducible random source. Tests only; `None` seeds
    /// from the operating system.
    ///
    /// Default: `None`
    pub seed: Option<[u8; 32]>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self { restricted: false, pairwise_consistency_check: true, xmss_reuse_protection: true, seed: None }
    }
}

impl FactoryConfig {
    /// Configuration with the defaults listed on each field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Faster key generation for development: no pairwise consistency
    /// check.
    #[must_use]
    pub fn for_development() -> Self {
        Self::default().with_pairwise_consistency_check(false)
    }

    /// Every self-check enabled.
    #[must_use]
    pub fn for_production() -> Self {
        Self::default().with_pairwise_consistency_check(true).with_xmss_reuse_protection(true)
    }

    /// Set restricted mode and return self for method chaining.
    #[must_use]
    pub fn with_restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Set the pairwise consistency check and return self for method
    /// chaining.
    #[must_use]
    pub fn with_pairwise_consistency_check(mut self, enabled: bool) -> Self {
        self.pairwise_consistency_check = enabled;
        self
    }

    /// Set XMSS index reuse protection and return self for method chaining.
    #[must_use]
    pub fn with_xmss_reuse_protection(mut self, enabled: bool) -> Self {
        self.xmss_reuse_protection = enabled;
        self
    }

    /// Seed the random source and return self for method chaining.
    #[must_use]
    pub fn with_seed(mut self, seed: [u8; 32]) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    /// Same as [`Self::validate`].
    pub fn build(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check the settings for contradictions.
    ///
    /// # Errors
    /// [`LoomError::InvalidParameter`] for an all-zero seed.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.seed, Some(seed) if seed.iter().all(|&b| b == 0)) {
            return Err(LoomError::InvalidParameter("random seed must not be all zeros".to_string()));
        }
        Ok(())
    }

    /// Whether a key of `bits` is allowed under the current restriction.
    #[must_use]
    pub fn allows_key_bits(&self, bits: usize) -> bool {
        !self.restricted || bits <= RESTRICTED_KEY_BITS
    }
}

impl fmt::Debug for FactoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryConfig")
            .field("restricted", &self.restricted)
            .field("pairwise_consistency_check", &self.pairwise_consistency_check)
            .field("xmss_reuse_protection", &self.xmss_reuse_protection)
            .field("seed", &self.seed.map(|_| "[REDACTED]"))
            .finish()
    }
}
