//! # cipherloom Core
//!
//! The factory layer of cipherloom. Applications ask a [`CryptoFactory`]
//! for engines by spec instead of constructing them directly, so one
//! configuration decides which algorithms are allowed, one random source
//! feeds every engine, and key generators are shared.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loom_core::{CryptoFactory, FactoryConfig};
//! use loom_core::primitives::spec::{AgreementSpec, AgreementType, AsymKeySpec, KdfType};
//!
//! let factory = CryptoFactory::new(FactoryConfig::for_production())?;
//! let spec = AgreementSpec::new(AsymKeySpec::X25519, AgreementType::Basic, KdfType::HkdfSha256);
//!
//! let alice = factory.generate_key_pair(AsymKeySpec::X25519)?;
//! let bob = factory.generate_key_pair(AsymKeySpec::X25519)?;
//!
//! let mut initiator = factory.agreement(spec)?;
//! let mut responder = factory.agreement(spec)?;
//! let message = initiator.initiate(Some(&alice), &bob)?;
//! responder.accept(Some(&bob), &alice, &message)?;
//! assert_eq!(initiator.secret()?, responder.secret()?);
//! # Ok::<(), loom_core::LoomError>(())
//! ```
//!
//! ## Configuration
//!
//! | Setting | Default | Effect |
//! |---------|---------|--------|
//! | `restricted` | `false` | symmetric and stream keys capped at 128 bits |
//! | `pairwise_consistency_check` | `true` | sign/verify self-test on new signing key pairs |
//! | `xmss_reuse_protection` | `true` | factory-wide XMSS leaf index registry |
//!
//! ## Logging
//!
//! Engines log through `tracing`. Call [`logging::init_tracing`] once when
//! the application has no subscriber of its own.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

/// Generator cache
pub mod cache;
/// Factory configuration
pub mod config;
/// The crypto factory
pub mod factory;
/// Tracing setup and log sanitising
pub mod logging;

pub use cache::KeyGeneratorCache;
pub use config::{FactoryConfig, RESTRICTED_KEY_BITS};
pub use factory::CryptoFactory;
pub use loom_prelude::prelude::{LoomError, Result};
pub use loom_primitives as primitives;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
