#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # cipherloom Primitives
//!
//! Every cryptographic engine behind the cipherloom factory. Engines are
//! plain values configured by a spec from [`spec`]; none of them reaches
//! for global state except through the [`rand::SecureRandom`] handle they
//! are built with.
//!
//! ## Engines
//!
//! - **hash**: [`hash::DigestEngine`] over SHA-1, SHA-2, SHA-3, BLAKE2, SM3
//! - **mac**: [`mac::MacEngine`] for HMAC, CMAC, GMAC, Poly1305, keyed BLAKE2
//! - **cipher**: block modes with padding, AEAD, stream ciphers, AES key wrap
//! - **keys**: typed symmetric keys and their generators
//! - **keypair**: fifteen asymmetric families with PKCS#8 / SPKI encodings
//! - **signer**: digest-then-sign engine over every signing family
//! - **kem**: sender/receiver encapsulation (RSA-KEM, ECIES, DH, XDH, ML-KEM, McEliece)
//! - **agreement**: anonymous, basic, unified and ephemeral key agreement
//! - **xmss**: stateful hash-based signatures (RFC 8391) with index tracking
//!
//! ## Backends
//!
//! | Family | Implementation |
//! |--------|----------------|
//! | AES-GCM | `aws-lc-rs` |
//! | ML-KEM / ML-DSA / SLH-DSA | `fips203` / `fips204` / `fips205` |
//! | FN-DSA | `fn-dsa` |
//! | Classic McEliece | `pqcrypto-classicmceliece` |
//! | RSA / DSA | `rsa` / `dsa` + `num-bigint-dig` |
//! | EC, SM2 | `p256`, `p384`, `k256`, `sm2` |
//! | Ed25519 / X25519 / X448 | `ed25519-dalek` / `x25519-dalek` / `x448` |
//! | XMSS, XMSS-MT | in-crate, over `sha2` / `sha3` |

pub mod agreement;
pub mod cipher;
pub mod hash;
pub mod kdf;
pub mod kem;
pub mod keypair;
pub mod keys;
pub mod mac;
pub mod rand;
pub mod signer;
pub mod spec;
pub mod xmss;

pub use agreement::AgreementEngine;
pub use cipher::{AeadCipher, AeadCipherEngine, BlockCipherEngine, Cipher, KeyWrapper, StreamCipherEngine};
pub use hash::DigestEngine;
pub use kem::{KemReceiver, KemSender};
pub use keypair::{KeyPair, KeyPairGenerator, PrivateKey, PublicKey};
pub use keys::{Key, KeyGenerator, KeyType};
pub use mac::MacEngine;
pub use rand::SecureRandom;
pub use signer::SignatureEngine;
pub use xmss::XmssIndexRegistry;
