#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! HKDF helpers (RFC 5869)
//!
//! Used to turn agreed or encapsulated secrets into typed symmetric keys.
//! Every caller passes a label from [`loom_prelude::prelude::domains`] as
//! (part of) the `info` input.

use crate::hash::with_digest;
use crate::spec::DigestType;
use hkdf::SimpleHkdf;
use loom_prelude::prelude::Result;
use tracing::instrument;
use zeroize::Zeroizing;

/// HKDF extract-then-expand over any supported digest.
///
/// # Errors
/// Returns [`loom_prelude::prelude::LoomError::InvalidParameter`] when
/// `length` exceeds 255 digest blocks.
#[instrument(level = "debug", skip(ikm, salt, info), fields(ikm_len = ikm.len(), length = length))]
pub fn hkdf(
    digest: DigestType,
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut okm = Zeroizing::new(vec![0u8; length]);
    with_digest!(digest, D => {
        let hk = SimpleHkdf::<D>::new(salt, ikm);
        hk.expand(info, &mut okm)?;
    });
    Ok(okm)
}

/// HKDF with the info string built from a label and a context suffix.
///
/// # Errors
/// Same as [`hkdf`].
pub fn hkdf_labelled(
    digest: DigestType,
    ikm: &[u8],
    salt: Option<&[u8]>,
    label: &[u8],
    context: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let mut info = Vec::with_capacity(label.len() + context.len());
    info.extend_from_slice(label);
    info.extend_from_slice(context);
    hkdf(digest, ikm, salt, &info, length)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use loom_prelude::prelude::LoomError;

    #[test]
    fn test_rfc5869_case_1() {
        let ikm = hex!("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
        let salt = hex!("000102030405060708090a0b0c");
        let info = hex!("f0f1f2f3f4f5f6f7f8f9");
        let okm = hkdf(DigestType::Sha256, &ikm, Some(&salt), &info, 42).unwrap();
        assert_eq!(
            okm.as_slice(),
            hex!(
                "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf"
                "34007208d5b887185865"
            )
        );
    }

    #[test]
    fn test_label_changes_output() {
        let a = hkdf_labelled(DigestType::Sha512, b"secret", None, b"label-a", b"", 32).unwrap();
        let b = hkdf_labelled(DigestType::Sha512, b"secret", None, b"label-b", b"", 32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_oversized_output_rejected() {
        let err = hkdf(DigestType::Sha256, b"ikm", None, b"", 255 * 32 + 1).unwrap_err();
        assert!(matches!(err, LoomError::InvalidParameter(_)));
    }
}
