//! GMAC: GCM authentication over an empty plaintext, message as AAD.

use super::MacCore;
use crate::spec::{KeyLength, SymKeySpec, SymKeyType};
use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM};
use loom_prelude::prelude::{LoomError, Result};

pub(crate) struct Gmac {
    key: LessSafeKey,
    nonce: [u8; 12],
    message: Vec<u8>,
}

impl Gmac {
    pub(crate) fn new(spec: SymKeySpec, key: &[u8], iv: &[u8]) -> Result<Self> {
        let algorithm = match (spec.key_type, spec.key_length) {
            (SymKeyType::Aes, KeyLength::Len128) => &AES_128_GCM,
            (SymKeyType::Aes, KeyLength::Len256) => &AES_256_GCM,
            _ => return Err(LoomError::unsupported(format!("GMAC-{spec}"))),
        };
        let unbound = UnboundKey::new(algorithm, key)
            .map_err(|_| LoomError::InvalidKey(format!("GMAC-{spec} key")))?;
        let nonce = <[u8; 12]>::try_from(iv)
            .map_err(|_| LoomError::InvalidParameter("GMAC nonce must be 12 bytes".to_string()))?;
        Ok(Self { key: LessSafeKey::new(unbound), nonce, message: Vec::new() })
    }
}

impl MacCore for Gmac {
    fn update(&mut self, data: &[u8]) {
        self.message.extend_from_slice(data);
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>> {
        let mut tag = Vec::new();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(self.nonce),
                Aad::from(self.message.as_slice()),
                &mut tag,
            )
            .map_err(|e| LoomError::operation("GMAC", e))?;
        Ok(tag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_gcm_test_case_1_tag() {
        let mac = Gmac::new(SymKeySpec::aes(KeyLength::Len128), &[0u8; 16], &[0u8; 12]).unwrap();
        assert_eq!(Box::new(mac).finalize().unwrap(), hex!("58e2fccefa7e3061367f1d57a4e7455a"));
    }

    #[test]
    fn test_message_changes_tag() {
        let tag = |msg: &[u8]| {
            let mut mac = Gmac::new(SymKeySpec::aes(KeyLength::Len256), &[1u8; 32], &[2u8; 12]).unwrap();
            mac.update(msg);
            Box::new(mac).finalize().unwrap()
        };
        assert_eq!(tag(b"abc").len(), 16);
        assert_ne!(tag(b"abc"), tag(b"abd"));
    }

    #[test]
    fn test_aes192_unsupported() {
        let err = Gmac::new(SymKeySpec::aes(KeyLength::Len192), &[0u8; 24], &[0u8; 12]).err();
        assert!(matches!(err, Some(LoomError::UnsupportedAlgorithm(_))));
    }
}
