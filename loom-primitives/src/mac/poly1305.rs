//! Poly1305 one-time authenticator.
//!
//! Key layout is `r || s` (RFC 8439). The cipher-keyed variant takes
//! `r || k` and a 16-byte nonce and computes `s = E_k(nonce)`, as in
//! Poly1305-AES.

use super::MacCore;
use crate::cipher::block::BlockEngine;
use crate::spec::SymKeySpec;
use loom_prelude::prelude::{LoomError, Result};
use poly1305::universal_hash::KeyInit;
use poly1305::Poly1305;
use zeroize::Zeroizing;

pub(crate) struct Poly1305Mac {
    key: Zeroizing<[u8; 32]>,
    message: Zeroizing<Vec<u8>>,
}

impl Poly1305Mac {
    pub(crate) fn new(key: &[u8]) -> Result<Self> {
        let key = <[u8; 32]>::try_from(key)
            .map_err(|_| LoomError::InvalidKey("Poly1305 key must be 32 bytes".to_string()))?;
        Ok(Self { key: Zeroizing::new(key), message: Zeroizing::new(Vec::new()) })
    }

    pub(crate) fn with_cipher(spec: SymKeySpec, key: &[u8], nonce: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(LoomError::InvalidKey("Poly1305 key must be 32 bytes".to_string()));
        }
        let (r, k) = key.split_at(16);
        let engine = BlockEngine::new(spec, k)?;
        let mut s = Zeroizing::new(nonce.to_vec());
        if s.len() != engine.block_len() {
            return Err(LoomError::InvalidParameter(format!(
                "Poly1305-{spec} nonce must be {} bytes",
                engine.block_len()
            )));
        }
        engine.encrypt_block(&mut s);
        let mut combined = Zeroizing::new([0u8; 32]);
        for (dst, src) in combined.iter_mut().zip(r.iter().chain(s.iter())) {
            *dst = *src;
        }
        Ok(Self { key: combined, message: Zeroizing::new(Vec::new()) })
    }
}

impl MacCore for Poly1305Mac {
    fn update(&mut self, data: &[u8]) {
        self.message.extend_from_slice(data);
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>> {
        let mac = Poly1305::new(poly1305::Key::from_slice(self.key.as_slice()));
        Ok(mac.compute_unpadded(&self.message).to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::spec::KeyLength;
    use hex_literal::hex;

    #[test]
    fn test_rfc8439_section_2_5_2() {
        let key = hex!("85d6be7857556d337f4452fe42d506a80103808afb0db2fd4abff6af4149f51b");
        let mut mac = Poly1305Mac::new(&key).unwrap();
        mac.update(b"Cryptographic Forum Research Group");
        assert_eq!(Box::new(mac).finalize().unwrap(), hex!("a8061dc1305136c6c22b8baf0c0127a9"));
    }

    #[test]
    fn test_cipher_keyed_depends_on_nonce() {
        let key = [5u8; 32];
        let tag = |nonce: &[u8; 16]| {
            let mut mac =
                Poly1305Mac::with_cipher(SymKeySpec::aes(KeyLength::Len128), &key, nonce).unwrap();
            mac.update(b"message");
            Box::new(mac).finalize().unwrap()
        };
        assert_ne!(tag(&[0u8; 16]), tag(&[1u8; 16]));
    }
}
