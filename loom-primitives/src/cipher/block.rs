//! Raw block cipher dispatch.
//!
//! A closed enum over every supported block cipher so the mode layer and
//! CMAC can drive any of them through one `encrypt_block`/`decrypt_block`
//! pair.

use crate::spec::{KeyLength, SymKeySpec, SymKeyType};
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use loom_prelude::prelude::{LoomError, Result};

pub(crate) enum BlockEngine {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
    Aria128(aria::Aria128),
    Aria192(aria::Aria192),
    Aria256(aria::Aria256),
    Camellia128(camellia::Camellia128),
    Camellia192(camellia::Camellia192),
    Camellia256(camellia::Camellia256),
    Sm4(sm4::Sm4),
    Twofish(twofish::Twofish),
    Serpent(serpent::Serpent),
    Blowfish(blowfish::Blowfish),
    DesEde(des::TdesEde3),
}

macro_rules! dispatch {
    ($engine:expr, $c:ident => $body:expr) => {
        match $engine {
            BlockEngine::Aes128($c) => $body,
            BlockEngine::Aes192($c) => $body,
            BlockEngine::Aes256($c) => $body,
            BlockEngine::Aria128($c) => $body,
            BlockEngine::Aria192($c) => $body,
            BlockEngine::Aria256($c) => $body,
            BlockEngine::Camellia128($c) => $body,
            BlockEngine::Camellia192($c) => $body,
            BlockEngine::Camellia256($c) => $body,
            BlockEngine::Sm4($c) => $body,
            BlockEngine::Twofish($c) => $body,
            BlockEngine::Serpent($c) => $body,
            BlockEngine::Blowfish($c) => $body,
            BlockEngine::DesEde($c) => $body,
        }
    };
}

impl BlockEngine {
    /// Key schedule for `spec` from raw key bytes.
    pub(crate) fn new(spec: SymKeySpec, key: &[u8]) -> Result<Self> {
        if !spec.is_consistent() {
            return Err(LoomError::unsupported(spec));
        }
        if key.len() != spec.key_len() {
            return Err(LoomError::InvalidKey(format!(
                "{spec} key must be {} bytes, got {}",
                spec.key_len(),
                key.len()
            )));
        }
        let engine = match (spec.key_type, spec.key_length) {
            (SymKeyType::Aes, KeyLength::Len128) => Self::Aes128(KeyInit::new_from_slice(key)?),
            (SymKeyType::Aes, KeyLength::Len192) => Self::Aes192(KeyInit::new_from_slice(key)?),
            (SymKeyType::Aes, KeyLength::Len256) => Self::Aes256(KeyInit::new_from_slice(key)?),
            (SymKeyType::Aria, KeyLength::Len128) => Self::Aria128(KeyInit::new_from_slice(key)?),
            (SymKeyType::Aria, KeyLength::Len192) => Self::Aria192(KeyInit::new_from_slice(key)?),
            (SymKeyType::Aria, KeyLength::Len256) => Self::Aria256(KeyInit::new_from_slice(key)?),
            (SymKeyType::Camellia, KeyLength::Len128) => {
                Self::Camellia128(KeyInit::new_from_slice(key)?)
            }
            (SymKeyType::Camellia, KeyLength::Len192) => {
                Self::Camellia192(KeyInit::new_from_slice(key)?)
            }
            (SymKeyType::Camellia, KeyLength::Len256) => {
                Self::Camellia256(KeyInit::new_from_slice(key)?)
            }
            (SymKeyType::Sm4, _) => Self::Sm4(KeyInit::new_from_slice(key)?),
            (SymKeyType::Twofish, _) => Self::Twofish(KeyInit::new_from_slice(key)?),
            (SymKeyType::Serpent, _) => Self::Serpent(KeyInit::new_from_slice(key)?),
            (SymKeyType::Blowfish, _) => Self::Blowfish(KeyInit::new_from_slice(key)?),
            (SymKeyType::DesEde, _) => Self::DesEde(KeyInit::new_from_slice(key)?),
        };
        Ok(engine)
    }

    pub(crate) fn block_len(&self) -> usize {
        match self {
            Self::Blowfish(_) | Self::DesEde(_) => 8,
            _ => 16,
        }
    }

    /// Encrypt one block in place. `block` must be exactly `block_len` bytes.
    pub(crate) fn encrypt_block(&self, block: &mut [u8]) {
        dispatch!(self, c => c.encrypt_block(GenericArray::from_mut_slice(block)))
    }

    /// Decrypt one block in place. `block` must be exactly `block_len` bytes.
    pub(crate) fn decrypt_block(&self, block: &mut [u8]) {
        dispatch!(self, c => c.decrypt_block(GenericArray::from_mut_slice(block)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_aes128_fips197_vector() {
        let key = hex!("000102030405060708090a0b0c0d0e0f");
        let engine = BlockEngine::new(SymKeySpec::aes(KeyLength::Len128), &key).unwrap();
        let mut block = hex!("00112233445566778899aabbccddeeff");
        engine.encrypt_block(&mut block);
        assert_eq!(block, hex!("69c4e0d86a7b0430d8cdb78070b4c55a"));
        engine.decrypt_block(&mut block);
        assert_eq!(block, hex!("00112233445566778899aabbccddeeff"));
    }

    #[test]
    fn test_every_cipher_inverts() {
        for key_type in SymKeyType::ALL {
            for key_length in [KeyLength::Len128, KeyLength::Len192, KeyLength::Len256] {
                let spec = SymKeySpec::new(key_type, key_length);
                if !spec.is_consistent() {
                    continue;
                }
                let key = vec![0x42u8; spec.key_len()];
                let engine = BlockEngine::new(spec, &key).unwrap();
                assert_eq!(engine.block_len(), spec.block_len());
                let plain: Vec<u8> = (0..engine.block_len() as u8).collect();
                let mut block = plain.clone();
                engine.encrypt_block(&mut block);
                assert_ne!(block, plain, "{spec}");
                engine.decrypt_block(&mut block);
                assert_eq!(block, plain, "{spec}");
            }
        }
    }

    #[test]
    fn test_rejects_inconsistent_spec() {
        let spec = SymKeySpec::new(SymKeyType::Sm4, KeyLength::Len256);
        assert!(matches!(
            BlockEngine::new(spec, &[0u8; 32]),
            Err(LoomError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_key_length() {
        let spec = SymKeySpec::aes(KeyLength::Len256);
        assert!(matches!(BlockEngine::new(spec, &[0u8; 16]), Err(LoomError::InvalidKey(_))));
    }
}
