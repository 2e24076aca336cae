//! Hash-keyed MACs: HMAC over any digest, and keyed BLAKE2.
//!
//! Both come from RustCrypto crates implementing `digest::Mac`, so one
//! generic wrapper serves them all.

use super::MacCore;
use ::hmac::Mac;
use digest::KeyInit;
use loom_prelude::prelude::{LoomError, Result};

pub(crate) struct KeyedMac<M> {
    inner: M,
}

impl<M: Mac + KeyInit> KeyedMac<M> {
    pub(crate) fn new(key: &[u8]) -> Result<Self> {
        let inner = <M as KeyInit>::new_from_slice(key)
            .map_err(|_| LoomError::InvalidKey(format!("{}-byte MAC key rejected", key.len())))?;
        Ok(Self { inner })
    }
}

impl<M: Mac + Send> MacCore for KeyedMac<M> {
    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.inner, data);
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>> {
        Ok(self.inner.finalize().into_bytes().to_vec())
    }
}
