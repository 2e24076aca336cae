// JUSTIFICATION: CMAC block arithmetic.
// - Index calculations bounded by the cipher block length
#![allow(clippy::arithmetic_side_effects)]

//! CMAC (NIST SP 800-38B) over any supported block cipher.
//!
//! Subkeys K1/K2 are derived by doubling `L = E_K(0^b)` in GF(2^b) with
//! `R_b = 0x87` for 128-bit blocks and `0x1B` for 64-bit blocks. The last
//! block is held back until finalisation so it can be masked with K1 (full
//! block) or padded with `10*` and masked with K2.

use super::MacCore;
use crate::cipher::block::BlockEngine;
use crate::spec::SymKeySpec;
use loom_prelude::prelude::Result;
use zeroize::Zeroizing;

pub(crate) struct Cmac {
    engine: BlockEngine,
    k1: Zeroizing<Vec<u8>>,
    k2: Zeroizing<Vec<u8>>,
    chain: Vec<u8>,
    buffer: Vec<u8>,
}

/// Left shift a block by one bit, returning the bit shifted out.
fn left_shift_block(block: &[u8]) -> (Vec<u8>, u8) {
    let mut result = vec![0u8; block.len()];
    let mut overflow = 0u8;
    for (r, &current) in result.iter_mut().zip(block).rev() {
        *r = (current << 1) | overflow;
        overflow = (current >> 7) & 1;
    }
    (result, overflow)
}

fn double(block: &[u8]) -> Vec<u8> {
    let rb = if block.len() == 16 { 0x87 } else { 0x1B };
    let (mut shifted, msb) = left_shift_block(block);
    if let Some(last) = shifted.last_mut() {
        // Constant-time select of R_b.
        *last ^= rb & msb.wrapping_neg();
    }
    shifted
}

fn xor_block(a: &mut [u8], b: &[u8]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x ^= y;
    }
}

impl Cmac {
    pub(crate) fn new(spec: SymKeySpec, key: &[u8]) -> Result<Self> {
        let engine = BlockEngine::new(spec, key)?;
        let bs = engine.block_len();
        let mut l = Zeroizing::new(vec![0u8; bs]);
        engine.encrypt_block(&mut l);
        let k1 = Zeroizing::new(double(&l));
        let k2 = Zeroizing::new(double(&k1));
        Ok(Self { engine, k1, k2, chain: vec![0u8; bs], buffer: Vec::with_capacity(bs) })
    }

    fn absorb_buffer(&mut self) {
        xor_block(&mut self.chain, &self.buffer);
        self.engine.encrypt_block(&mut self.chain);
        self.buffer.clear();
    }
}

impl MacCore for Cmac {
    fn update(&mut self, mut data: &[u8]) {
        let bs = self.engine.block_len();
        while !data.is_empty() {
            if self.buffer.len() == bs {
                self.absorb_buffer();
            }
            let take = (bs - self.buffer.len()).min(data.len());
            let (head, rest) = data.split_at(take);
            self.buffer.extend_from_slice(head);
            data = rest;
        }
    }

    fn finalize(mut self: Box<Self>) -> Result<Vec<u8>> {
        let bs = self.engine.block_len();
        let mut last = vec![0u8; bs];
        let filled = self.buffer.len();
        for (dst, src) in last.iter_mut().zip(&self.buffer) {
            *dst = *src;
        }
        if filled == bs {
            xor_block(&mut last, &self.k1);
        } else {
            if let Some(pad) = last.get_mut(filled) {
                *pad = 0x80;
            }
            xor_block(&mut last, &self.k2);
        }
        xor_block(&mut last, &self.chain);
        self.engine.encrypt_block(&mut last);
        self.chain.fill(0);
        Ok(last)
    }
}
