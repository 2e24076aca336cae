//! Tweakable hashes, hash addresses and WOTS+ (RFC 8391 sections 2.5, 3, 5.1).

use crate::spec::XmssDigest;
use digest::{Digest, ExtendableOutput, Update, XofReader};
use zeroize::Zeroizing;

/// Winternitz parameter.
const W: u32 = 16;
const LOG_W: usize = 4;
/// Checksum digits for w = 16 with n = 32 or n = 64.
const LEN2: usize = 3;

const PAD_F: u8 = 0;
const PAD_H: u8 = 1;
const PAD_HASH: u8 = 2;
const PAD_PRF: u8 = 3;
const PAD_PRF_KEYGEN: u8 = 4;

/// 32-byte hash address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Address([u32; 8]);

impl Address {
    pub(crate) const TYPE_OTS: u32 = 0;
    pub(crate) const TYPE_LTREE: u32 = 1;
    pub(crate) const TYPE_TREE: u32 = 2;

    pub(crate) fn new(layer: u32, tree: u64) -> Self {
        let mut words = [0u32; 8];
        words[0] = layer;
        words[1] = (tree >> 32) as u32;
        words[2] = tree as u32;
        Self(words)
    }

    /// Switch the address type, clearing the type-specific words.
    pub(crate) fn set_type(&mut self, kind: u32) {
        self.0[3] = kind;
        self.0[4..].fill(0);
    }

    /// OTS address, L-tree address, or (for tree nodes) padding.
    pub(crate) fn set_leaf(&mut self, index: u32) {
        self.0[4] = index;
    }

    /// Chain address (OTS) or tree height (L-tree and tree nodes).
    pub(crate) fn set_chain_or_height(&mut self, value: u32) {
        self.0[5] = value;
    }

    /// Hash address (OTS) or tree index (L-tree and tree nodes).
    pub(crate) fn set_hash_or_index(&mut self, value: u32) {
        self.0[6] = value;
    }

    pub(crate) fn set_key_and_mask(&mut self, value: u32) {
        self.0[7] = value;
    }

    fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.0) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

/// Tweakable hash family for one digest choice.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Hasher {
    digest: XmssDigest,
}

impl Hasher {
    pub(crate) fn new(digest: XmssDigest) -> Self {
        Self { digest }
    }

    pub(crate) fn n(&self) -> usize {
        self.digest.n()
    }

    /// Chains per WOTS+ key.
    pub(crate) fn wots_len(&self) -> usize {
        self.len1() + LEN2
    }

    fn len1(&self) -> usize {
        8 * self.n() / LOG_W
    }

    /// `Hash(toByte(pad, n) || parts...)`
    fn core(&self, pad: u8, parts: &[&[u8]]) -> Vec<u8> {
        let n = self.n();
        let mut prefix = vec![0u8; n];
        prefix[n - 1] = pad;
        match self.digest {
            XmssDigest::Sha256 => {
                let mut hash = sha2::Sha256::new();
                Digest::update(&mut hash, &prefix);
                for part in parts {
                    Digest::update(&mut hash, part);
                }
                hash.finalize().to_vec()
            }
            XmssDigest::Sha512 => {
                let mut hash = sha2::Sha512::new();
                Digest::update(&mut hash, &prefix);
                for part in parts {
                    Digest::update(&mut hash, part);
                }
                hash.finalize().to_vec()
            }
            XmssDigest::Shake128 => {
                let mut xof = sha3::Shake128::default();
                Update::update(&mut xof, &prefix);
                for part in parts {
                    Update::update(&mut xof, part);
                }
                let mut out = vec![0u8; n];
                xof.finalize_xof().read(&mut out);
                out
            }
            XmssDigest::Shake256 => {
                let mut xof = sha3::Shake256::default();
                Update::update(&mut xof, &prefix);
                for part in parts {
                    Update::update(&mut xof, part);
                }
                let mut out = vec![0u8; n];
                xof.finalize_xof().read(&mut out);
                out
            }
        }
    }

    fn f(&self, key: &[u8], message: &[u8]) -> Vec<u8> {
        self.core(PAD_F, &[key, message])
    }

    fn h(&self, key: &[u8], left: &[u8], right: &[u8]) -> Vec<u8> {
        self.core(PAD_H, &[key, left, right])
    }

    pub(crate) fn prf(&self, key: &[u8], message: &[u8]) -> Vec<u8> {
        self.core(PAD_PRF, &[key, message])
    }

    fn prf_address(&self, pub_seed: &[u8], address: Address) -> Vec<u8> {
        self.prf(pub_seed, &address.to_bytes())
    }

    /// `H_msg(r || root || toByte(idx, n), M)`
    pub(crate) fn h_msg(&self, r: &[u8], root: &[u8], index: u64, message: &[u8]) -> Vec<u8> {
        let mut idx = vec![0u8; self.n()];
        let offset = idx.len() - 8;
        idx[offset..].copy_from_slice(&index.to_be_bytes());
        self.core(PAD_HASH, &[r, root, &idx, message])
    }

    /// Randomised tree hash with bitmasks (RAND_HASH).
    pub(crate) fn rand_hash(&self, left: &[u8], right: &[u8], pub_seed: &[u8], address: &mut Address) -> Vec<u8> {
        address.set_key_and_mask(0);
        let key = self.prf_address(pub_seed, *address);
        address.set_key_and_mask(1);
        let mask_left = self.prf_address(pub_seed, *address);
        address.set_key_and_mask(2);
        let mask_right = self.prf_address(pub_seed, *address);
        let left: Vec<u8> = left.iter().zip(&mask_left).map(|(a, b)| a ^ b).collect();
        let right: Vec<u8> = right.iter().zip(&mask_right).map(|(a, b)| a ^ b).collect();
        self.h(&key, &left, &right)
    }

    /// Iterate the chain function `steps` times from position `start`.
    fn chain(&self, input: &[u8], start: u32, steps: u32, pub_seed: &[u8], address: &mut Address) -> Vec<u8> {
        let mut value = input.to_vec();
        for position in start..start + steps {
            address.set_hash_or_index(position);
            address.set_key_and_mask(0);
            let key = self.prf_address(pub_seed, *address);
            address.set_key_and_mask(1);
            let mask = self.prf_address(pub_seed, *address);
            let masked: Vec<u8> = value.iter().zip(&mask).map(|(a, b)| a ^ b).collect();
            value = self.f(&key, &masked);
        }
        value
    }

    fn wots_secret(&self, sk_seed: &[u8], pub_seed: &[u8], address: Address, chain: u32) -> Zeroizing<Vec<u8>> {
        let mut address = address;
        address.set_chain_or_height(chain);
        address.set_hash_or_index(0);
        address.set_key_and_mask(0);
        Zeroizing::new(self.core(PAD_PRF_KEYGEN, &[sk_seed, pub_seed, &address.to_bytes()]))
    }

    /// Message digits in base w followed by the checksum digits.
    fn digits(&self, message: &[u8]) -> Vec<u32> {
        let mut digits = base_w(message, self.len1());
        let checksum: u32 = digits.iter().map(|d| W - 1 - d).sum();
        let shifted = checksum << (8 - ((LEN2 * LOG_W) % 8));
        let bytes = shifted.to_be_bytes();
        digits.extend(base_w(&bytes[2..], LEN2));
        digits
    }

    /// WOTS+ public key elements for the OTS address.
    pub(crate) fn wots_public(&self, sk_seed: &[u8], pub_seed: &[u8], address: Address) -> Vec<Vec<u8>> {
        (0..self.wots_len() as u32)
            .map(|chain| {
                let secret = self.wots_secret(sk_seed, pub_seed, address, chain);
                let mut address = address;
                address.set_chain_or_height(chain);
                self.chain(&secret, 0, W - 1, pub_seed, &mut address)
            })
            .collect()
    }

    /// WOTS+ signature over an n-byte message, chains concatenated.
    pub(crate) fn wots_sign(&self, message: &[u8], sk_seed: &[u8], pub_seed: &[u8], address: Address) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wots_len() * self.n());
        for (chain, digit) in self.digits(message).into_iter().enumerate() {
            let secret = self.wots_secret(sk_seed, pub_seed, address, chain as u32);
            let mut address = address;
            address.set_chain_or_height(chain as u32);
            out.extend(self.chain(&secret, 0, digit, pub_seed, &mut address));
        }
        out
    }

    /// Recompute the WOTS+ public key from a signature.
    pub(crate) fn wots_public_from_signature(
        &self,
        signature: &[u8],
        message: &[u8],
        pub_seed: &[u8],
        address: Address,
    ) -> Vec<Vec<u8>> {
        self.digits(message)
            .into_iter()
            .zip(signature.chunks_exact(self.n()))
            .enumerate()
            .map(|(chain, (digit, element))| {
                let mut address = address;
                address.set_chain_or_height(chain as u32);
                self.chain(element, digit, W - 1 - digit, pub_seed, &mut address)
            })
            .collect()
    }

    /// Compress a WOTS+ public key into one leaf with an L-tree.
    pub(crate) fn ltree(&self, mut nodes: Vec<Vec<u8>>, pub_seed: &[u8], address: &mut Address) -> Vec<u8> {
        let mut height = 0u32;
        while nodes.len() > 1 {
            address.set_chain_or_height(height);
            let mut next = Vec::with_capacity((nodes.len() + 1) / 2);
            let mut pairs = nodes.chunks_exact(2);
            for (index, pair) in pairs.by_ref().enumerate() {
                address.set_hash_or_index(index as u32);
                next.push(self.rand_hash(&pair[0], &pair[1], pub_seed, address));
            }
            if let [odd] = pairs.remainder() {
                next.push(odd.clone());
            }
            nodes = next;
            height += 1;
        }
        nodes.pop().unwrap_or_default()
    }
}

fn base_w(bytes: &[u8], out_len: usize) -> Vec<u32> {
    bytes
        .iter()
        .flat_map(|byte| [u32::from(byte >> 4), u32::from(byte & 0x0f)])
        .take(out_len)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_address_layout() {
        let mut address = Address::new(3, 0x0000_0001_0000_0002);
        address.set_type(Address::TYPE_TREE);
        address.set_chain_or_height(5);
        let bytes = address.to_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..12], &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 2]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 5]);
    }

    #[test]
    fn test_digit_count_and_checksum() {
        let hasher = Hasher::new(XmssDigest::Sha256);
        assert_eq!(hasher.wots_len(), 67);
        let digits = hasher.digits(&[0u8; 32]);
        assert_eq!(digits.len(), 67);
        // all-zero message: checksum 64 * 15 = 960 = 0x3c0
        assert_eq!(&digits[64..], &[3, 12, 0]);
    }

    #[test]
    fn test_wots_signature_recovers_public_key() {
        for digest in [XmssDigest::Sha256, XmssDigest::Shake256] {
            let hasher = Hasher::new(digest);
            let n = hasher.n();
            let sk_seed = vec![1u8; n];
            let pub_seed = vec![2u8; n];
            let mut address = Address::new(0, 0);
            address.set_type(Address::TYPE_OTS);
            address.set_leaf(7);
            let message = vec![0xA5u8; n];

            let public = hasher.wots_public(&sk_seed, &pub_seed, address);
            let signature = hasher.wots_sign(&message, &sk_seed, &pub_seed, address);
            assert_eq!(signature.len(), hasher.wots_len() * n);
            let recovered = hasher.wots_public_from_signature(&signature, &message, &pub_seed, address);
            assert_eq!(recovered, public);

            let mut other = message.clone();
            other[0] ^= 1;
            let wrong = hasher.wots_public_from_signature(&signature, &other, &pub_seed, address);
            assert_ne!(wrong, public);
        }
    }

    #[test]
    fn test_ltree_handles_odd_counts() {
        let hasher = Hasher::new(XmssDigest::Sha256);
        let nodes: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 32]).collect();
        let mut address = Address::new(0, 0);
        address.set_type(Address::TYPE_LTREE);
        let root = hasher.ltree(nodes, &[9u8; 32], &mut address);
        assert_eq!(root.len(), 32);
    }
}
