#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Stateful Hash-Based Signatures (XMSS and XMSS^MT, RFC 8391)
//!
//! An XMSS private key may sign each one-time leaf exactly once. The signing
//! state (next leaf index plus the cached trees) lives behind an
//! `Arc<Mutex<..>>` inside [`XmssPrivateKey`], so clones of one key pair share
//! a single index and can never hand out the same leaf twice.
//!
//! Copies that do not share state (a private key decoded twice from the same
//! bytes, or restored from an old backup) are caught by the
//! [`XmssIndexRegistry`]: it remembers, per public key, the next unused index
//! and refuses to sign below it.
//!
//! The caller must persist the encoded private key after every signature.

mod tree;
mod wots;

use crate::rand::SecureRandom;
use crate::spec::{AsymKeySpec, XmssDigest};
use loom_prelude::prelude::{LoomError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};
use tree::CachedTree;
use wots::Hasher;
use zeroize::Zeroizing;

/// Tree shape and hash of an XMSS or XMSS^MT key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct XmssParams {
    digest: XmssDigest,
    height: u32,
    layers: u32,
    multi_tree: bool,
}

impl XmssParams {
    /// Parameters of an XMSS or XMSS^MT key spec.
    ///
    /// # Errors
    /// Returns [`LoomError::UnsupportedAlgorithm`] for other families.
    pub fn from_spec(spec: AsymKeySpec) -> Result<Self> {
        match spec {
            AsymKeySpec::Xmss(digest, height) => {
                Ok(Self { digest, height: height.height(), layers: 1, multi_tree: false })
            }
            AsymKeySpec::XmssMt(digest, height) => Ok(Self {
                digest,
                height: height.height(),
                layers: height.layers(),
                multi_tree: true,
            }),
            other => Err(LoomError::unsupported(other)),
        }
    }

    /// Tree hash.
    #[must_use]
    pub fn digest(&self) -> XmssDigest {
        self.digest
    }

    /// Total height h.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of layers d (1 for XMSS).
    #[must_use]
    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Node size n.
    #[must_use]
    pub fn n(&self) -> usize {
        self.digest.n()
    }

    /// Total number of one-time leaves, 2^h.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    fn layer_height(&self) -> u32 {
        self.height / self.layers
    }

    fn index_len(&self) -> usize {
        if self.multi_tree {
            (self.height as usize + 7) / 8
        } else {
            4
        }
    }

    /// Signature length in bytes.
    #[must_use]
    pub fn signature_len(&self) -> usize {
        let hasher = Hasher::new(self.digest);
        let per_layer = (hasher.wots_len() + self.layer_height() as usize) * self.n();
        self.index_len() + self.n() + self.layers as usize * per_layer
    }

    /// Length of the encoded private state.
    pub(crate) fn private_len(&self) -> usize {
        8 + 4 * self.n()
    }
}

/// XMSS public key: root and public seed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XmssPublicKey {
    params: XmssParams,
    root: Vec<u8>,
    pub_seed: Vec<u8>,
}

impl XmssPublicKey {
    /// Rebuild a public key from `root || pub_seed`.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] when the length is not `2n`.
    pub fn from_bytes(params: XmssParams, bytes: &[u8]) -> Result<Self> {
        let n = params.n();
        if bytes.len() != 2 * n {
            return Err(LoomError::InvalidKey(format!(
                "XMSS public key must be {} bytes, got {}",
                2 * n,
                bytes.len()
            )));
        }
        let (root, pub_seed) = bytes.split_at(n);
        Ok(Self { params, root: root.to_vec(), pub_seed: pub_seed.to_vec() })
    }

    /// `root || pub_seed`
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.root.clone();
        out.extend_from_slice(&self.pub_seed);
        out
    }

    /// Tree parameters.
    #[must_use]
    pub fn params(&self) -> XmssParams {
        self.params
    }

    /// Verify a signature. Malformed signatures return `false`.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let params = self.params;
        if signature.len() != params.signature_len() {
            return false;
        }
        let hasher = Hasher::new(params.digest);
        let n = params.n();
        let (index_bytes, rest) = signature.split_at(params.index_len());
        let index = index_bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        if index >= params.capacity() {
            return false;
        }
        let (r, mut rest) = rest.split_at(n);

        let mut node = hasher.h_msg(r, &self.root, index, message);
        let layer_height = params.layer_height();
        let ots_len = hasher.wots_len() * n;
        let auth_len = layer_height as usize * n;
        let mut tree_index = index;
        for layer in 0..params.layers {
            let leaf = (tree_index & ((1u64 << layer_height) - 1)) as u32;
            tree_index >>= layer_height;
            let (ots, tail) = rest.split_at(ots_len);
            let (auth, tail) = tail.split_at(auth_len);
            rest = tail;
            let leaf_node =
                tree::leaf_from_signature(&hasher, ots, &node, &self.pub_seed, layer, tree_index, leaf);
            node = tree::root_from_path(&hasher, leaf_node, leaf, auth, &self.pub_seed, layer, tree_index);
        }
        bool::from(node.as_slice().ct_eq(self.root.as_slice()))
    }

    /// Registry key: root followed by the public seed.
    pub(crate) fn identity(&self) -> Vec<u8> {
        self.to_bytes()
    }
}

struct SigningState {
    index: u64,
    sk_seed: Zeroizing<Vec<u8>>,
    sk_prf: Zeroizing<Vec<u8>>,
    /// One cached tree per layer, rebuilt when the index leaves it.
    cache: Vec<Option<CachedTree>>,
}

/// XMSS private key with shared, mutable signing state.
#[derive(Clone)]
pub struct XmssPrivateKey {
    public: XmssPublicKey,
    state: Arc<Mutex<SigningState>>,
}

impl XmssPrivateKey {
    /// Generate a key. Builds the top tree, which takes 2^(h/d) WOTS+ key
    /// generations.
    #[instrument(level = "debug", skip(random), fields(height = params.height(), layers = params.layers()))]
    pub fn generate(params: XmssParams, random: &SecureRandom) -> Self {
        let n = params.n();
        let hasher = Hasher::new(params.digest);
        let sk_seed = random.secret_bytes(n);
        let sk_prf = random.secret_bytes(n);
        let pub_seed = random.bytes(n);
        let top_layer = params.layers - 1;
        let top = tree::build(&hasher, &sk_seed, &pub_seed, top_layer, 0, params.layer_height());
        let root = top.root().to_vec();
        let mut cache = vec![None; params.layers as usize];
        if let Some(slot) = cache.last_mut() {
            *slot = Some(top);
        }
        debug!("XMSS key generated");
        Self {
            public: XmssPublicKey { params, root, pub_seed },
            state: Arc::new(Mutex::new(SigningState { index: 0, sk_seed, sk_prf, cache })),
        }
    }

    /// Restore a private key from `index || sk_seed || sk_prf || pub_seed || root`.
    ///
    /// # Errors
    /// Returns [`LoomError::InvalidKey`] for a wrong length or an index past
    /// the capacity.
    pub fn from_bytes(params: XmssParams, bytes: &[u8]) -> Result<Self> {
        let n = params.n();
        if bytes.len() != params.private_len() {
            return Err(LoomError::InvalidKey(format!(
                "XMSS private key must be {} bytes, got {}",
                params.private_len(),
                bytes.len()
            )));
        }
        let (index, rest) = bytes.split_at(8);
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(index);
        let index = u64::from_be_bytes(index_bytes);
        if index > params.capacity() {
            return Err(LoomError::InvalidKey("XMSS index beyond capacity".to_string()));
        }
        let (sk_seed, rest) = rest.split_at(n);
        let (sk_prf, rest) = rest.split_at(n);
        let (pub_seed, root) = rest.split_at(n);
        Ok(Self {
            public: XmssPublicKey { params, root: root.to_vec(), pub_seed: pub_seed.to_vec() },
            state: Arc::new(Mutex::new(SigningState {
                index,
                sk_seed: Zeroizing::new(sk_seed.to_vec()),
                sk_prf: Zeroizing::new(sk_prf.to_vec()),
                cache: vec![None; params.layers as usize],
            })),
        })
    }

    /// Encode the current state. Must be persisted after each signature.
    #[must_use]
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let state = self.state.lock();
        let mut out = Zeroizing::new(Vec::with_capacity(self.public.params.private_len()));
        out.extend_from_slice(&state.index.to_be_bytes());
        out.extend_from_slice(&state.sk_seed);
        out.extend_from_slice(&state.sk_prf);
        out.extend_from_slice(&self.public.pub_seed);
        out.extend_from_slice(&self.public.root);
        out
    }

    /// Public half.
    #[must_use]
    pub fn public_key(&self) -> &XmssPublicKey {
        &self.public
    }

    /// Next leaf index to be used.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.state.lock().index
    }

    /// Signatures left before the key is exhausted.
    #[must_use]
    pub fn remaining_signatures(&self) -> u64 {
        self.public.params.capacity().saturating_sub(self.index())
    }

    /// Whether this private key belongs to `public`.
    pub(crate) fn matches_public(&self, public: &XmssPublicKey) -> bool {
        self.public.params == public.params
            && bool::from(self.public.root.as_slice().ct_eq(public.root.as_slice()))
            && bool::from(self.public.pub_seed.as_slice().ct_eq(public.pub_seed.as_slice()))
    }

    /// Key identity: seeds and public half. The index is excluded.
    pub(crate) fn same_key(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.state, &other.state) {
            return true;
        }
        if !self.matches_public(&other.public) {
            return false;
        }
        let a = self.state.lock();
        let b = other.state.lock();
        bool::from(a.sk_seed.as_slice().ct_eq(b.sk_seed.as_slice()))
            && bool::from(a.sk_prf.as_slice().ct_eq(b.sk_prf.as_slice()))
    }

    /// Sign with the next unused leaf and advance the index.
    ///
    /// # Errors
    /// - [`LoomError::KeyExhausted`] when every leaf has been used
    /// - [`LoomError::State`] when the registry has seen this index already
    #[instrument(level = "debug", skip_all, fields(message_len = message.len()))]
    pub fn sign(&self, message: &[u8], registry: Option<&XmssIndexRegistry>) -> Result<Vec<u8>> {
        let params = self.public.params;
        let hasher = Hasher::new(params.digest);
        let n = params.n();
        let mut state = self.state.lock();
        let index = state.index;
        if index >= params.capacity() {
            warn!(capacity = params.capacity(), "XMSS key exhausted");
            return Err(LoomError::KeyExhausted(format!(
                "all {} XMSS leaves have been used",
                params.capacity()
            )));
        }
        if let Some(registry) = registry {
            registry.reserve(&self.public.identity(), index)?;
        }
        state.index = index + 1;

        let mut index_bytes = [0u8; 32];
        index_bytes[24..].copy_from_slice(&index.to_be_bytes());
        let r = hasher.prf(&state.sk_prf, &index_bytes);
        let mut signature = Vec::with_capacity(params.signature_len());
        signature.extend_from_slice(&index.to_be_bytes()[8 - params.index_len()..]);
        signature.extend_from_slice(&r);

        let mut node = hasher.h_msg(&r, &self.public.root, index, message);
        let layer_height = params.layer_height();
        let mut tree_index = index;
        let SigningState { sk_seed, cache, .. } = &mut *state;
        for layer in 0..params.layers {
            let leaf = (tree_index & ((1u64 << layer_height) - 1)) as u32;
            tree_index >>= layer_height;
            let slot = cache
                .get_mut(layer as usize)
                .ok_or_else(|| LoomError::State("XMSS tree cache out of sync".to_string()))?;
            if slot.as_ref().map_or(true, |cached| cached.tree != tree_index) {
                debug!(layer, tree = tree_index, "building XMSS tree");
                *slot = Some(tree::build(&hasher, sk_seed, &self.public.pub_seed, layer, tree_index, layer_height));
            }
            let cached = slot
                .as_ref()
                .ok_or_else(|| LoomError::State("XMSS tree cache out of sync".to_string()))?;
            let mut ots = wots::Address::new(layer, tree_index);
            ots.set_type(wots::Address::TYPE_OTS);
            ots.set_leaf(leaf);
            signature.extend(hasher.wots_sign(&node, sk_seed, &self.public.pub_seed, ots));
            signature.extend(cached.auth_path(leaf));
            node = cached.root().to_vec();
        }
        Ok(signature)
    }
}

impl fmt::Debug for XmssPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmssPrivateKey")
            .field("params", &self.public.params)
            .field("index", &self.index())
            .field("seeds", &"[REDACTED]")
            .finish()
    }
}

/// Factory-wide record of the next unused leaf per XMSS public key.
#[derive(Clone, Default)]
pub struct XmssIndexRegistry {
    next: Arc<Mutex<HashMap<Vec<u8>, u64>>>,
}

impl XmssIndexRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `index` for the key. Fails if that index (or a later one) was
    /// already claimed.
    fn reserve(&self, identity: &[u8], index: u64) -> Result<()> {
        let mut next = self.next.lock();
        let floor = next.get(identity).copied().unwrap_or(0);
        if index < floor {
            warn!(index, next = floor, "stale XMSS private key");
            return Err(LoomError::State(format!(
                "XMSS index {index} already used; next free index is {floor}"
            )));
        }
        next.insert(identity.to_vec(), index + 1);
        Ok(())
    }

    /// Next unused index recorded for a public key, if it has signed.
    #[must_use]
    pub fn next_index(&self, public: &XmssPublicKey) -> Option<u64> {
        self.next.lock().get(&public.identity()).copied()
    }
}

impl fmt::Debug for XmssIndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmssIndexRegistry").field("keys", &self.next.lock().len()).finish()
    }
}
