//! Merkle trees over WOTS+ leaves.

use super::wots::{Address, Hasher};

/// Every level of one tree; `levels[0]` holds the leaves and the last level
/// holds the root.
#[derive(Clone, Debug)]
pub(crate) struct CachedTree {
    /// Tree index within its layer
    pub(crate) tree: u64,
    levels: Vec<Vec<Vec<u8>>>,
}

impl CachedTree {
    pub(crate) fn root(&self) -> &[u8] {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map_or(&[], Vec::as_slice)
    }

    /// Sibling nodes from the leaf up to (not including) the root.
    pub(crate) fn auth_path(&self, leaf: u32) -> Vec<u8> {
        let mut out = Vec::new();
        let height = self.levels.len().saturating_sub(1);
        for (level, nodes) in self.levels.iter().take(height).enumerate() {
            let sibling = ((leaf >> level) ^ 1) as usize;
            if let Some(node) = nodes.get(sibling) {
                out.extend_from_slice(node);
            }
        }
        out
    }
}

fn leaf(hasher: &Hasher, sk_seed: &[u8], pub_seed: &[u8], layer: u32, tree: u64, index: u32) -> Vec<u8> {
    let mut ots = Address::new(layer, tree);
    ots.set_type(Address::TYPE_OTS);
    ots.set_leaf(index);
    let public = hasher.wots_public(sk_seed, pub_seed, ots);
    let mut ltree = Address::new(layer, tree);
    ltree.set_type(Address::TYPE_LTREE);
    ltree.set_leaf(index);
    hasher.ltree(public, pub_seed, &mut ltree)
}

/// Build a complete tree of the given height.
pub(crate) fn build(
    hasher: &Hasher,
    sk_seed: &[u8],
    pub_seed: &[u8],
    layer: u32,
    tree: u64,
    height: u32,
) -> CachedTree {
    let leaves: Vec<Vec<u8>> = (0..1u32 << height)
        .map(|index| leaf(hasher, sk_seed, pub_seed, layer, tree, index))
        .collect();
    let mut levels = vec![leaves];
    let mut address = Address::new(layer, tree);
    address.set_type(Address::TYPE_TREE);
    for child_height in 0..height {
        address.set_chain_or_height(child_height);
        let parents = levels
            .last()
            .map(|children| {
                children
                    .chunks_exact(2)
                    .enumerate()
                    .map(|(index, pair)| {
                        address.set_hash_or_index(index as u32);
                        hasher.rand_hash(&pair[0], &pair[1], pub_seed, &mut address)
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        levels.push(parents);
    }
    CachedTree { tree, levels }
}

/// Climb from a leaf to the root using an authentication path.
pub(crate) fn root_from_path(
    hasher: &Hasher,
    leaf_node: Vec<u8>,
    leaf: u32,
    auth: &[u8],
    pub_seed: &[u8],
    layer: u32,
    tree: u64,
) -> Vec<u8> {
    let mut address = Address::new(layer, tree);
    address.set_type(Address::TYPE_TREE);
    let mut node = leaf_node;
    for (level, sibling) in auth.chunks_exact(hasher.n()).enumerate() {
        address.set_chain_or_height(level as u32);
        address.set_hash_or_index(leaf >> (level + 1));
        node = if (leaf >> level) & 1 == 0 {
            hasher.rand_hash(&node, sibling, pub_seed, &mut address)
        } else {
            hasher.rand_hash(sibling, &node, pub_seed, &mut address)
        };
    }
    node
}

/// Leaf of a WOTS+ public key recovered from a signature.
pub(crate) fn leaf_from_signature(
    hasher: &Hasher,
    ots_signature: &[u8],
    message: &[u8],
    pub_seed: &[u8],
    layer: u32,
    tree: u64,
    index: u32,
) -> Vec<u8> {
    let mut ots = Address::new(layer, tree);
    ots.set_type(Address::TYPE_OTS);
    ots.set_leaf(index);
    let public = hasher.wots_public_from_signature(ots_signature, message, pub_seed, ots);
    let mut ltree = Address::new(layer, tree);
    ltree.set_type(Address::TYPE_LTREE);
    ltree.set_leaf(index);
    hasher.ltree(public, pub_seed, &mut ltree)
}
