//! Key generator cache.
//!
//! Generators are memoised per spec for the lifetime of the factory.
//! Building one can be expensive (finite-field domain generation) and some
//! carry state that later keys depend on (a DSA or DH generator's domain),
//! so repeated requests for an equal spec must return the same instance.
//! Entries are never evicted; the spec space is finite.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use loom_primitives::keypair::KeyPairGenerator;
use loom_primitives::keys::{KeyGenerator, KeyType};
use loom_primitives::spec::{AsymKeySpec, MacSpec, StreamKeyType, SymKeySpec};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// One partition of the cache.
struct Partition<K, G> {
    entries: Mutex<HashMap<K, Arc<G>>>,
}

impl<K: Eq + Hash + Copy + std::fmt::Debug, G> Partition<K, G> {
    fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn get_or_insert(&self, key: K, make: impl FnOnce() -> G) -> Arc<G> {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(key).or_insert_with(|| {
            debug!(spec = ?key, "caching generator");
            Arc::new(make())
        }))
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Memoised generators, partitioned by symmetric key, stream key, MAC and
/// key pair.
pub struct KeyGeneratorCache {
    symmetric: Partition<SymKeySpec, KeyGenerator>,
    stream: Partition<StreamKeyType, KeyGenerator>,
    mac: Partition<MacSpec, KeyGenerator>,
    key_pair: Partition<AsymKeySpec, KeyPairGenerator>,
}

impl Default for KeyGeneratorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGeneratorCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            symmetric: Partition::new(),
            stream: Partition::new(),
            mac: Partition::new(),
            key_pair: Partition::new(),
        }
    }

    /// Cached generator for `key_type`, built by `make` on first request.
    pub fn key_generator(&self, key_type: KeyType, make: impl FnOnce() -> KeyGenerator) -> Arc<KeyGenerator> {
        match key_type {
            KeyType::Symmetric(spec) => self.symmetric.get_or_insert(spec, make),
            KeyType::Stream(spec) => self.stream.get_or_insert(spec, make),
            KeyType::Mac(spec) => self.mac.get_or_insert(spec, make),
        }
    }

    /// Cached key-pair generator for `spec`, built by `make` on first
    /// request.
    pub fn key_pair_generator(
        &self,
        spec: AsymKeySpec,
        make: impl FnOnce() -> KeyPairGenerator,
    ) -> Arc<KeyPairGenerator> {
        self.key_pair.get_or_insert(spec, make)
    }

    /// Number of cached generators across all partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symmetric.len() + self.stream.len() + self.mac.len() + self.key_pair.len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for KeyGeneratorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGeneratorCache")
            .field("symmetric", &self.symmetric.len())
            .field("stream", &self.stream.len())
            .field("mac", &self.mac.len())
            .field("key_pair", &self.key_pair.len())
            .finish()
    }
}
