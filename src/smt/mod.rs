//! Sparse Merkle Tree
//!
//! Stores only the hashes that differ from the all-empty tree, keyed by
//! `(position, level)`. A plain [`Smt`] silently overwrites an occupied
//! leaf; [`TestSmt`] additionally refuses duplicate leaf insertion and
//! keeps a sorted index of occupied positions, which batch/property tests
//! rely on for uniform leaf sampling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::{hashadd, Hash, HashFn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmtError {
    #[error("leaf already present at position {0}")]
    DuplicateLeaf(u128),

    #[error("level cache for partition {part} has an empty cell at index {index}")]
    IncompleteLevelCache { part: usize, index: usize },
}

/// A sparse Merkle tree of a fixed `depth` (in bits of the hash-plugin
/// output). Node storage is a `(position, level) -> hash` map; level `0` is
/// always the single root cell `(0, 0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smt {
    pub depth: u32,
    pub roothash: Hash,
    nodes: HashMap<(u128, u32), Hash>,
}

impl Smt {
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            roothash: Hash::Empty,
            nodes: HashMap::new(),
        }
    }

    /// Look up the hash at `(pos, level)`, normalizing `pos` to the cell
    /// boundary for that level. Missing cells are `Hash::Empty`.
    pub fn get_hash(&self, pos: u128, level: u32) -> Hash {
        if level == 0 {
            return self.nodes.get(&(0, 0)).cloned().unwrap_or(Hash::Empty);
        }
        if level == self.depth {
            return self.nodes.get(&(pos, level)).cloned().unwrap_or(Hash::Empty);
        }
        let normalized = normalize(pos, self.depth, level);
        self.nodes
            .get(&(normalized, level))
            .cloned()
            .unwrap_or(Hash::Empty)
    }

    fn set_hash(&mut self, pos: u128, level: u32, val: Hash) {
        if val.is_empty() && self.get_hash(pos, level).is_empty() {
            return;
        }
        let removal = val.is_empty();
        let key = if level == 0 {
            (0, 0)
        } else if level == self.depth {
            (pos, level)
        } else {
            (normalize(pos, self.depth, level), level)
        };
        if removal {
            self.nodes.remove(&key);
        } else {
            self.nodes.insert(key, val);
        }
    }

    /// Insert (or, with `revoke`, remove) a leaf and recompute every
    /// ancestor hash up to the root. Returns the new root.
    pub fn add_node(&mut self, hash_fn: &dyn HashFn, new_hash: &Hash, revoke: bool) -> Hash {
        let hash_bm = new_hash.to_int();
        if revoke {
            self.set_hash(hash_bm, self.depth, Hash::Empty);
        } else {
            self.set_hash(hash_bm, self.depth, new_hash.clone());
        }

        for i in 0..self.depth {
            let neighbor_bit = (hash_bm >> i) & 1;
            let (lhash, rhash) = if neighbor_bit == 1 {
                let neighbor = hash_bm & !(1u128 << i);
                (
                    self.get_hash(neighbor, self.depth - i),
                    self.get_hash(hash_bm, self.depth - i),
                )
            } else {
                let neighbor = hash_bm | (1u128 << i);
                (
                    self.get_hash(hash_bm, self.depth - i),
                    self.get_hash(neighbor, self.depth - i),
                )
            };
            let combined = hashadd(hash_fn, &lhash, &rhash);
            self.set_hash(hash_bm, self.depth - i - 1, combined);
        }
        self.roothash = self.get_hash(0, 0);
        self.roothash.clone()
    }

    /// Build a proof of inclusion for `my_hash`: the list of non-empty
    /// sibling hashes bottom-up, plus a bitmap recording which levels had a
    /// real (non-empty) sibling.
    pub fn path(&self, my_hash: &Hash) -> (Vec<Hash>, u128) {
        let mut path = Vec::new();
        let mut path_bm: u128 = 0;
        let hash_bm = my_hash.to_int();

        for i in 0..self.depth {
            let neighbor_bit = (hash_bm >> i) & 1;
            let neighbor = if neighbor_bit == 1 {
                hash_bm & !(1u128 << i)
            } else {
                hash_bm | (1u128 << i)
            };
            let neighbor_hash = self.get_hash(neighbor, self.depth - i);
            if !neighbor_hash.is_empty() {
                path_bm |= 1u128 << i;
                path.push(neighbor_hash);
            }
        }
        (path, path_bm)
    }

    /// Materialize every hash at `cache_level` into a dense, ordered array.
    pub fn construct_lvl_cache(&self, cache_level: u32) -> Vec<Hash> {
        let size = 1usize << cache_level;
        let mut cache = Vec::with_capacity(size);
        for i in 0..size {
            let pos = (i as u128) << (self.depth - cache_level);
            cache.push(self.get_hash(pos, cache_level));
        }
        cache
    }

    /// Collect the sparse rectangular region of `2^cache_depth` hashes at
    /// `start_depth + cache_depth`, rooted under `(pos, start_depth)`,
    /// skipping empty cells. Used to repair several nodes' PoIs at once
    /// without shipping an entire level-cache.
    pub fn construct_sub_cache(
        &self,
        pos: u128,
        start_depth: u32,
        cache_depth: u32,
    ) -> HashMap<(u128, u32), Hash> {
        let mut sub_cache = HashMap::new();
        let count = 1u128 << cache_depth;
        let sub_pos = normalize(pos, self.depth, start_depth);
        let target_depth = start_depth + cache_depth;
        for i in 0..count {
            let tmp_pos = sub_pos | (i << (self.depth - start_depth - cache_depth));
            let h = self.get_hash(tmp_pos, target_depth);
            if h.is_empty() {
                continue;
            }
            let key = if target_depth >= self.depth {
                (tmp_pos, target_depth)
            } else {
                (normalize(tmp_pos, self.depth, target_depth), target_depth)
            };
            sub_cache.insert(key, h);
        }
        sub_cache
    }
}

fn normalize(pos: u128, depth: u32, level: u32) -> u128 {
    let del_bits = (1u128 << (depth - level)) - 1;
    pos & !del_bits
}

/// An [`Smt`] variant for benchmarking/property tests: refuses to overwrite
/// an occupied leaf and tracks a sorted index of occupied positions so
/// tests can sample existing leaves uniformly.
#[derive(Debug, Clone)]
pub struct TestSmt {
    pub smt: Smt,
    leaves: Vec<u128>,
}

impl TestSmt {
    pub fn new(depth: u32) -> Self {
        Self {
            smt: Smt::new(depth),
            leaves: Vec::new(),
        }
    }

    pub fn add_node(&mut self, hash_fn: &dyn HashFn, new_hash: &Hash) -> Result<Hash, SmtError> {
        let pos = new_hash.to_int();
        if let Err(idx) = self.leaves.binary_search(&pos) {
            let root = self.smt.add_node(hash_fn, new_hash, false);
            self.leaves.insert(idx, pos);
            Ok(root)
        } else {
            Err(SmtError::DuplicateLeaf(pos))
        }
    }

    pub fn leaves(&self) -> &[u128] {
        &self.leaves
    }
}
