//! Proof-of-inclusion algebra.
//!
//! Everything a node needs to verify and repair its own PoI without ever
//! touching the authoritative SMT: folding a path back into a root,
//! patching a path with another node's path, a peer's level-cache, or a
//! sparse subtree-cache, and the reverse direction (patching a level-cache
//! from a single PoI). None of this carries shared mutable state; every
//! operation takes its inputs by reference/value and returns the updated
//! bitmap, so callers own the handoff.

use std::collections::HashMap;
use std::sync::Arc;

use crate::hash::{hashadd, Hash, HashFn};

/// Bit `b` (0-indexed from the LSB) records whether the sibling `b` levels
/// above the leaf is present in the accompanying path. Levels with an
/// empty sibling contribute no entry, which is what keeps a PoI's length
/// proportional to how crowded the tree is near that leaf rather than to
/// `depth`.
pub type PathBitmap = u128;

/// Stateless helper bound to one hash function and tree depth. Every
/// method takes proof data by value/reference and returns updated data;
/// nothing here is mutated behind the caller's back.
pub struct SmtUtil {
    hash_fn: Arc<dyn HashFn>,
    pub depth: u32,
}

impl SmtUtil {
    pub fn new(hash_fn: Arc<dyn HashFn>, depth: u32) -> Self {
        Self { hash_fn, depth }
    }

    fn hf(&self) -> &dyn HashFn {
        self.hash_fn.as_ref()
    }

    /// Hash arbitrary bytes with the wrapped hash function. Exposed so
    /// callers that need the prime root's own concatenate-then-hash step
    /// (which isn't a `hashadd` of exactly two node hashes) don't need to
    /// carry a second `Arc<dyn HashFn>` around.
    pub fn hash(&self, input: &[u8]) -> Hash {
        self.hf().hash(input)
    }

    fn leaf_bit(&self, path_bm: PathBitmap, dist_from_leaf: u32) -> u128 {
        (path_bm >> dist_from_leaf) & 1
    }

    fn root_bit(&self, path_bm: PathBitmap, dist_from_root: u32) -> u128 {
        (path_bm >> (self.depth - 1 - dist_from_root)) & 1
    }

    /// Fold `path` onto `my_hash` to recompute a root, stopping `lvl`
    /// levels short of the true root (`lvl = 0` yields the full root).
    /// Used both for full verification and, with `lvl > 0`, to compute a
    /// node's contribution to a partial subtree (e.g. a level-cache cell).
    pub fn calc_path_root(
        &self,
        my_hash: &Hash,
        path: &[Hash],
        path_bm: PathBitmap,
        lvl: u32,
        revoked: bool,
    ) -> Hash {
        let hash_bm = my_hash.to_int();
        let mut result = if revoked { Hash::Empty } else { my_hash.clone() };
        let mut next = 0usize;

        for i in 0..(self.depth - lvl) {
            let neighbor_hash = if self.leaf_bit(path_bm, i) == 1 {
                let h = path[next].clone();
                next += 1;
                h
            } else {
                Hash::Empty
            };
            let target_is_right = (hash_bm >> i) & 1;
            result = if target_is_right == 1 {
                hashadd(self.hf(), &neighbor_hash, &result)
            } else {
                hashadd(self.hf(), &result, &neighbor_hash)
            };
        }
        result
    }

    /// Patch `my_path`/`my_path_bm` using another node's freshly-known path
    /// for `new_hash`, and return the updated bitmap. Finds the highest
    /// tree level at which the two leaves diverge, copies any shared
    /// lower-level siblings across from `new_path` (they must already
    /// agree), then inserts, updates, or removes the one element at the
    /// split level depending on whether `new_path` has a sibling there.
    pub fn update_poi_with_poi(
        &self,
        my_hash: &Hash,
        my_path: &mut Vec<Hash>,
        my_path_bm: PathBitmap,
        new_hash: &Hash,
        new_path: &[Hash],
        new_path_bm: PathBitmap,
        revoked: bool,
    ) -> PathBitmap {
        let my_hash_bm = my_hash.to_int();
        let new_hash_bm = new_hash.to_int();
        let xor_hash = my_hash_bm ^ new_hash_bm;
        let and_path = my_path_bm & new_path_bm;

        let target_pos = (0..self.depth).find(|&i| (xor_hash >> (self.depth - 1 - i)) & 1 == 1);
        let target_pos = match target_pos {
            Some(t) => t,
            // identical leaves: nothing to reconcile
            None => return my_path_bm,
        };

        let mut path_bm = my_path_bm;
        let mut path_count: u32 = 0;
        let mut is_update = false;
        let mut is_removal = false;

        for i in 0..self.depth {
            let bit = self.root_bit(and_path, i);
            if bit == 1 {
                if i < target_pos {
                    path_count += 1;
                    let li = my_path.len() - path_count as usize;
                    let ni = new_path.len() - path_count as usize;
                    my_path[li] = new_path[ni].clone();
                } else if i == target_pos {
                    path_count += 1;
                    if new_path.len() as u32 == path_count {
                        path_count -= 1;
                        is_removal = true;
                    } else {
                        is_update = true;
                    }
                    break;
                } else {
                    is_update = false;
                    if self.root_bit(new_path_bm, target_pos) == 0 {
                        is_removal = true;
                    }
                    break;
                }
            }
            if i == self.depth - 1 {
                let new_has = self.root_bit(new_path_bm, target_pos) == 1;
                let my_has = self.root_bit(path_bm, target_pos) == 1;
                if !new_has && my_has {
                    is_removal = true;
                } else if new_has && !my_has {
                    // insert; nothing to locate yet
                } else {
                    let found_bit = ((target_pos + 1)..self.depth)
                        .any(|j| self.root_bit(new_path_bm, j) == 1);
                    if !found_bit {
                        return path_bm;
                    }
                    path_count += 1;
                    is_update = true;
                }
            }
        }

        let update_hash = if is_removal {
            None
        } else {
            Some(self.calc_path_root(new_hash, new_path, new_path_bm, target_pos + 1, revoked))
        };

        if is_update {
            let idx = my_path.len() - path_count as usize;
            my_path[idx] = update_hash.expect("update branch always computes a replacement hash");
        } else if !is_removal {
            let idx = my_path.len() - path_count as usize;
            my_path.insert(idx, update_hash.expect("insert branch always computes a hash"));
            path_bm |= 1u128 << (self.depth - 1 - target_pos);
        } else {
            let idx = my_path.len() - path_count as usize - 1;
            my_path.remove(idx);
            path_bm &= !(1u128 << (self.depth - 1 - target_pos));
        }

        path_bm
    }

    /// Fold a node's path into `lvl_cache` at `cache_level`, replacing the
    /// one cell that node's leaf falls under.
    pub fn update_lvl_cache_with_poi(
        &self,
        new_hash: &Hash,
        new_path: &[Hash],
        new_path_bm: PathBitmap,
        lvl_cache: &mut [Hash],
        cache_level: u32,
        revoked: bool,
    ) {
        let new_cache_hash = self.calc_path_root(new_hash, new_path, new_path_bm, cache_level, revoked);
        let part_no = (new_hash.to_int() >> (self.depth - cache_level)) as usize;
        lvl_cache[part_no] = new_cache_hash;
    }

    /// Reconstruct the `cache_level` siblings of `my_path` from a peer's
    /// level-cache. Assumes the cache is complete and current.
    pub fn update_poi_with_lvl_cache(
        &self,
        my_hash: &Hash,
        my_path: &mut [Hash],
        lvl_cache: &[Hash],
        cache_level: u32,
    ) {
        let my_hash_bm = my_hash.to_int();
        let del_bits = (1u128 << (self.depth - cache_level)) - 1;
        let part_no = (my_hash_bm & !del_bits) >> (self.depth - cache_level);
        let mask = (1u128 << cache_level) - 1;
        let mut part_no_neg = (!part_no) & mask;

        for i in 0..cache_level {
            let calc_hash = self.lvl_cache_helper(part_no_neg, i + 1, lvl_cache, cache_level);
            let idx = my_path.len() - 1 - i as usize;
            my_path[idx] = calc_hash;
            part_no_neg ^= 1u128 << (cache_level - 1 - i);
        }
    }

    /// Rebuild the sub-root of a dense level-cache under `target`,
    /// recursing down to `cache_level` where the cache cells are looked up
    /// directly.
    pub fn lvl_cache_helper(&self, target: u128, on_lvl: u32, lvl_cache: &[Hash], cache_level: u32) -> Hash {
        if on_lvl >= cache_level {
            return lvl_cache[target as usize].clone();
        }
        let bit = 1u128 << (cache_level - 1 - on_lvl);
        let target_left = target & !bit;
        let target_right = target | bit;
        let left = self.lvl_cache_helper(target_left, on_lvl + 1, lvl_cache, cache_level);
        let right = self.lvl_cache_helper(target_right, on_lvl + 1, lvl_cache, cache_level);
        hashadd(self.hf(), &left, &right)
    }

    /// Look up `(pos, level)` in a sparse subtree-cache, normalizing `pos`
    /// the same way [`crate::smt::Smt::get_hash`] does.
    pub fn get_hash_dict(&self, pos: u128, level: u32, posdict: &HashMap<(u128, u32), Hash>) -> Hash {
        let key = if level >= self.depth {
            (pos, level)
        } else {
            let del_bits = (1u128 << (self.depth - level)) - 1;
            (pos & !del_bits, level)
        };
        posdict.get(&key).cloned().unwrap_or(Hash::Empty)
    }

    /// Patch `my_path`/`my_path_bm` using every entry of a subtree-cache
    /// that crosses `my_hash`'s path, starting at `start_depth` (the
    /// cache's rectangular region root, in root-distance coordinates).
    pub fn update_poi_with_sub_cache(
        &self,
        my_hash: &Hash,
        my_path: &mut Vec<Hash>,
        my_path_bm: PathBitmap,
        start_depth: u32,
        sub_cache: &HashMap<(u128, u32), Hash>,
    ) -> PathBitmap {
        let my_hash_bm = my_hash.to_int();
        let mut path_bm = my_path_bm;

        for &(pos, entry_depth) in sub_cache.keys() {
            let xor_hash = my_hash_bm ^ pos;
            let mut target_pos: Option<u32> = None;
            for i in 0..entry_depth {
                if (xor_hash >> (self.depth - 1 - i)) & 1 == 1 {
                    if i >= start_depth {
                        target_pos = Some(i);
                    }
                    break;
                }
            }
            let target_pos = match target_pos {
                Some(t) => t,
                None => continue,
            };

            let update_hash = self.sub_cache_helper(pos, target_pos + 1, sub_cache, entry_depth);

            let mut path_count: u32 = 0;
            let mut is_update = false;
            for i in 0..=target_pos {
                if self.root_bit(path_bm, i) == 1 {
                    path_count += 1;
                    if i == target_pos {
                        is_update = true;
                        break;
                    }
                }
            }

            if is_update {
                let idx = my_path.len() - path_count as usize;
                my_path[idx] = update_hash;
            } else {
                let idx = my_path.len() - path_count as usize;
                my_path.insert(idx, update_hash);
                path_bm |= 1u128 << (self.depth - target_pos - 1);
            }
        }
        path_bm
    }

    fn sub_cache_helper(
        &self,
        target: u128,
        on_lvl: u32,
        sub_cache: &HashMap<(u128, u32), Hash>,
        target_depth: u32,
    ) -> Hash {
        if on_lvl >= target_depth {
            return self.get_hash_dict(target, on_lvl, sub_cache);
        }
        let bit = 1u128 << (self.depth - 1 - on_lvl);
        let target_left = target & !bit;
        let target_right = target | bit;
        let left = self.sub_cache_helper(target_left, on_lvl + 1, sub_cache, target_depth);
        let right = self.sub_cache_helper(target_right, on_lvl + 1, sub_cache, target_depth);
        hashadd(self.hf(), &left, &right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha1Trunc8HashFn;
    use crate::smt::Smt;

    fn util(depth: u32) -> SmtUtil {
        SmtUtil::new(Arc::new(Sha1Trunc8HashFn), depth)
    }

    #[test]
    fn calc_path_root_matches_smt_root_after_insertion() {
        let f = Sha1Trunc8HashFn;
        let depth = 8;
        let mut smt = Smt::new(depth);
        let u = util(depth);
        let mut my_hash = Hash::Empty;
        for i in 0..15 {
            let h = f.hash(format!("node-{i}").as_bytes());
            smt.add_node(&f, &h, false);
            if i == 7 {
                my_hash = h;
            }
        }
        let (path, bm) = smt.path(&my_hash);
        let root = u.calc_path_root(&my_hash, &path, bm, 0, false);
        assert_eq!(root, smt.roothash);
    }

    #[test]
    fn update_poi_with_poi_repairs_stale_proof() {
        let f = Sha1Trunc8HashFn;
        let depth = 8;
        let mut smt = Smt::new(depth);
        let u = util(depth);

        let my_hash = f.hash(b"node-a");
        smt.add_node(&f, &my_hash, false);
        let (mut my_path, mut my_bm) = smt.path(&my_hash);

        // CA moves on: a new cert is issued into the same tree.
        let new_hash = f.hash(b"node-b");
        smt.add_node(&f, &new_hash, false);
        let (new_path, new_bm) = smt.path(&new_hash);

        my_bm = u.update_poi_with_poi(&my_hash, &mut my_path, my_bm, &new_hash, &new_path, new_bm, false);

        let recomputed = u.calc_path_root(&my_hash, &my_path, my_bm, 0, false);
        assert_eq!(recomputed, smt.roothash);
    }

    #[test]
    fn update_poi_with_lvl_cache_repairs_proof() {
        let f = Sha1Trunc8HashFn;
        let depth = 8;
        let cache_level = 4;
        let mut smt = Smt::new(depth);
        let u = util(depth);

        let my_hash = f.hash(b"node-a");
        smt.add_node(&f, &my_hash, false);
        let (mut my_path, my_bm) = smt.path(&my_hash);

        for i in 0..20 {
            let h = f.hash(format!("node-extra-{i}").as_bytes());
            smt.add_node(&f, &h, false);
        }

        let lvl_cache = smt.construct_lvl_cache(cache_level);
        u.update_poi_with_lvl_cache(&my_hash, &mut my_path, &lvl_cache, cache_level);

        let recomputed = u.calc_path_root(&my_hash, &my_path, my_bm, 0, false);
        assert_eq!(recomputed, smt.roothash);
        // silence unused warning for bm binding style consistency
        let _ = my_bm;
    }

    #[test]
    fn lvl_cache_helper_reconstructs_root_from_cache() {
        let f = Sha1Trunc8HashFn;
        let depth = 8;
        let cache_level = 5;
        let mut smt = Smt::new(depth);
        let u = util(depth);
        for i in 0..30 {
            let h = f.hash(format!("node-{i}").as_bytes());
            smt.add_node(&f, &h, false);
        }
        let lvl_cache = smt.construct_lvl_cache(cache_level);
        let root = u.lvl_cache_helper(0, 0, &lvl_cache, cache_level);
        assert_eq!(root, smt.roothash);
    }

    #[test]
    fn update_poi_with_sub_cache_repairs_proof() {
        let f = Sha1Trunc8HashFn;
        let depth = 8;
        let mut smt = Smt::new(depth);
        let u = util(depth);

        let my_hash = f.hash(b"node-a");
        smt.add_node(&f, &my_hash, false);
        let (mut my_path, mut my_bm) = smt.path(&my_hash);

        for i in 0..10 {
            let h = f.hash(format!("node-extra-{i}").as_bytes());
            smt.add_node(&f, &h, false);
        }

        let sub_cache = smt.construct_sub_cache(0, 0, 6);
        my_bm = u.update_poi_with_sub_cache(&my_hash, &mut my_path, my_bm, 0, &sub_cache);

        let recomputed = u.calc_path_root(&my_hash, &my_path, my_bm, 0, false);
        assert_eq!(recomputed, smt.roothash);
    }
}
