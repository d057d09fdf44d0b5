//! A node that additionally carries a per-partition level-cache, so it can
//! repair peers' PoIs (and its own) via `update_poi_with_lvl_cache`/
//! `update_poi_with_sub_cache` instead of relying solely on peer-PoI or CA
//! fallback repair. Composed around [`Node`] rather than inheriting from
//! it, since Rust has no struct inheritance: a `Cacher` owns a `Node` and
//! re-derives the handful of behaviors the reference implementation
//! overrides.

use crate::ca::{PrimeRoot, Update};
use crate::hash::Hash;
use crate::node::Node;

pub struct Cacher {
    pub node: Node,
    pub cache_level: u32,
    /// one level-cache per SMT partition
    pub lvl_caches: Vec<Vec<Hash>>,
    pub outdated_lvlc: bool,
    pub outdated_roots: Vec<usize>,
    pub update_try_lvlc: u32,
}

impl Cacher {
    pub fn new(node: Node, cache_level: u32, lvl_caches: Vec<Vec<Hash>>) -> Self {
        Self {
            node,
            cache_level,
            lvl_caches,
            outdated_lvlc: false,
            outdated_roots: Vec::new(),
            update_try_lvlc: 0,
        }
    }

    /// Level-caches for the partitions this cacher currently tracks as
    /// requested (mirrors `Ca::get_some_lvl_caches`, but serving out of
    /// this cacher's own local copy rather than the CA's live one).
    pub fn get_some_lvl_caches(&self, outdated_roots: &[usize]) -> Vec<(usize, Vec<Hash>)> {
        outdated_roots
            .iter()
            .map(|&r| (r, self.lvl_caches[r].clone()))
            .collect()
    }

    /// Install a batch of freshly-fetched level-caches and, if sanity
    /// checks are enabled, verify every partition's cache now folds up to
    /// the root this cacher believes is current. Returns `true` if a
    /// mismatch was found (kept as a bool rather than propagated as an
    /// error, matching how the rest of the repair ladder reports failure).
    pub fn update_some_lvl_caches(&mut self, some_lvl_caches: &[(usize, Vec<Hash>)]) -> bool {
        for (part, cache) in some_lvl_caches {
            self.lvl_caches[*part] = cache.clone();
        }

        if self.node_config_sanity_checks() && !self.node.outdated_prime {
            for i in 0..self.node.smt_roots.len() {
                let helper_root = self.node.smtu_helper().lvl_cache_helper(0, 0, &self.lvl_caches[i], self.cache_level);
                if self.node.smt_roots[i] != helper_root {
                    tracing::error!(part = i, "repairing level caches failed sanity check");
                    return true;
                }
            }
        }
        false
    }

    /// Fold each broadcast update into this cacher's level-cache for its
    /// partition, then fall through to the normal node update path.
    pub fn process_update(&mut self, update: &[Update]) {
        for u in update {
            self.node.smtu_helper().update_lvl_cache_with_poi(
                &u.hash,
                &u.poi,
                u.poi_bm,
                &mut self.lvl_caches[u.smt_part],
                self.cache_level,
                u.revoked,
            );
        }

        if self.outdated_lvlc && !self.node.outdated_prime {
            self.outdated_lvlc = (0..self.node.smt_roots.len()).any(|i| {
                self.node.smt_roots[i] != self.node.smtu_helper().lvl_cache_helper(0, 0, &self.lvl_caches[i], self.cache_level)
            });
        }

        if self.node_config_sanity_checks() && !self.outdated_lvlc && !self.node.outdated_prime {
            for i in 0..self.node.smt_roots.len() {
                if self.node.smt_roots[i] != self.node.smtu_helper().lvl_cache_helper(0, 0, &self.lvl_caches[i], self.cache_level) {
                    tracing::error!(part = i, node_id = self.node.node_id, "level caches out of sync after update");
                    break;
                }
            }
        }

        self.node.process_update(update);
    }

    /// Overrides [`Node::set_prime_id_wrong_parts`]: any prime-root change
    /// also marks the level-caches suspect, since they cover every
    /// partition and a changed root anywhere invalidates their own
    /// self-consistency check.
    pub fn set_prime_id_wrong_parts(&mut self, prime_root: PrimeRoot) -> (Vec<usize>, Vec<usize>) {
        if prime_root != self.node.prime_root {
            self.outdated_lvlc = true;
        }
        self.node.set_prime_id_wrong_parts(prime_root)
    }

    /// Overrides [`Node::set_ided_smt_roots`]: also records which
    /// partitions actually changed, so `get_some_lvl_caches` knows what to
    /// re-request.
    pub fn set_ided_smt_roots(&mut self, selected_smt_roots: &[(usize, Hash)]) -> bool {
        self.outdated_roots = selected_smt_roots
            .iter()
            .filter(|(part, root)| *root != self.node.smt_roots[*part])
            .map(|(part, _)| *part)
            .collect();
        self.node.set_ided_smt_roots(selected_smt_roots)
    }

    fn node_config_sanity_checks(&self) -> bool {
        self.node.sanity_checks_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::Ca;
    use crate::config::RevocConfig;
    use crate::hash::{HashFn, Sha1Trunc8HashFn};
    use std::sync::Arc;

    fn config() -> Arc<RevocConfig> {
        let mut cfg = RevocConfig {
            no_smt_parts: 4,
            main_parities: 2,
            aggregated_parities: 1,
            hash_depth_bits: 12,
            passive_nodes: 0,
            start_no_nodes: 20,
            cache_level: 3,
            ..RevocConfig::default()
        };
        cfg.recalc_derived();
        Arc::new(cfg)
    }

    #[test]
    fn cacher_repairs_its_own_poi_from_its_own_level_cache() {
        let cfg = config();
        let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
        let mut ca = Ca::new(cfg.clone(), f.clone());
        ca.initialize();

        let (poi, poi_bm) = ca.get_node_poi(0, 0);
        let node = Node::new(cfg.clone(), f.clone(), 0, 0, poi, poi_bm, ca.get_smt_roots(), ca.get_prime());
        let lvl_caches = ca.get_lvl_caches(cfg.cache_level);
        let mut cacher = Cacher::new(node, cfg.cache_level, lvl_caches);

        // CA moves on without telling the cacher.
        for i in 100..110 {
            ca.add_node(i, 0, false);
        }
        cacher.node.smt_roots[0] = ca.get_a_smt_root(0);

        let fresh_cache = ca.get_lvl_caches(cfg.cache_level);
        cacher.lvl_caches[0] = fresh_cache[0].clone();

        assert!(cacher.node.try_lvlc_repair(&cacher.lvl_caches[0], cfg.cache_level));
    }
}
