//! Passive network participant: holds one certificate's proof of
//! inclusion and the CA state it was last told about, and knows how to
//! patch both when that state goes stale.

pub mod cacher;

use std::sync::Arc;

use crate::ca::{PrimeRoot, Update};
use crate::config::RevocConfig;
use crate::hash::{Hash, HashFn};
use crate::proof::{PathBitmap, SmtUtil};

/// Debug-only snapshot of the state just before an update attempt, kept
/// around so a failed sanity check can report what actually happened.
#[derive(Debug, Clone, Default)]
pub struct PreviousUpdateState {
    pub poi: Vec<Hash>,
    pub poi_bm: PathBitmap,
    pub update_hash: Hash,
    pub update_poi: Vec<Hash>,
    pub update_poi_bm: PathBitmap,
    pub update_revoked: bool,
}

impl PreviousUpdateState {
    fn new(poi: Vec<Hash>, poi_bm: PathBitmap) -> Self {
        Self {
            poi,
            poi_bm,
            update_hash: Hash::Empty,
            update_poi: Vec::new(),
            update_poi_bm: 0,
            update_revoked: false,
        }
    }
}

pub struct Node {
    config: Arc<RevocConfig>,
    smtu: SmtUtil,

    pub node_id: u64,
    pub cert: Hash,
    pub smt_part: usize,
    pub poi: Vec<Hash>,
    pub poi_bm: PathBitmap,
    pub smt_roots: Vec<Hash>,
    pub prime_root: PrimeRoot,

    pub revoked: bool,
    pub outdated_poi: bool,
    pub outdated_prime: bool,
    pub lvl_cache_tried: bool,
    pub update_try: u32,

    /// populated only when `config.sanity_checks` is set
    pub previous: Option<PreviousUpdateState>,
}

impl Node {
    pub fn new(
        config: Arc<RevocConfig>,
        hash_fn: Arc<dyn HashFn>,
        node_id: u64,
        smt_part: usize,
        poi: Vec<Hash>,
        poi_bm: PathBitmap,
        smt_roots: Vec<Hash>,
        prime_root: PrimeRoot,
    ) -> Self {
        let depth = config.hash_depth_bits;
        let smtu = SmtUtil::new(hash_fn.clone(), depth);
        let cert = hash_fn.hash(node_id.to_string().as_bytes());
        Self {
            config,
            smtu,
            node_id,
            cert,
            smt_part,
            poi,
            poi_bm,
            smt_roots,
            prime_root,
            revoked: false,
            outdated_poi: false,
            outdated_prime: false,
            lvl_cache_tried: false,
            update_try: 0,
            previous: None,
        }
    }

    /// Exposes this node's proof algebra helper to [`cacher::Cacher`],
    /// which needs to fold/verify level-caches that live alongside (not
    /// inside) the wrapped `Node`.
    pub(crate) fn smtu_helper(&self) -> &SmtUtil {
        &self.smtu
    }

    pub(crate) fn sanity_checks_enabled(&self) -> bool {
        self.config.sanity_checks
    }

    /// Adopt a new prime root, diffing it against the old one to find
    /// which aggregated/main parity lanes moved. Returns the partitions
    /// that lane-diffing identified as possibly changed.
    pub fn set_prime_id_wrong_parts(&mut self, prime_root: PrimeRoot) -> (Vec<usize>, Vec<usize>) {
        if prime_root == self.prime_root {
            return (Vec::new(), Vec::new());
        }
        let wrong_aggr: Vec<usize> = self
            .prime_root
            .aggr_parities
            .iter()
            .zip(prime_root.aggr_parities.iter())
            .enumerate()
            .filter(|(_, (o, n))| o != n)
            .map(|(i, _)| i)
            .collect();
        let wrong_main: Vec<usize> = self
            .prime_root
            .main_parities
            .iter()
            .zip(prime_root.main_parities.iter())
            .enumerate()
            .filter(|(_, (o, n))| o != n)
            .map(|(i, _)| i)
            .collect();

        self.prime_root = prime_root;
        self.outdated_prime = false;
        (wrong_aggr, wrong_main)
    }

    /// Expand parity-lane indices back into the concrete SMT partitions
    /// they cover, paired with this node's current (possibly stale) view
    /// of each root.
    pub fn get_ided_smt_roots(
        &self,
        wrong_aggr_par_parts: &[usize],
        wrong_main_par_parts: &[usize],
    ) -> Vec<(usize, Hash)> {
        let mut selected = Vec::new();
        for &p in wrong_aggr_par_parts {
            for i in 0..self.config.aggregated_parities {
                let smt_part = p * self.config.aggregated_parities + i;
                selected.push((smt_part, self.smt_roots[smt_part].clone()));
            }
        }
        for &p in wrong_main_par_parts {
            let smt_part = self.config.aggregated_parities * self.config.no_aggr_parities + p;
            selected.push((smt_part, self.smt_roots[smt_part].clone()));
        }
        selected
    }

    /// Apply freshly-fetched partition roots. Flags the PoI as outdated if
    /// the one partition this node actually lives in changed. Returns
    /// whether the node's own recomputed prime root now matches what it
    /// was told — `false` means the parity lanes lined up (no aliasing
    /// detected) but the prime hash itself still disagrees, i.e. a parity
    /// collision masked a real divergence.
    pub fn set_ided_smt_roots(&mut self, selected_smt_roots: &[(usize, Hash)]) -> bool {
        for (part, root) in selected_smt_roots {
            if *part == self.smt_part && *root != self.smt_roots[*part] {
                self.outdated_poi = true;
            }
            self.smt_roots[*part] = root.clone();
        }
        self.calc_prime_root() == self.prime_root
    }

    /// Overwrite an arbitrary set of partition roots (used by the
    /// simulator to hand a node a full refresh rather than a diffed one).
    pub fn set_some_smt_roots(&mut self, roots: &[(usize, Hash)]) {
        for (part, root) in roots {
            if *part == self.smt_part && self.smt_roots[*part] != *root {
                self.outdated_poi = true;
            }
            self.smt_roots[*part] = root.clone();
        }
    }

    /// Recompute the prime root from this node's own (possibly stale)
    /// `smt_roots`, the same way the CA computes it from the live SMTs.
    pub fn calc_prime_root(&self) -> PrimeRoot {
        let no_smt_parts = self.config.no_smt_parts;
        let main_parities_count = self.config.main_parities;
        let parity_len = self.config.parity_length_bytes;

        let mut allroots = Vec::new();
        let mut aggr_parities = vec![vec![0u8; parity_len]; self.config.no_aggr_parities];
        let mut main_parities = vec![Vec::new(); main_parities_count];
        let mut aggr_par_part = 0usize;
        let mut main_par_part = 0usize;

        for i in 0..no_smt_parts {
            allroots.extend_from_slice(self.smt_roots[i].as_bytes());
            if i < no_smt_parts - main_parities_count {
                let lane = self.smt_roots[i].parity_lane(parity_len);
                for (acc, b) in aggr_parities[aggr_par_part].iter_mut().zip(lane.iter()) {
                    *acc ^= b;
                }
                if (i + 1) % self.config.aggregated_parities == 0 {
                    aggr_par_part += 1;
                }
            } else {
                main_parities[main_par_part] = self.smt_roots[i].parity_lane(parity_len);
                main_par_part += 1;
            }
        }

        PrimeRoot {
            prime_hash: self.smtu.hash(&allroots),
            aggr_parities,
            main_parities,
        }
    }

    /// Try to patch this node's own PoI using another node's freshly-known
    /// path for the same partition. Returns whether the patched PoI now
    /// folds up to the partition root this node believes is current.
    pub fn try_poi_repair(&mut self, cert: &Hash, poi: &[Hash], poi_bm: PathBitmap) -> bool {
        self.poi_bm = self
            .smtu
            .update_poi_with_poi(&self.cert.clone(), &mut self.poi, self.poi_bm, cert, poi, poi_bm, false);
        self.smt_roots[self.smt_part] == self.smtu.calc_path_root(&self.cert, &self.poi, self.poi_bm, 0, self.revoked)
    }

    /// Try to patch this node's own PoI from a peer's level-cache.
    pub fn try_lvlc_repair(&mut self, lvl_cache: &[Hash], cache_level: u32) -> bool {
        self.smtu.update_poi_with_lvl_cache(&self.cert.clone(), &mut self.poi, lvl_cache, cache_level);
        self.smt_roots[self.smt_part] == self.smtu.calc_path_root(&self.cert, &self.poi, self.poi_bm, 0, self.revoked)
    }

    /// Fold a batch of broadcast updates into this node's own PoI,
    /// adopting the update outright if it's about this node's own
    /// certificate (e.g. the CA just reissued it).
    pub fn process_update(&mut self, update: &[Update]) {
        let mut previous_set = false;
        let mut potential_change = false;

        for u in update {
            if u.smt_part != self.smt_part {
                continue;
            }
            if u.hash == self.cert {
                self.poi = u.poi.clone();
                self.poi_bm = u.poi_bm;
                self.outdated_poi = false;
                break;
            }

            if self.config.sanity_checks && !previous_set {
                self.previous = Some(PreviousUpdateState {
                    update_hash: u.hash.clone(),
                    update_poi: u.poi.clone(),
                    update_poi_bm: u.poi_bm,
                    update_revoked: u.revoked,
                    ..PreviousUpdateState::new(self.poi.clone(), self.poi_bm)
                });
                previous_set = true;
                potential_change = true;
            }

            self.poi_bm = self.smtu.update_poi_with_poi(
                &self.cert.clone(),
                &mut self.poi,
                self.poi_bm,
                &u.hash,
                &u.poi,
                u.poi_bm,
                u.revoked,
            );
        }

        if self.outdated_poi
            && potential_change
            && self.smt_roots[self.smt_part]
                == self.smtu.calc_path_root(&self.cert, &self.poi, self.poi_bm, 0, self.revoked)
        {
            self.outdated_poi = false;
        }

        if self.config.sanity_checks
            && !self.outdated_poi
            && !self.outdated_prime
            && self.smt_roots[self.smt_part]
                != self.smtu.calc_path_root(&self.cert, &self.poi, self.poi_bm, 0, self.revoked)
        {
            tracing::error!(
                node_id = self.node_id,
                potential_change,
                "poi update failed sanity check"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha1Trunc8HashFn;
    use crate::smt::Smt;

    fn config() -> Arc<RevocConfig> {
        let mut cfg = RevocConfig {
            no_smt_parts: 4,
            main_parities: 2,
            aggregated_parities: 1,
            hash_depth_bits: 12,
            ..RevocConfig::default()
        };
        cfg.recalc_derived();
        Arc::new(cfg)
    }

    fn build_node(cfg: Arc<RevocConfig>, hash_fn: Arc<dyn HashFn>, smts: &[Smt], node_id: u64, part: usize) -> Node {
        let cert = hash_fn.hash(node_id.to_string().as_bytes());
        let (poi, poi_bm) = smts[part].path(&cert);
        let roots: Vec<Hash> = smts.iter().map(|s| s.roothash.clone()).collect();
        let mut n = Node::new(cfg, hash_fn, node_id, part, poi, poi_bm, roots, PrimeRoot {
            prime_hash: Hash::Empty,
            aggr_parities: vec![],
            main_parities: vec![],
        });
        n.prime_root = n.calc_prime_root();
        n
    }

    #[test]
    fn process_update_repairs_stale_poi_for_sibling_change() {
        let cfg = config();
        let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
        let mut smts: Vec<Smt> = (0..cfg.no_smt_parts).map(|_| Smt::new(cfg.hash_depth_bits)).collect();
        for i in 0..10 {
            let h = f.hash(format!("seed-{i}").as_bytes());
            smts[0].add_node(f.as_ref(), &h, false);
        }

        let my_cert = f.hash(b"0");
        smts[0].add_node(f.as_ref(), &my_cert, false);
        let mut node = build_node(cfg.clone(), f.clone(), &smts, 0, 0);

        // CA issues a new cert into the same partition; node's stored PoI
        // is now stale with respect to the partition root it's told about.
        let new_h = f.hash(b"freshly-issued");
        smts[0].add_node(f.as_ref(), &new_h, false);
        let (new_poi, new_bm) = smts[0].path(&new_h);

        node.smt_roots[0] = smts[0].roothash.clone();
        node.outdated_poi = true;
        let update = vec![Update {
            smt_part: 0,
            hash: new_h,
            poi: new_poi,
            poi_bm: new_bm,
            revoked: false,
        }];
        node.process_update(&update);

        assert!(!node.outdated_poi);
        assert_eq!(
            node.smt_roots[0],
            node.smtu.calc_path_root(&node.cert, &node.poi, node.poi_bm, 0, node.revoked)
        );
    }

    #[test]
    fn set_prime_id_wrong_parts_detects_aggregate_lane_diff() {
        let cfg = config();
        let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
        let smts: Vec<Smt> = (0..cfg.no_smt_parts).map(|_| Smt::new(cfg.hash_depth_bits)).collect();
        let mut node = build_node(cfg, f, &smts, 1, 0);
        let mut new_prime = node.prime_root.clone();
        new_prime.aggr_parities[0] = vec![0xFF, 0xFF];
        let (aggr, main) = node.set_prime_id_wrong_parts(new_prime);
        assert_eq!(aggr, vec![0]);
        assert!(main.is_empty());
    }
}
