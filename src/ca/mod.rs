//! Certificate authority: owns the partitioned SMT forest and the
//! aggregated "prime root" that lets a node detect, in one small message,
//! which of its partitions might have changed.

use std::sync::Arc;

use thiserror::Error;

use crate::config::RevocConfig;
use crate::hash::{Hash, HashFn};
use crate::node::Node;
use crate::proof::{PathBitmap, SmtUtil};
use crate::smt::Smt;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaError {
    #[error("no such SMT partition: {0}")]
    InvalidPartition(usize),
}

/// `(prime_hash, aggregated parity lanes, main/uncompressed parity lanes)`.
///
/// `aggr_parities[i]` is the XOR of the parity lanes of `aggregated_parities`
/// consecutive partition roots; `main_parities[i]` is one trailing
/// partition's parity lane, uncompressed. A node that sees its prime root
/// change can tell from which lanes differ exactly which partitions (or
/// which aggregated group of them) to re-fetch, without downloading every
/// partition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeRoot {
    pub prime_hash: Hash,
    pub aggr_parities: Vec<Vec<u8>>,
    pub main_parities: Vec<Vec<u8>>,
}

/// One entry of a revocation/reissue broadcast: a node's freshly-known
/// path in one partition, to be folded into every recipient's own PoI.
#[derive(Debug, Clone)]
pub struct Update {
    pub smt_part: usize,
    pub hash: Hash,
    pub poi: Vec<Hash>,
    pub poi_bm: PathBitmap,
    pub revoked: bool,
}

pub struct Ca {
    config: Arc<RevocConfig>,
    hash_fn: Arc<dyn HashFn>,
    smtu: SmtUtil,
    smts: Vec<Smt>,
    prime_root: Option<PrimeRoot>,
}

impl Ca {
    pub fn new(config: Arc<RevocConfig>, hash_fn: Arc<dyn HashFn>) -> Self {
        let depth = config.hash_depth_bits;
        let smtu = SmtUtil::new(hash_fn.clone(), depth);
        let smts = (0..config.no_smt_parts).map(|_| Smt::new(depth)).collect();
        Self {
            config,
            hash_fn,
            smtu,
            smts,
            prime_root: None,
        }
    }

    fn cert_for(&self, node_id: u64) -> Hash {
        self.hash_fn.hash(node_id.to_string().as_bytes())
    }

    /// Populate the passive backdrop (`passive_nodes` certs, round-robined
    /// across partitions) and the active simulated population
    /// (`start_no_nodes`), then compute the initial prime root. Passive
    /// nodes never take part in the simulation; they exist purely to give
    /// every partition realistic occupancy.
    pub fn initialize(&mut self) {
        for i in 0..self.config.passive_nodes {
            let cert = self.hash_fn.hash((10_000_000_000u64 + i).to_string().as_bytes());
            let part = (i % self.config.no_smt_parts as u64) as usize;
            self.smts[part].add_node(self.hash_fn.as_ref(), &cert, false);
        }
        for i in 0..self.config.start_no_nodes {
            let cert = self.cert_for(i);
            let part = (i % self.config.no_smt_parts as u64) as usize;
            self.smts[part].add_node(self.hash_fn.as_ref(), &cert, false);
        }
        self.calc_prime_root();
    }

    /// Recompute the prime root from every partition's current root hash.
    pub fn calc_prime_root(&mut self) {
        let no_smt_parts = self.smts.len();
        let main_parities_count = self.config.main_parities;
        let parity_len = self.config.parity_length_bytes;

        let mut allroots = Vec::new();
        let mut aggr_parities = vec![vec![0u8; parity_len]; self.config.no_aggr_parities];
        let mut main_parities = vec![Vec::new(); main_parities_count];
        let mut aggr_par_part = 0usize;
        let mut main_par_part = 0usize;

        for i in 0..no_smt_parts {
            allroots.extend_from_slice(self.smts[i].roothash.as_bytes());
            if i < no_smt_parts - main_parities_count {
                let lane = self.smts[i].roothash.parity_lane(parity_len);
                for (acc, b) in aggr_parities[aggr_par_part].iter_mut().zip(lane.iter()) {
                    *acc ^= b;
                }
                if (i + 1) % self.config.aggregated_parities == 0 {
                    aggr_par_part += 1;
                }
            } else {
                main_parities[main_par_part] = self.smts[i].roothash.parity_lane(parity_len);
                main_par_part += 1;
            }
        }

        let prime_hash = self.hash_fn.hash(&allroots);
        self.prime_root = Some(PrimeRoot {
            prime_hash,
            aggr_parities,
            main_parities,
        });
    }

    pub fn get_smt_roots(&self) -> Vec<Hash> {
        self.smts.iter().map(|s| s.roothash.clone()).collect()
    }

    pub fn get_prime(&self) -> PrimeRoot {
        self.prime_root.clone().expect("calc_prime_root must run before get_prime")
    }

    pub fn get_a_smt_root(&self, smt_part: usize) -> Hash {
        self.smts[smt_part].roothash.clone()
    }

    /// Build a fresh PoI for `node_id` in partition `part`.
    pub fn get_node_poi(&self, node_id: u64, part: usize) -> (Vec<Hash>, PathBitmap) {
        let cert = self.cert_for(node_id);
        let (poi, poi_bm) = self.smts[part].path(&cert);
        if self.config.sanity_checks && poi.iter().any(Hash::is_empty) {
            tracing::error!(node_id, part, "empty hash in constructed poi");
        }
        (poi, poi_bm)
    }

    /// Issue or revoke `node_id` in `part` and roll the prime root forward.
    pub fn add_node(&mut self, node_id: u64, part: usize, revoke: bool) {
        let cert = self.cert_for(node_id);
        crate::logging::log_revocation_event(part, &cert.to_hex(), revoke);
        self.smts[part].add_node(self.hash_fn.as_ref(), &cert, revoke);
        self.calc_prime_root();
    }

    pub fn get_lvl_caches(&self, cache_level: u32) -> Vec<Vec<Hash>> {
        self.smts.iter().map(|s| s.construct_lvl_cache(cache_level)).collect()
    }

    /// Re-issue revoked nodes into the newest (rotating) partition.
    pub fn reissue_nodes(&mut self, nodes: &mut [&mut Node]) {
        let latest = self.config.no_smt_parts - 1;
        for n in nodes.iter_mut() {
            n.smt_part = latest;
            n.revoked = false;
            self.add_node(n.node_id, n.smt_part, false);
        }
        tracing::info!(count = nodes.len(), "re-issued nodes");
    }

    pub fn revoke_nodes(&mut self, nodes: &mut [&mut Node]) {
        for n in nodes.iter_mut() {
            n.revoked = true;
            self.add_node(n.node_id, n.smt_part, true);
        }
        tracing::info!(count = nodes.len(), "revoked nodes");
    }

    /// Build the broadcast payload for a batch of re-issued/revoked nodes.
    pub fn construct_update(&self, nodes: &[&Node], revoke: bool) -> Vec<Update> {
        nodes
            .iter()
            .map(|n| {
                let (poi, poi_bm) = self.get_node_poi(n.node_id, n.smt_part);
                Update {
                    smt_part: n.smt_part,
                    hash: n.cert.clone(),
                    poi,
                    poi_bm,
                    revoked: revoke,
                }
            })
            .collect()
    }

    /// Count the distinct hashes across a batch of updates' PoIs, for
    /// bandwidth accounting (a receiver could dedupe before storing).
    pub fn get_unique_hash_count(&self, update: &[Update]) -> usize {
        let mut unique: std::collections::HashSet<Hash> = std::collections::HashSet::new();
        for u in update {
            for h in &u.poi {
                unique.insert(h.clone());
            }
        }
        unique.len()
    }

    /// Rotate the partition ring: the oldest partition becomes the newest
    /// (and empties out over subsequent reissues), everything else shifts
    /// one slot older. Models weekly partition rollover.
    pub fn epoch_tree_change(&mut self) {
        self.smts.rotate_left(1);
        self.calc_prime_root();
    }

    /// Level-caches for just the partitions a node's prime-root diff
    /// flagged as outdated.
    pub fn get_some_lvl_caches(&self, outdated_roots: &[usize]) -> Vec<(usize, Vec<Hash>)> {
        let lvl_caches = self.get_lvl_caches(self.config.cache_level);
        outdated_roots
            .iter()
            .map(|&r| (r, lvl_caches[r].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha1Trunc8HashFn;

    fn small_config() -> RevocConfig {
        let mut cfg = RevocConfig {
            no_smt_parts: 6,
            main_parities: 2,
            aggregated_parities: 2,
            passive_nodes: 0,
            start_no_nodes: 12,
            hash_depth_bits: 16,
            cache_level: 3,
            ..RevocConfig::default()
        };
        cfg.recalc_derived();
        cfg
    }

    #[test]
    fn initialize_populates_every_partition_round_robin() {
        let cfg = Arc::new(small_config());
        let mut ca = Ca::new(cfg.clone(), Arc::new(Sha1Trunc8HashFn));
        ca.initialize();
        let roots = ca.get_smt_roots();
        assert_eq!(roots.len(), 6);
        assert!(roots.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn add_node_changes_partition_root_and_prime_root() {
        let cfg = Arc::new(small_config());
        let mut ca = Ca::new(cfg, Arc::new(Sha1Trunc8HashFn));
        ca.initialize();
        let prime_before = ca.get_prime();
        ca.add_node(999, 0, false);
        let prime_after = ca.get_prime();
        assert_ne!(prime_before.prime_hash, prime_after.prime_hash);
    }

    #[test]
    fn revoking_a_node_removes_it_from_its_path() {
        let cfg = Arc::new(small_config());
        let mut ca = Ca::new(cfg, Arc::new(Sha1Trunc8HashFn));
        ca.initialize();
        let root_before = ca.get_a_smt_root(0);
        ca.add_node(0, 0, true);
        let root_after = ca.get_a_smt_root(0);
        assert_ne!(root_before, root_after);
    }

    #[test]
    fn epoch_tree_change_rotates_partitions() {
        let cfg = Arc::new(small_config());
        let mut ca = Ca::new(cfg, Arc::new(Sha1Trunc8HashFn));
        ca.initialize();
        let roots_before = ca.get_smt_roots();
        ca.epoch_tree_change();
        let roots_after = ca.get_smt_roots();
        assert_eq!(roots_after[0], roots_before[1]);
        assert_eq!(roots_after[5], roots_before[0]);
    }
}
