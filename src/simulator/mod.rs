//! Drives the `epoch ⊃ sub_epoch ⊃ time_step` simulation: issues and revokes
//! certificates against the [`Ca`], broadcasts updates to a fraction of the
//! simulated population, and lets the rest discover divergence through
//! random peer encounters, running the repair ladder (level-cache → peer
//! PoI → CA fallback) until every node is fresh again.
//!
//! A node is either a plain [`Node`] or a [`Cacher`]; since Rust has no
//! struct inheritance, [`Participant`] wraps whichever one a given
//! simulated identity actually is. Every encounter exchanges data by owned
//! value (clones out of the peer, then applies to the outdated side) rather
//! than by shared reference, mirroring the no-aliasing handoff rule this
//! crate's SMT/proof algebra depends on.

pub mod metrics;

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ca::{Ca, Update};
use crate::config::RevocConfig;
use crate::hash::{Hash, HashFn};
use crate::node::cacher::Cacher;
use crate::node::Node;
use crate::smt::SmtError;

pub use metrics::{Metrics, SimulationReport};

/// A simulated network identity: either a plain node or a cache-carrying
/// node. Composition over inheritance — see module docs.
pub enum Participant {
    Plain(Node),
    Cacher(Cacher),
}

impl Participant {
    pub fn node(&self) -> &Node {
        match self {
            Participant::Plain(n) => n,
            Participant::Cacher(c) => &c.node,
        }
    }

    pub fn node_mut(&mut self) -> &mut Node {
        match self {
            Participant::Plain(n) => n,
            Participant::Cacher(c) => &mut c.node,
        }
    }

    pub fn as_cacher(&self) -> Option<&Cacher> {
        match self {
            Participant::Cacher(c) => Some(c),
            Participant::Plain(_) => None,
        }
    }

    pub fn as_cacher_mut(&mut self) -> Option<&mut Cacher> {
        match self {
            Participant::Cacher(c) => Some(c),
            Participant::Plain(_) => None,
        }
    }

    pub fn is_cacher(&self) -> bool {
        matches!(self, Participant::Cacher(_))
    }

    fn process_update(&mut self, update: &[Update], update_per_part: &[Vec<Update>]) {
        match self {
            Participant::Cacher(c) => c.process_update(update),
            Participant::Plain(n) => {
                let part = n.smt_part;
                n.process_update(&update_per_part[part]);
            }
        }
    }
}

/// Borrow `slice[indices[k]]` mutably for every `k`, without unsafe code.
/// Indices must be pairwise distinct (guaranteed by sampling without
/// replacement); duplicates would otherwise alias, so this panics instead.
/// Returns the references in ascending-index order, not caller order —
/// fine for the reissue/revoke batches this feeds, which don't care about
/// relative order among themselves.
fn distinct_nodes_mut<'a>(slice: &'a mut [Participant], indices: &[usize]) -> Vec<&'a mut Node> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        panic!("distinct_nodes_mut called with duplicate indices");
    }

    let mut out: Vec<&mut Node> = Vec::with_capacity(sorted.len());
    let mut rest = slice;
    let mut offset = 0usize;
    for idx in sorted {
        let rel = idx - offset;
        let (_, tail) = rest.split_at_mut(rel);
        let (head, new_rest) = tail.split_at_mut(1);
        out.push(head[0].node_mut());
        rest = new_rest;
        offset = idx + 1;
    }
    out
}

pub struct Simulator {
    config: Arc<RevocConfig>,
    hash_fn: Arc<dyn HashFn>,
    ca: Ca,
    participants: Vec<Participant>,
    revoked_indices: Vec<usize>,
    rng: StdRng,
    metrics: Metrics,
}

impl Simulator {
    /// Build a fresh CA, populate it, and spin up `start_no_nodes`
    /// participants (the first `no_cacher` of them carrying a level-cache).
    /// Fails if the cache-level snapshot taken at setup has an unfilled
    /// cell — a cannot-proceed condition per the error-handling design.
    pub fn new(config: Arc<RevocConfig>, hash_fn: Arc<dyn HashFn>) -> Result<Self, SmtError> {
        let mut ca = Ca::new(config.clone(), hash_fn.clone());
        tracing::info!("setting up CA...");
        ca.initialize();

        let prime_root = ca.get_prime();
        let smt_roots = ca.get_smt_roots();
        let lvl_caches = ca.get_lvl_caches(config.cache_level);
        for (part, cache) in lvl_caches.iter().enumerate() {
            if let Some(index) = cache.iter().position(Hash::is_empty) {
                return Err(SmtError::IncompleteLevelCache { part, index });
            }
        }

        tracing::info!(count = config.start_no_nodes, "initializing active nodes...");
        let mut participants = Vec::with_capacity(config.start_no_nodes as usize);
        for i in 0..config.no_cacher {
            let part = (i % config.no_smt_parts as u64) as usize;
            let (poi, poi_bm) = ca.get_node_poi(i, part);
            let node = Node::new(config.clone(), hash_fn.clone(), i, part, poi, poi_bm, smt_roots.clone(), prime_root.clone());
            participants.push(Participant::Cacher(Cacher::new(node, config.cache_level, lvl_caches.clone())));
        }
        for i in config.no_cacher..config.start_no_nodes {
            let part = (i % config.no_smt_parts as u64) as usize;
            let (poi, poi_bm) = ca.get_node_poi(i, part);
            let node = Node::new(config.clone(), hash_fn.clone(), i, part, poi, poi_bm, smt_roots.clone(), prime_root.clone());
            participants.push(Participant::Plain(node));
        }

        Ok(Self {
            config,
            hash_fn,
            ca,
            participants,
            revoked_indices: Vec::new(),
            rng: StdRng::seed_from_u64(rand::random()),
            metrics: Metrics::default(),
        })
    }

    /// Seed the RNG deterministically instead of from OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run the full simulation and return the accumulated report. Mirrors
    /// the reference implementation's `BigNetSim.sim` time hierarchy.
    pub fn run(&mut self) -> SimulationReport {
        let mut sub_epoch: u64 = 1;
        let mut epoch: u64 = 0;

        for current_time_step in 0..self.config.total_time_steps {
            if sub_epoch % self.config.subs_per_epoch == 0 {
                sub_epoch += 1;
                epoch += 1;
                crate::logging::log_epoch_boundary(epoch, sub_epoch, current_time_step as u64);
                self.ca.epoch_tree_change();
                self.epoch_update_nodes();
                self.issue_new_certs();
            }

            if current_time_step % self.config.time_steps_per_sub_epoch == 0 {
                sub_epoch += 1;
                self.run_sub_epoch();
            }

            self.run_time_step();
        }

        tracing::info!(
            total_revokes = self.metrics.total_revokes,
            successful_repairs = self.metrics.successful_repairs,
            failed_repairs = self.metrics.failed_repairs,
            parity_fails = self.metrics.parity_fails,
            "simulation complete"
        );
        self.metrics.finalize(self.config.epochs, self.config.start_no_nodes)
    }

    fn run_sub_epoch(&mut self) {
        // reissue previously-revoked nodes into the newest partition
        if !self.revoked_indices.is_empty() {
            let latest = self.config.no_smt_parts - 1;
            let mut reissued = distinct_nodes_mut(&mut self.participants, &self.revoked_indices);
            self.ca.reissue_nodes(&mut reissued);
        }

        // revoke a fresh random sample, excluding nodes just reissued above
        let sample = rand::seq::index::sample(&mut self.rng, self.participants.len(), self.config.revoked_per_sub_epoch as usize).into_vec();
        let revoked_set: HashSet<usize> = self.revoked_indices.iter().copied().collect();
        let revoke_indices: Vec<usize> = sample.into_iter().filter(|i| !revoked_set.contains(i)).collect();

        if !revoke_indices.is_empty() {
            let mut to_revoke = distinct_nodes_mut(&mut self.participants, &revoke_indices);
            self.ca.revoke_nodes(&mut to_revoke);
        }
        self.metrics.total_revokes += revoke_indices.len() as u64;

        let reissued_refs: Vec<&Node> = self.revoked_indices.iter().map(|&i| self.participants[i].node()).collect();
        let mut update = self.ca.construct_update(&reissued_refs, false);
        let revoke_refs: Vec<&Node> = revoke_indices.iter().map(|&i| self.participants[i].node()).collect();
        update.extend(self.ca.construct_update(&revoke_refs, true));

        let mut to_update_indices: HashSet<usize> = self.revoked_indices.iter().copied().collect();
        to_update_indices.extend(revoke_indices.iter().copied());

        self.revoked_indices = revoke_indices;

        tracing::info!(update_len = update.len(), "sent update containing update-pois");
        self.send_update(&update, &to_update_indices);
    }

    fn send_update(&mut self, update: &[Update], to_update_indices: &HashSet<usize>) {
        let smt_roots = self.ca.get_smt_roots();
        let mut affected_parts: Vec<usize> = Vec::new();
        let mut affected_smts: Vec<(usize, Hash)> = Vec::new();
        let mut update_per_part: Vec<Vec<Update>> = (0..self.config.no_smt_parts).map(|_| Vec::new()).collect();
        let unique_hashes = self.ca.get_unique_hash_count(update);

        for u in update {
            if !affected_parts.contains(&u.smt_part) {
                affected_parts.push(u.smt_part);
                affected_smts.push((u.smt_part, smt_roots[u.smt_part].clone()));
            }
            update_per_part[u.smt_part].push(u.clone());
        }

        let non_updated: HashSet<usize> = rand::seq::index::sample(&mut self.rng, self.participants.len(), self.config.no_missing_nodes as usize)
            .into_iter()
            .filter(|i| !to_update_indices.contains(i))
            .collect();

        let update_count = self.participants.len() - non_updated.len();
        let mut cacher_count = 0usize;

        let prime = self.ca.get_prime();
        for i in 0..self.participants.len() {
            if non_updated.contains(&i) {
                self.participants[i].node_mut().outdated_prime = true;
                continue;
            }
            let is_cacher = self.participants[i].is_cacher();
            if is_cacher {
                cacher_count += 1;
            }
            {
                let node = self.participants[i].node_mut();
                node.set_some_smt_roots(&affected_smts);
                node.prime_root = prime.clone();
                node.outdated_prime = false;
            }
            self.participants[i].process_update(update, &update_per_part);
        }

        let base_size = self.config.msg_size_prime_root as u64
            + self.config.sig_size as u64
            + (affected_smts.len() as u64 * self.config.hash_bytes as u64)
            + (unique_hashes as u64 * self.config.hash_bytes as u64);

        let non_cacher_count = (update_count - cacher_count) as u64;
        self.metrics.update_count += non_cacher_count;
        self.metrics.aggr_update_size += non_cacher_count * base_size;

        self.metrics.update_count += cacher_count as u64;
        self.metrics.aggr_update_size += cacher_count as u64 * base_size;
    }

    fn epoch_update_nodes(&mut self) {
        let no_smt_parts = self.config.no_smt_parts;
        let mut oldest_count = 0u64;
        let prime = self.ca.get_prime();
        let roots = self.ca.get_smt_roots();
        let lvl_caches = self.ca.get_lvl_caches(self.config.cache_level);

        for participant in self.participants.iter_mut() {
            let old_smt_part = participant.node().smt_part;
            let new_smt_part = if old_smt_part == 0 {
                oldest_count += 1;
                no_smt_parts - 1
            } else {
                old_smt_part - 1
            };

            let stale = participant.node().smt_roots[old_smt_part].clone();
            let fresh_root = self.ca.get_a_smt_root(new_smt_part);

            let node = participant.node_mut();
            node.smt_part = new_smt_part;
            if stale != fresh_root {
                node.outdated_poi = true;
            }
            node.prime_root = prime.clone();
            node.smt_roots = roots.clone();
            node.outdated_prime = false;

            if let Some(cacher) = participant.as_cacher_mut() {
                cacher.lvl_caches = lvl_caches.clone();
                cacher.outdated_lvlc = false;
                cacher.outdated_roots.clear();
            }
        }

        self.metrics.msg_sizes_ca_out += oldest_count * self.config.hash_bytes as u64 + self.config.msg_size_prime_root as u64 + self.config.sig_size as u64;
        self.metrics.prune_count += 1;
        self.metrics.aggr_prune_size += oldest_count * self.config.hash_bytes as u64;
    }

    fn issue_new_certs(&mut self) {
        self.metrics.msg_sizes_ca_out += self.config.new_issues_per_epoch * self.config.hash_bytes as u64;
        self.metrics.aggr_prune_size += self.config.new_issues_per_epoch * self.config.hash_bytes as u64;
    }

    fn run_time_step(&mut self) {
        self.metrics.total_encounters += self.config.encounters_per_node as u64 * self.participants.len() as u64;

        for n_idx in 0..self.participants.len() {
            let needs_attention = {
                let p = &self.participants[n_idx];
                p.node().outdated_prime
                    || p.node().outdated_poi
                    || p.as_cacher().map(|c| c.outdated_lvlc).unwrap_or(false)
            };
            if !needs_attention {
                continue;
            }

            let peers = rand::seq::index::sample(&mut self.rng, self.participants.len(), self.config.encounters_per_node as usize).into_vec();
            for e_idx in peers {
                if e_idx == n_idx {
                    continue;
                }
                self.metrics.msg_sizes_all += self.config.msg_size_prime_root as u64;

                let (e_outdated_poi, e_outdated_prime, n_outdated_poi, n_outdated_prime) = {
                    let e = self.participants[e_idx].node();
                    let n = self.participants[n_idx].node();
                    (e.outdated_poi, e.outdated_prime, n.outdated_poi, n.outdated_prime)
                };
                if e_outdated_poi && !e_outdated_prime && n_outdated_poi && !n_outdated_prime {
                    self.metrics.encounters_both_no_poi += 1;
                }
                if e_outdated_prime {
                    continue;
                }

                if self.participants[n_idx].node().outdated_prime {
                    self.update_prime(n_idx, e_idx);
                }

                if self.participants[n_idx].as_cacher().map(|c| c.outdated_lvlc).unwrap_or(false) {
                    self.participants[n_idx]
                        .as_cacher_mut()
                        .expect("checked above")
                        .update_try_lvlc += 1;
                    let e_is_fresh_cacher = self
                        .participants[e_idx]
                        .as_cacher()
                        .map(|c| !c.outdated_lvlc)
                        .unwrap_or(false);
                    if e_is_fresh_cacher {
                        self.update_lvl_cache(n_idx, e_idx);
                    }
                }

                if self.participants[n_idx].node().outdated_poi {
                    if !self.participants[n_idx].node().revoked {
                        self.participants[n_idx].node_mut().update_try += 1;
                    }
                } else {
                    continue;
                }

                let e_fresh_cacher_for_poi = self
                    .participants[e_idx]
                    .as_cacher()
                    .map(|c| !c.outdated_lvlc)
                    .unwrap_or(false);
                let n_lvl_cache_tried = self.participants[n_idx].node().lvl_cache_tried;
                if self.participants[e_idx].is_cacher() && !n_lvl_cache_tried && e_fresh_cacher_for_poi {
                    self.repair_via_lvlc(n_idx, e_idx);
                }

                let (n_outdated_poi2, n_smt_part, n_revoked) = {
                    let n = self.participants[n_idx].node();
                    (n.outdated_poi, n.smt_part, n.revoked)
                };
                let (e_outdated_poi2, e_smt_part, e_revoked) = {
                    let e = self.participants[e_idx].node();
                    (e.outdated_poi, e.smt_part, e.revoked)
                };
                if n_outdated_poi2 && !e_outdated_poi2 && e_smt_part == n_smt_part && (!n_revoked || !e_revoked) {
                    self.repair_via_poi(n_idx, e_idx);
                }
            }

            let (outdated_poi, update_try) = {
                let n = self.participants[n_idx].node();
                (n.outdated_poi, n.update_try)
            };
            if outdated_poi && update_try > self.config.max_repair_tries {
                tracing::info!(node_idx = n_idx, "node reached max tries for repair...");
                self.reset_outdated(n_idx);
                self.metrics.failed_repairs += 1;
            }

            if let Some(cacher) = self.participants[n_idx].as_cacher() {
                if cacher.outdated_lvlc && cacher.update_try_lvlc > self.config.max_repair_tries {
                    self.reset_outdated_cacher(n_idx);
                }
            }
        }
    }

    fn update_prime(&mut self, n_idx: usize, e_idx: usize) {
        let helper_prime = self.participants[e_idx].node().prime_root.clone();
        let (wrong_aggr, wrong_main) = match &mut self.participants[n_idx] {
            Participant::Plain(n) => n.set_prime_id_wrong_parts(helper_prime),
            Participant::Cacher(c) => c.set_prime_id_wrong_parts(helper_prime),
        };
        let selected = self.participants[e_idx].node().get_ided_smt_roots(&wrong_aggr, &wrong_main);

        let matched = match &mut self.participants[n_idx] {
            Participant::Plain(n) => n.set_ided_smt_roots(&selected),
            Participant::Cacher(c) => c.set_ided_smt_roots(&selected),
        };

        if matched {
            self.metrics.prime_successes += 1;
            let size = selected.len() as u64 * self.config.hash_bytes as u64 + self.config.sig_size as u64;
            self.metrics.msg_sizes_all += size;
            self.metrics.msg_sizes_update += size;
            return;
        }

        crate::logging::log_parity_aliasing(n_idx, wrong_aggr.first().copied().unwrap_or(0));
        self.metrics.parity_fails += 1;

        let (smt_part, stale_root) = {
            let n = self.participants[n_idx].node();
            (n.smt_part, n.smt_roots[n.smt_part].clone())
        };
        if stale_root != self.ca.get_a_smt_root(smt_part) {
            self.participants[n_idx].node_mut().outdated_poi = true;
        }

        if let Some(cacher) = self.participants[n_idx].as_cacher_mut() {
            let ca_roots = self.ca.get_smt_roots();
            for i in 0..self.config.no_smt_parts {
                if cacher.node.smt_roots[i] != ca_roots[i] {
                    cacher.outdated_roots.push(i);
                }
            }
            if cacher.outdated_roots.len() > 1 {
                cacher.outdated_lvlc = true;
            }
        }

        let prime = self.ca.get_prime();
        let roots = self.ca.get_smt_roots();
        let n = self.participants[n_idx].node_mut();
        n.prime_root = prime;
        n.smt_roots = roots;
        n.outdated_prime = false;

        let size = self.config.no_smt_parts as u64 * self.config.hash_bytes as u64 + self.config.sig_size as u64;
        self.metrics.msg_sizes_all += size;
        self.metrics.msg_sizes_update += size;
    }

    fn update_lvl_cache(&mut self, n_idx: usize, e_idx: usize) {
        let outdated_roots = self.participants[n_idx].as_cacher().expect("caller checked n is a Cacher").outdated_roots.clone();
        let fetched = self
            .participants[e_idx]
            .as_cacher()
            .expect("caller checked e is a fresh Cacher")
            .get_some_lvl_caches(&outdated_roots);

        let cacher = self.participants[n_idx].as_cacher_mut().expect("checked above");
        cacher.update_some_lvl_caches(&fetched);
        cacher.outdated_lvlc = false;
        cacher.update_try_lvlc = 0;
        cacher.outdated_roots.clear();

        let size = self.config.msg_size_lvlc as u64 * fetched.len() as u64;
        self.metrics.msg_sizes_all += size;
        self.metrics.msg_sizes_repair += size;
    }

    fn repair_via_lvlc(&mut self, n_idx: usize, e_idx: usize) {
        self.metrics.msg_sizes_all += self.config.msg_size_poi as u64 * 2;
        self.metrics.msg_sizes_repair += self.config.msg_size_poi as u64 * 2;

        let smt_part = self.participants[n_idx].node().smt_part;
        let (cache_level, cache_slice) = {
            let helper = self.participants[e_idx].as_cacher().expect("caller checked e is a Cacher");
            (helper.cache_level, helper.lvl_caches[smt_part].clone())
        };

        let success = self.participants[n_idx].node_mut().try_lvlc_repair(&cache_slice, cache_level);
        let tries_used = self.participants[n_idx].node().update_try;
        crate::logging::log_repair_attempt(n_idx, "lvl_cache", tries_used, success);
        if success {
            self.metrics.successful_repairs += 1;
            self.metrics.lvlc_repairs += 1;
            let n = self.participants[n_idx].node_mut();
            self.metrics.repair_try_aggr += n.update_try as u64;
            n.update_try = 0;
            n.outdated_poi = false;
            n.lvl_cache_tried = false;
        } else {
            self.participants[n_idx].node_mut().lvl_cache_tried = true;
        }
    }

    fn repair_via_poi(&mut self, n_idx: usize, e_idx: usize) {
        self.metrics.msg_sizes_all += self.config.msg_size_poi as u64;
        self.metrics.msg_sizes_repair += self.config.msg_size_poi as u64;

        let (cert, poi, poi_bm) = {
            let helper = self.participants[e_idx].node();
            (helper.cert.clone(), helper.poi.clone(), helper.poi_bm)
        };

        let success = self.participants[n_idx].node_mut().try_poi_repair(&cert, &poi, poi_bm);
        let tries_used = self.participants[n_idx].node().update_try;
        crate::logging::log_repair_attempt(n_idx, "poi", tries_used, success);
        if success {
            self.metrics.successful_repairs += 1;
            let n = self.participants[n_idx].node_mut();
            self.metrics.repair_try_aggr += n.update_try as u64;
            n.update_try = 0;
            n.outdated_poi = false;
            n.lvl_cache_tried = false;
        }
    }

    fn reset_outdated(&mut self, n_idx: usize) {
        self.metrics.msg_sizes_ca_out += self.config.msg_size_poi as u64;
        let smt_part = self.participants[n_idx].node().smt_part;
        let node_id = self.participants[n_idx].node().node_id;
        let (poi, poi_bm) = self.ca.get_node_poi(node_id, smt_part);
        let roots = self.ca.get_smt_roots();
        let prime = self.ca.get_prime();

        let n = self.participants[n_idx].node_mut();
        n.poi = poi;
        n.poi_bm = poi_bm;
        n.smt_roots = roots;
        n.prime_root = prime;
        n.update_try = 0;
        n.outdated_poi = false;
        n.outdated_prime = false;
        n.lvl_cache_tried = false;
    }

    fn reset_outdated_cacher(&mut self, n_idx: usize) {
        let outdated_roots = self.participants[n_idx].as_cacher().expect("caller checked n is a Cacher").outdated_roots.clone();
        let fetched = self.ca.get_some_lvl_caches(&outdated_roots);

        let cacher = self.participants[n_idx].as_cacher_mut().expect("checked above");
        cacher.update_some_lvl_caches(&fetched);
        cacher.outdated_lvlc = false;
        cacher.update_try_lvlc = 0;
        cacher.outdated_roots.clear();

        let size = self.config.msg_size_lvlc as u64 * fetched.len() as u64;
        self.metrics.msg_sizes_ca_out += size;
        self.metrics.msg_sizes_ca_out_lvlc += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> Arc<RevocConfig> {
        let mut cfg = RevocConfig {
            hash_depth_bits: 16,
            no_smt_parts: 6,
            main_parities: 2,
            aggregated_parities: 2,
            passive_nodes: 0,
            start_no_nodes: 30,
            no_cacher_share: 0.2,
            no_missing_nodes_share: 0.3,
            cache_level: 4,
            encounters_per_node: 3,
            max_repair_tries: 10,
            time_steps_per_sub_epoch: 4,
            subs_per_epoch: 3,
            epochs: 1,
            revoked_per_sub_epoch_share: 0.05,
            sanity_checks: true,
            ..RevocConfig::default()
        };
        cfg.recalc_derived();
        Arc::new(cfg)
    }

    #[test]
    fn simulator_builds_and_runs_without_panicking() {
        let cfg = tiny_config();
        let hash_fn: Arc<dyn HashFn> = Arc::new(crate::hash::Sha1Trunc8HashFn);
        let mut sim = Simulator::new(cfg, hash_fn).unwrap().with_seed(42);
        let report = sim.run();
        assert!(report.total_encounters > 0);
    }

    #[test]
    fn distinct_nodes_mut_returns_requested_count() {
        let cfg = tiny_config();
        let hash_fn: Arc<dyn HashFn> = Arc::new(crate::hash::Sha1Trunc8HashFn);
        let sim = Simulator::new(cfg, hash_fn).unwrap();
        let mut participants = sim.participants;
        let refs = distinct_nodes_mut(&mut participants, &[0, 2, 5]);
        assert_eq!(refs.len(), 3);
    }
}
