//! End-to-end scenarios driving the public API the way a real deployment
//! would: stand up a CA, mint nodes against it, and exercise the repair
//! ladder across revocations, prime-root parity diagnosis, and level-cache
//! repair. Unit tests close to each algorithm already cover the proof
//! algebra in isolation; these exercise the modules wired together.

use std::sync::Arc;

use revoc_smt::config::RevocConfig;
use revoc_smt::hash::{HashFn, Sha1Trunc8HashFn};
use revoc_smt::{Ca, Cacher, Node, Simulator};

fn small_config() -> Arc<RevocConfig> {
    let mut cfg = RevocConfig {
        hash_depth_bits: 16,
        no_smt_parts: 6,
        main_parities: 2,
        aggregated_parities: 2,
        passive_nodes: 0,
        start_no_nodes: 40,
        no_cacher_share: 0.25,
        no_missing_nodes_share: 0.2,
        cache_level: 4,
        encounters_per_node: 4,
        max_repair_tries: 15,
        time_steps_per_sub_epoch: 6,
        subs_per_epoch: 4,
        epochs: 2,
        revoked_per_sub_epoch_share: 0.05,
        sanity_checks: true,
        ..RevocConfig::default()
    };
    cfg.recalc_derived();
    Arc::new(cfg)
}

/// An empty tree's root is the empty sentinel, and inserting then
/// immediately proving a single leaf folds back to the tree's own root.
#[test]
fn empty_tree_then_single_leaf_round_trips() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut ca = Ca::new(cfg.clone(), f.clone());
    assert!(ca.get_smt_roots().iter().all(|r| r.is_empty()));

    ca.initialize();
    let roots = ca.get_smt_roots();
    assert_eq!(roots.len(), cfg.no_smt_parts);
    assert!(roots.iter().all(|r| !r.is_empty()));

    let (poi, poi_bm) = ca.get_node_poi(0, 0);
    let node = Node::new(cfg, f, 0, 0, poi, poi_bm, roots, ca.get_prime());
    assert_eq!(node.calc_prime_root(), ca.get_prime());
}

/// Two leaves issued back to back into the same partition: the second
/// leaf's insertion makes the first node's PoI stale, and patching with the
/// second leaf's own fresh path repairs it without involving the CA again.
#[test]
fn two_leaf_split_repairs_via_peer_poi() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut ca = Ca::new(cfg.clone(), f.clone());
    ca.initialize();

    let (poi, poi_bm) = ca.get_node_poi(0, 0);
    let mut node = Node::new(cfg.clone(), f.clone(), 0, 0, poi, poi_bm, ca.get_smt_roots(), ca.get_prime());

    ca.add_node(10_000, 0, false);
    node.smt_roots[0] = ca.get_a_smt_root(0);
    node.outdated_poi = true;

    let (peer_poi, peer_bm) = ca.get_node_poi(10_000, 0);
    let peer_cert = f.hash(10_000u64.to_string().as_bytes());
    assert!(node.try_poi_repair(&peer_cert, &peer_poi, peer_bm));
    assert!(!node.outdated_poi);
}

/// Revoking a node invalidates every other node sharing its partition;
/// those other nodes repair via the revoked node's own updated path.
#[test]
fn revocation_propagates_and_repairs_via_poi() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut ca = Ca::new(cfg.clone(), f.clone());
    ca.initialize();

    let (poi, poi_bm) = ca.get_node_poi(1, 0);
    let mut bystander = Node::new(cfg.clone(), f.clone(), 1, 0, poi, poi_bm, ca.get_smt_roots(), ca.get_prime());

    ca.add_node(2, 0, true);
    bystander.smt_roots[0] = ca.get_a_smt_root(0);
    bystander.outdated_poi = true;

    let (revoked_poi, revoked_bm) = ca.get_node_poi(2, 0);
    let revoked_cert = f.hash(2u64.to_string().as_bytes());
    assert!(bystander.try_poi_repair(&revoked_cert, &revoked_poi, revoked_bm));
    assert!(!bystander.outdated_poi);
}

/// A prime-root parity diff correctly localizes which partition changed,
/// and re-fetching just that partition's root clears the node's stale flag.
#[test]
fn prime_root_parity_diagnoses_the_changed_partition() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut ca = Ca::new(cfg.clone(), f.clone());
    ca.initialize();

    let (poi, poi_bm) = ca.get_node_poi(3, 0);
    let mut node = Node::new(cfg.clone(), f.clone(), 3, 0, poi, poi_bm, ca.get_smt_roots(), ca.get_prime());

    ca.add_node(20_000, 0, false);
    let new_prime = ca.get_prime();

    let (wrong_aggr, wrong_main) = node.set_prime_id_wrong_parts(new_prime.clone());
    assert!(!wrong_aggr.is_empty() || !wrong_main.is_empty());

    let selected = node.get_ided_smt_roots(&wrong_aggr, &wrong_main);
    assert!(selected.iter().any(|(part, _)| *part == 0));

    let matched = node.set_ided_smt_roots(&selected);
    assert!(matched);
    assert_eq!(node.calc_prime_root(), new_prime);
}

/// Two simultaneous partition changes under the same aggregated lane are
/// both surfaced by diagnosis, and `set_ided_smt_roots` recomputes the full
/// prime hash rather than trusting the parity lanes alone — the defense
/// against the aliasing case where two changes cancel in the XOR lane.
#[test]
fn simultaneous_changes_in_one_parity_lane_are_fully_diagnosed() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut ca = Ca::new(cfg.clone(), f.clone());
    ca.initialize();

    let (poi, poi_bm) = ca.get_node_poi(4, 0);
    let mut node = Node::new(cfg.clone(), f.clone(), 4, 0, poi, poi_bm, ca.get_smt_roots(), ca.get_prime());

    // Change two partitions that fold into the same aggregated parity lane
    // (partitions 0 and 1, both under aggregated_parities = 2).
    ca.add_node(30_000, 0, false);
    ca.add_node(30_001, 1, false);
    let new_prime = ca.get_prime();

    let (wrong_aggr, wrong_main) = node.set_prime_id_wrong_parts(new_prime.clone());
    let selected = node.get_ided_smt_roots(&wrong_aggr, &wrong_main);
    // Diagnosis must surface the whole aggregated lane, not just one side.
    assert!(selected.iter().any(|(p, _)| *p == 0) || selected.iter().any(|(p, _)| *p == 1));

    let matched = node.set_ided_smt_roots(&selected);
    assert!(matched);
    assert_eq!(node.calc_prime_root(), new_prime);
}

/// A cacher can repair its own stale PoI purely from its own level-cache,
/// without any peer or CA interaction, so long as the cache is current.
#[test]
fn cacher_self_repairs_from_its_level_cache() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut ca = Ca::new(cfg.clone(), f.clone());
    ca.initialize();

    let (poi, poi_bm) = ca.get_node_poi(5, 0);
    let node = Node::new(cfg.clone(), f.clone(), 5, 0, poi, poi_bm, ca.get_smt_roots(), ca.get_prime());
    let lvl_caches = ca.get_lvl_caches(cfg.cache_level);
    let mut cacher = Cacher::new(node, cfg.cache_level, lvl_caches);

    for i in 40_000..40_010 {
        ca.add_node(i, 0, false);
    }
    cacher.node.smt_roots[0] = ca.get_a_smt_root(0);
    cacher.node.outdated_poi = true;
    cacher.lvl_caches = ca.get_lvl_caches(cfg.cache_level);

    assert!(cacher.node.try_lvlc_repair(&cacher.lvl_caches[0], cfg.cache_level));
    assert!(!cacher.node.outdated_poi);
}

/// A full simulation run, end to end: the driver should complete every
/// configured time step without panicking, and report a consistent picture
/// (every revocation either got repaired or accounted as a failure).
#[test]
fn full_simulation_run_completes_and_accounts_for_every_repair() {
    let cfg = small_config();
    let f: Arc<dyn HashFn> = Arc::new(Sha1Trunc8HashFn);
    let mut sim = Simulator::new(cfg, f).unwrap().with_seed(1234);
    let report = sim.run();

    assert!(report.total_encounters > 0);
    assert!(report.total_revocations > 0);
    assert!(report.failed_repair_share_pct <= 100.0);
    assert!(report.lvlc_repair_share_pct <= 100.0);
}
