//! Sweep harness: run a batch of [`RevocConfig`]s and write one CSV row per
//! run, mirroring the reference implementation's `sim_batch.py` batch
//! driver. Each run gets its own [`Simulator`] and hash function instance so
//! runs can be fanned out across threads with `std::thread::scope`.

use std::fmt::Write as _;
use std::io::Write as IoWrite;
use std::sync::Arc;

use thiserror::Error;

use crate::config::RevocConfig;
use crate::hash::{HashFn, Sha256HashFn};
use crate::simulator::{SimulationReport, Simulator};
use crate::smt::SmtError;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("building simulator for sweep row {0}: {1}")]
    SimulatorSetup(usize, SmtError),
    #[error("writing csv: {0}")]
    Io(#[from] std::io::Error),
}

/// One completed sweep run: the config knobs that vary across sweep rows,
/// plus the resulting report.
#[derive(Debug, Clone)]
pub struct SweepRow {
    pub start_no_nodes: u64,
    pub cache_level: u32,
    pub max_repair_tries: u32,
    pub no_cacher_share_pct: f64,
    pub no_missing_nodes_share_pct: f64,
    pub revoked_per_sub_epoch_share_pct: f64,
    pub parity_length_bytes: usize,
    pub report: SimulationReport,
}

/// Column order matches `sim_batch.py`'s `headerlist` exactly, so existing
/// analysis scripts built against that format keep working unchanged.
pub const CSV_HEADER: &[&str] = &[
    "no_nodes",
    "cache_level",
    "max_repair_tries",
    "no_cacher_share",
    "no_missing_nodes_share",
    "no_revoked_per_sub_share",
    "parity_length_bytes",
    "total_revocations",
    "total_n_needed_repairs",
    "avg_try",
    "lvlc_share_perc",
    "failed_repairs_perc",
    "avg_update_size_bytes",
    "nodes_sent_per_week_bytes",
    "nodes_sent_repair_share_perc",
    "parity_fails_share_perc",
    "avg_prune_update_size_bytes",
    "total_encounters",
    "encounters_both_outdated_share_perc",
];

/// Run every config in `configs` to completion, fanning the batch out
/// across as many OS threads as there are configs. Each thread builds and
/// owns a private `Simulator`; nothing is shared across runs, so no
/// synchronization beyond `thread::scope`'s join is needed.
pub fn run_sweep(configs: &[RevocConfig], seed: u64) -> Result<Vec<SweepRow>, EvalError> {
    let results: Vec<Result<SweepRow, EvalError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = configs
            .iter()
            .enumerate()
            .map(|(i, cfg)| {
                let cfg = cfg.clone();
                scope.spawn(move || run_one(i, &cfg, seed + i as u64))
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("sweep worker thread panicked")).collect()
    });

    results.into_iter().collect()
}

fn run_one(index: usize, cfg: &RevocConfig, seed: u64) -> Result<SweepRow, EvalError> {
    let config = Arc::new(cfg.clone());
    let hash_fn: Arc<dyn HashFn> = Arc::new(Sha256HashFn);
    let mut sim = Simulator::new(config.clone(), hash_fn)
        .map_err(|e| EvalError::SimulatorSetup(index, e))?
        .with_seed(seed);
    let report = sim.run();

    Ok(SweepRow {
        start_no_nodes: config.start_no_nodes,
        cache_level: config.cache_level,
        max_repair_tries: config.max_repair_tries,
        no_cacher_share_pct: config.no_cacher_share * 100.0,
        no_missing_nodes_share_pct: config.no_missing_nodes_share * 100.0,
        revoked_per_sub_epoch_share_pct: config.revoked_per_sub_epoch_share * 100.0,
        parity_length_bytes: config.parity_length_bytes,
        report,
    })
}

/// Render one row as CSV, in [`CSV_HEADER`] order.
pub fn row_to_csv(row: &SweepRow) -> String {
    let r = &row.report;
    let mut line = String::new();
    let _ = write!(
        line,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        row.start_no_nodes,
        row.cache_level,
        row.max_repair_tries,
        row.no_cacher_share_pct,
        row.no_missing_nodes_share_pct,
        row.revoked_per_sub_epoch_share_pct,
        row.parity_length_bytes,
        r.total_revocations,
        r.total_nodes_needing_repair,
        r.avg_repair_tries,
        r.lvlc_repair_share_pct,
        r.failed_repair_share_pct,
        r.avg_update_size_bytes,
        r.nodes_sent_per_week_bytes,
        r.nodes_sent_repair_share_pct,
        r.parity_fail_share_pct,
        r.avg_prune_update_size_bytes,
        r.total_encounters,
        r.encounters_both_outdated_share_pct,
    );
    line
}

/// Write the sweep results to `path` as CSV, header first.
pub fn write_csv(path: &std::path::Path, rows: &[SweepRow]) -> Result<(), EvalError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "{}", CSV_HEADER.join(","))?;
    for row in rows {
        writeln!(file, "{}", row_to_csv(row))?;
    }
    Ok(())
}

/// Build the `nodes_numbers` sweep from `sim_batch.py`: one baseline config
/// plus the same config with `start_no_nodes` swept over a fixed list of
/// population sizes.
pub fn default_sweep_configs(base: &RevocConfig) -> Vec<RevocConfig> {
    const NODE_COUNTS: &[u64] = &[7_000, 10_000, 20_000, 30_000, 50_000, 70_000, 100_000];

    let mut configs = vec![base.clone()];
    for &n in NODE_COUNTS {
        let mut cfg = base.clone();
        cfg.start_no_nodes = n;
        cfg.recalc_derived();
        configs.push(cfg);
    }
    configs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sweep_configs_varies_only_start_no_nodes() {
        let mut base = RevocConfig {
            no_smt_parts: 6,
            main_parities: 2,
            aggregated_parities: 2,
            passive_nodes: 0,
            start_no_nodes: 5000,
            hash_depth_bits: 16,
            cache_level: 5,
            ..RevocConfig::default()
        };
        base.recalc_derived();

        let configs = default_sweep_configs(&base);
        assert_eq!(configs.len(), 8);
        assert_eq!(configs[0].start_no_nodes, 5000);
        assert_eq!(configs[1].start_no_nodes, 7_000);
        assert_eq!(configs.last().unwrap().start_no_nodes, 100_000);
        assert!(configs.iter().all(|c| c.cache_level == 5));
    }

    #[test]
    fn row_to_csv_has_one_field_per_header_column() {
        let cfg = {
            let mut c = RevocConfig {
                no_smt_parts: 6,
                main_parities: 2,
                aggregated_parities: 2,
                passive_nodes: 0,
                start_no_nodes: 40,
                hash_depth_bits: 16,
                cache_level: 3,
                no_cacher_share: 0.2,
                no_missing_nodes_share: 0.3,
                encounters_per_node: 3,
                max_repair_tries: 10,
                time_steps_per_sub_epoch: 4,
                subs_per_epoch: 3,
                epochs: 1,
                revoked_per_sub_epoch_share: 0.05,
                ..RevocConfig::default()
            };
            c.recalc_derived();
            c
        };
        let rows = run_sweep(&[cfg], 7).unwrap();
        assert_eq!(rows.len(), 1);
        let csv = row_to_csv(&rows[0]);
        assert_eq!(csv.split(',').count(), CSV_HEADER.len());
    }
}
