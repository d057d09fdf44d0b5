//! Environment-based configuration for the revocation simulator.
//!
//! Mirrors the reference implementation's `SimConfig`: a handful of
//! independent knobs plus a set of fields derived from them
//! (`recalc_derived`), with every knob overridable via a `REVOC_*`
//! environment variable and sane defaults otherwise.
//!
//! # Environment Variables
//!
//! ## SMT / hash shape
//! - `REVOC_SANITY_CHECKS` - enable expensive cross-checks (default: "0")
//! - `REVOC_HASH_DEPTH_BITS` - hash output width in bits (default: "32")
//! - `REVOC_NO_SMT_PARTS` - number of SMT partitions (default: "52")
//! - `REVOC_PARITY_LENGTH_BYTES` - bytes per parity lane (default: "2")
//! - `REVOC_MAIN_PARITIES` - uncompressed trailing partitions (default: "2")
//! - `REVOC_AGGREGATED_PARITIES` - partitions folded per aggregated lane (default: "10")
//! - `REVOC_PRIME_COUNTER_SIZE` - prime-root counter width in bytes (default: "4")
//!
//! ## Population / repair
//! - `REVOC_SMT_SETUP_FILE` - snapshot path for the passive-node backfill
//! - `REVOC_PASSIVE_NODES` - nodes pre-loaded, never simulated (default: "100000")
//! - `REVOC_START_NO_NODES` - active simulated nodes (default: "1000")
//! - `REVOC_NEW_ISSUES_PER_EPOCH_SHARE` - default: "0.01"
//! - `REVOC_NO_CACHER_SHARE` - default: "0.1"
//! - `REVOC_CACHE_LEVEL` - level-cache depth from root (default: "7")
//! - `REVOC_NO_MISSING_NODES_SHARE` - default: "0.3"
//! - `REVOC_ENCOUNTERS_PER_NODE` - default: "5"
//! - `REVOC_MAX_REPAIR_TRIES` - default: "30"
//!
//! ## Time
//! - `REVOC_TIME_STEPS_PER_SUB_EPOCH` - default: "24"
//! - `REVOC_SUBS_PER_EPOCH` - default: "7"
//! - `REVOC_EPOCHS` - default: "4"
//! - `REVOC_REVOKED_PER_SUB_EPOCH_SHARE` - default: "0.001"
//!
//! ## Message sizes (for bandwidth accounting, not wire format)
//! - `REVOC_HASH_BYTES` - default: "32"
//! - `REVOC_SIG_SIZE` - default: "64"
//!
//! ## Logging
//! - `REVOC_LOG_LEVEL` - trace/debug/info/warn/error (default: "info")
//! - `REVOC_LOG_JSON` - "1" for JSON logs (default: "0")

use std::env;

use thiserror::Error;

use crate::logging::LogLevel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Simulator/CA configuration, directly modeled on the reference
/// implementation's `SimConfig`. Fields suffixed with independent knobs are
/// read from the environment; fields derived from them are recomputed by
/// [`RevocConfig::recalc_derived`] whenever a dependency changes.
#[derive(Debug, Clone)]
pub struct RevocConfig {
    // -- debugging --
    pub sanity_checks: bool,

    // -- SMT / hash shape --
    pub hash_depth_bits: u32,
    pub no_smt_parts: usize,
    pub parity_length_bytes: usize,
    pub main_parities: usize,
    pub aggregated_parities: usize,
    pub prime_counter_size: usize,
    /// derived: `(no_smt_parts - main_parities) / aggregated_parities`
    pub no_aggr_parities: usize,
    /// derived: `no_aggr_parities + main_parities`
    pub no_parities: usize,

    // -- population / repair --
    pub smt_setup_file: Option<String>,
    pub passive_nodes: u64,
    pub start_no_nodes: u64,
    pub new_issues_per_epoch_share: f64,
    /// derived: `ceil(start_no_nodes * new_issues_per_epoch_share)`
    pub new_issues_per_epoch: u64,
    pub no_cacher_share: f64,
    /// derived: `ceil(start_no_nodes * no_cacher_share)`
    pub no_cacher: u64,
    pub cache_level: u32,
    pub no_missing_nodes_share: f64,
    /// derived: `ceil(start_no_nodes * no_missing_nodes_share)`
    pub no_missing_nodes: u64,
    pub encounters_per_node: u32,
    pub max_repair_tries: u32,

    // -- time --
    pub time_steps_per_sub_epoch: u64,
    pub subs_per_epoch: u64,
    pub epochs: u64,
    /// derived: `epochs * subs_per_epoch * time_steps_per_sub_epoch`
    pub total_time_steps: u64,
    pub revoked_per_sub_epoch_share: f64,
    /// derived: `ceil(start_no_nodes * revoked_per_sub_epoch_share)`
    pub revoked_per_sub_epoch: u64,

    // -- message sizes (bandwidth accounting only) --
    pub hash_bytes: usize,
    pub sig_size: usize,
    /// derived: `hash_bytes + parity_length_bytes * no_parities + prime_counter_size`
    pub msg_size_prime_root: usize,
    /// derived: `(ceil(log2(passive_nodes + start_no_nodes)) + 1) * hash_bytes + 1`
    pub msg_size_poi: usize,
    /// derived: `2^cache_level * hash_bytes`
    pub msg_size_lvlc: usize,
    /// derived: `no_smt_parts * msg_size_lvlc`
    pub msg_size_complete_lvlc: usize,

    // -- logging --
    pub log_level: LogLevel,
    pub log_json: bool,
}

impl Default for RevocConfig {
    fn default() -> Self {
        let mut cfg = Self {
            sanity_checks: false,

            hash_depth_bits: 32,
            no_smt_parts: 52,
            parity_length_bytes: 2,
            main_parities: 2,
            aggregated_parities: 10,
            prime_counter_size: 4,
            no_aggr_parities: 0,
            no_parities: 0,

            smt_setup_file: None,
            passive_nodes: 100_000,
            start_no_nodes: 1_000,
            new_issues_per_epoch_share: 0.01,
            new_issues_per_epoch: 0,
            no_cacher_share: 0.1,
            no_cacher: 0,
            cache_level: 7,
            no_missing_nodes_share: 0.3,
            no_missing_nodes: 0,
            encounters_per_node: 5,
            max_repair_tries: 30,

            time_steps_per_sub_epoch: 24,
            subs_per_epoch: 7,
            epochs: 4,
            total_time_steps: 0,
            revoked_per_sub_epoch_share: 0.001,
            revoked_per_sub_epoch: 0,

            hash_bytes: 32,
            sig_size: 64,
            msg_size_prime_root: 0,
            msg_size_poi: 0,
            msg_size_lvlc: 0,
            msg_size_complete_lvlc: 0,

            log_level: LogLevel::Info,
            log_json: false,
        };
        cfg.recalc_derived();
        cfg
    }
}

impl RevocConfig {
    /// Recompute every derived field from its independent inputs. Call
    /// after mutating any of `no_smt_parts`, `main_parities`,
    /// `aggregated_parities`, `start_no_nodes`, the `*_share` fields,
    /// `epochs`/`subs_per_epoch`/`time_steps_per_sub_epoch`, `cache_level`,
    /// or the message-size inputs.
    pub fn recalc_derived(&mut self) {
        self.no_aggr_parities = (self.no_smt_parts - self.main_parities) / self.aggregated_parities;
        self.no_parities = self.no_aggr_parities + self.main_parities;

        self.new_issues_per_epoch =
            (self.start_no_nodes as f64 * self.new_issues_per_epoch_share).ceil() as u64;
        self.no_cacher = (self.start_no_nodes as f64 * self.no_cacher_share).ceil() as u64;
        self.no_missing_nodes =
            (self.start_no_nodes as f64 * self.no_missing_nodes_share).ceil() as u64;

        self.total_time_steps = self.epochs * self.subs_per_epoch * self.time_steps_per_sub_epoch;
        self.revoked_per_sub_epoch =
            (self.start_no_nodes as f64 * self.revoked_per_sub_epoch_share).ceil() as u64;

        self.msg_size_prime_root =
            self.hash_bytes + (self.parity_length_bytes * self.no_parities) + self.prime_counter_size;
        let total_nodes = (self.passive_nodes + self.start_no_nodes) as f64;
        self.msg_size_poi = ((total_nodes.log2() + 1.0).ceil() as usize * self.hash_bytes) + 1;
        self.msg_size_lvlc = (1usize << self.cache_level) * self.hash_bytes;
        self.msg_size_complete_lvlc = self.no_smt_parts * self.msg_size_lvlc;
    }

    /// Map an SMT partition index to the parity lane covering it: the
    /// trailing `main_parities` partitions each get their own lane,
    /// everything before that is folded `aggregated_parities`-wide.
    pub fn get_par_part(&self, part: usize) -> usize {
        if part >= self.aggregated_parities * self.no_aggr_parities {
            self.no_parities - (self.no_smt_parts - part)
        } else {
            part / self.aggregated_parities
        }
    }

    /// Load configuration from the environment, falling back to the
    /// reference defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        cfg.sanity_checks = env_bool("REVOC_SANITY_CHECKS", cfg.sanity_checks)?;

        cfg.hash_depth_bits = env_parse("REVOC_HASH_DEPTH_BITS", cfg.hash_depth_bits)?;
        cfg.no_smt_parts = env_parse("REVOC_NO_SMT_PARTS", cfg.no_smt_parts)?;
        cfg.parity_length_bytes = env_parse("REVOC_PARITY_LENGTH_BYTES", cfg.parity_length_bytes)?;
        cfg.main_parities = env_parse("REVOC_MAIN_PARITIES", cfg.main_parities)?;
        cfg.aggregated_parities = env_parse("REVOC_AGGREGATED_PARITIES", cfg.aggregated_parities)?;
        cfg.prime_counter_size = env_parse("REVOC_PRIME_COUNTER_SIZE", cfg.prime_counter_size)?;

        cfg.smt_setup_file = env::var("REVOC_SMT_SETUP_FILE").ok();
        cfg.passive_nodes = env_parse("REVOC_PASSIVE_NODES", cfg.passive_nodes)?;
        cfg.start_no_nodes = env_parse("REVOC_START_NO_NODES", cfg.start_no_nodes)?;
        cfg.new_issues_per_epoch_share =
            env_parse("REVOC_NEW_ISSUES_PER_EPOCH_SHARE", cfg.new_issues_per_epoch_share)?;
        cfg.no_cacher_share = env_parse("REVOC_NO_CACHER_SHARE", cfg.no_cacher_share)?;
        cfg.cache_level = env_parse("REVOC_CACHE_LEVEL", cfg.cache_level)?;
        cfg.no_missing_nodes_share =
            env_parse("REVOC_NO_MISSING_NODES_SHARE", cfg.no_missing_nodes_share)?;
        cfg.encounters_per_node = env_parse("REVOC_ENCOUNTERS_PER_NODE", cfg.encounters_per_node)?;
        cfg.max_repair_tries = env_parse("REVOC_MAX_REPAIR_TRIES", cfg.max_repair_tries)?;

        cfg.time_steps_per_sub_epoch =
            env_parse("REVOC_TIME_STEPS_PER_SUB_EPOCH", cfg.time_steps_per_sub_epoch)?;
        cfg.subs_per_epoch = env_parse("REVOC_SUBS_PER_EPOCH", cfg.subs_per_epoch)?;
        cfg.epochs = env_parse("REVOC_EPOCHS", cfg.epochs)?;
        cfg.revoked_per_sub_epoch_share =
            env_parse("REVOC_REVOKED_PER_SUB_EPOCH_SHARE", cfg.revoked_per_sub_epoch_share)?;

        cfg.hash_bytes = env_parse("REVOC_HASH_BYTES", cfg.hash_bytes)?;
        cfg.sig_size = env_parse("REVOC_SIG_SIZE", cfg.sig_size)?;

        cfg.log_level = env::var("REVOC_LOG_LEVEL")
            .map(|s| LogLevel::from(s.as_str()))
            .unwrap_or(cfg.log_level);
        cfg.log_json = env_bool("REVOC_LOG_JSON", cfg.log_json)?;

        cfg.recalc_derived();
        Ok(cfg)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string(), raw)),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_derived_values() {
        let cfg = RevocConfig::default();
        assert_eq!(cfg.no_aggr_parities, 5);
        assert_eq!(cfg.no_parities, 7);
        assert_eq!(cfg.new_issues_per_epoch, 10);
        assert_eq!(cfg.no_cacher, 100);
        assert_eq!(cfg.no_missing_nodes, 300);
        assert_eq!(cfg.total_time_steps, 4 * 7 * 24);
        assert_eq!(cfg.revoked_per_sub_epoch, 1);
    }

    #[test]
    fn get_par_part_folds_early_partitions_and_keeps_main_ones_distinct() {
        let cfg = RevocConfig::default();
        // partitions 0..49 aggregate 10-wide into lanes 0..4
        assert_eq!(cfg.get_par_part(0), 0);
        assert_eq!(cfg.get_par_part(9), 0);
        assert_eq!(cfg.get_par_part(10), 1);
        // the trailing 2 "main" partitions each keep their own lane
        assert_eq!(cfg.get_par_part(50), 5);
        assert_eq!(cfg.get_par_part(51), 6);
    }

    #[test]
    fn recalc_derived_reflects_mutated_inputs() {
        let mut cfg = RevocConfig::default();
        cfg.start_no_nodes = 2000;
        cfg.recalc_derived();
        assert_eq!(cfg.new_issues_per_epoch, 20);
        assert_eq!(cfg.no_cacher, 200);
    }
}
