//! Running counters collected during a simulation, and the final report
//! derived from them. Field names describe what they count rather than
//! mirroring a positional result tuple, but every value the reference
//! implementation's result list reports has a named home here.

#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub total_revokes: u64,
    pub failed_repairs: u64,
    pub successful_repairs: u64,
    pub lvlc_repairs: u64,
    pub repair_try_aggr: u64,
    pub prime_successes: u64,
    pub parity_fails: u64,
    pub encounters_both_no_poi: u64,
    pub total_encounters: u64,

    pub msg_sizes_all: u64,
    pub msg_sizes_repair: u64,
    pub msg_sizes_update: u64,
    pub msg_sizes_ca_out: u64,
    pub msg_sizes_ca_out_lvlc: u64,
    pub update_count: u64,
    pub aggr_update_size: u64,
    pub prune_count: u64,
    pub aggr_prune_size: u64,
}

/// Final summary of a completed simulation run, one field per value the
/// reference implementation's result list reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationReport {
    pub total_revocations: u64,
    pub total_nodes_needing_repair: u64,
    pub avg_repair_tries: f64,
    pub lvlc_repair_share_pct: f64,
    pub failed_repair_share_pct: f64,
    pub avg_update_size_bytes: f64,
    pub nodes_sent_per_week_bytes: f64,
    pub nodes_sent_repair_share_pct: f64,
    pub parity_fail_share_pct: f64,
    pub avg_prune_update_size_bytes: f64,
    pub total_encounters: u64,
    pub encounters_both_outdated_share_pct: f64,
}

impl Metrics {
    pub fn finalize(&self, epochs: u64, start_no_nodes: u64) -> SimulationReport {
        let total_repairs = self.successful_repairs + self.failed_repairs;
        let avg_repair_tries = if self.successful_repairs > 0 {
            self.repair_try_aggr as f64 / self.successful_repairs as f64
        } else {
            0.0
        };
        let lvlc_repair_share_pct = if self.successful_repairs > 0 {
            self.lvlc_repairs as f64 / self.successful_repairs as f64 * 100.0
        } else {
            0.0
        };
        let failed_repair_share_pct = if total_repairs > 0 {
            self.failed_repairs as f64 / total_repairs as f64 * 100.0
        } else {
            0.0
        };
        let avg_update_size_bytes = if self.update_count > 0 {
            self.aggr_update_size as f64 / self.update_count as f64 / 1024.0
        } else {
            0.0
        };
        let msgs_all_per_node = self.msg_sizes_all as f64 / start_no_nodes.max(1) as f64;
        let nodes_sent_per_week_bytes = msgs_all_per_node / epochs.max(1) as f64 / 1024.0;
        let msgs_repair_per_node = self.msg_sizes_repair as f64 / start_no_nodes.max(1) as f64;
        let nodes_sent_repair_share_pct = if msgs_all_per_node > 0.0 {
            msgs_repair_per_node / msgs_all_per_node * 100.0
        } else {
            0.0
        };
        let parity_total = self.parity_fails + self.prime_successes;
        let parity_fail_share_pct = if parity_total > 0 {
            self.parity_fails as f64 / parity_total as f64 * 100.0
        } else {
            0.0
        };
        let avg_prune_update_size_bytes = if self.prune_count > 0 {
            self.aggr_prune_size as f64 / self.prune_count as f64 / 1024.0
        } else {
            0.0
        };
        let encounters_both_outdated_share_pct = if self.total_encounters > 0 {
            self.encounters_both_no_poi as f64 / self.total_encounters as f64 * 100.0
        } else {
            0.0
        };

        SimulationReport {
            total_revocations: self.total_revokes,
            total_nodes_needing_repair: total_repairs,
            avg_repair_tries,
            lvlc_repair_share_pct,
            failed_repair_share_pct,
            avg_update_size_bytes,
            nodes_sent_per_week_bytes,
            nodes_sent_repair_share_pct,
            parity_fail_share_pct,
            avg_prune_update_size_bytes,
            total_encounters: self.total_encounters,
            encounters_both_outdated_share_pct,
        }
    }
}
