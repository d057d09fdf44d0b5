//! Structured logging for the revocation backend.
//!
//! Builds on `tracing`/`tracing-subscriber` the way production services in
//! this codebase do: a JSON layer for unattended runs (evaluation sweeps,
//! long simulations), a pretty layer for interactive use, both gated by an
//! `EnvFilter` so a single `REVOC_LOG` level controls every target.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Application log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Event categories used as `tracing` targets, so a single filter directive
/// (e.g. `revoc::repair=debug`) can isolate one subsystem.
#[derive(Debug, Clone, Copy)]
pub enum EventCategory {
    /// Leaf issuance/revocation against the CA's SMTs.
    Revocation,
    /// Node/Cacher repair attempts (PoI, level-cache, CA fallback).
    Repair,
    /// Prime-root parity aliasing/detection.
    Parity,
    /// Simulation driver progress (epoch/sub-epoch/time-step boundaries).
    Simulation,
    /// Process startup/shutdown.
    System,
}

impl EventCategory {
    pub fn target(&self) -> &'static str {
        match self {
            EventCategory::Revocation => "revoc::revocation",
            EventCategory::Repair => "revoc::repair",
            EventCategory::Parity => "revoc::parity",
            EventCategory::Simulation => "revoc::simulation",
            EventCategory::System => "revoc::system",
        }
    }
}

/// Log an issuance or revocation against a CA partition.
pub fn log_revocation_event(smt_part: usize, leaf_hex: &str, revoked: bool) {
    if revoked {
        tracing::info!(target: EventCategory::Revocation.target(), smt_part, leaf = leaf_hex, "leaf revoked");
    } else {
        tracing::info!(target: EventCategory::Revocation.target(), smt_part, leaf = leaf_hex, "leaf issued");
    }
}

/// Log the outcome of a node's attempt to repair a stale proof.
pub fn log_repair_attempt(node_id: usize, method: &str, tries_used: u32, success: bool) {
    if success {
        tracing::debug!(target: EventCategory::Repair.target(), node_id, method, tries_used, "repair succeeded");
    } else {
        tracing::warn!(target: EventCategory::Repair.target(), node_id, method, tries_used, "repair failed");
    }
}

/// Log a detected parity aliasing event (two distinct divergences that
/// happen to cancel out in the aggregated XOR lane).
pub fn log_parity_aliasing(node_id: usize, aggr_lane: usize) {
    tracing::warn!(target: EventCategory::Parity.target(), node_id, aggr_lane, "parity aliasing detected");
}

/// Log a simulation epoch boundary.
pub fn log_epoch_boundary(epoch: u64, sub_epoch: u64, time_step: u64) {
    tracing::debug!(target: EventCategory::Simulation.target(), epoch, sub_epoch, time_step, "epoch boundary");
}

/// Initialize the logging system.
///
/// `json_format` selects the JSON layer (unattended runs, log aggregation)
/// over the pretty layer (interactive `revoc-sim` invocations).
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("revoc={level}")));

    if json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        );
        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        );
        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from a [`crate::config::RevocConfig`].
pub fn init_from_config(config: &crate::config::RevocConfig) -> Result<(), LoggingError> {
    init_logging(config.log_level, config.log_json)
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parsing_falls_back_to_info() {
        assert_eq!(LogLevel::from("debug").to_string(), "debug");
        assert_eq!(LogLevel::from("WARNING").to_string(), "warn");
        assert_eq!(LogLevel::from("unknown").to_string(), "info");
    }

    #[test]
    fn event_category_targets_are_namespaced_under_revoc() {
        assert!(EventCategory::Repair.target().starts_with("revoc::"));
        assert!(EventCategory::Parity.target().starts_with("revoc::"));
    }
}
