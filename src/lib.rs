//! Distributed certificate-revocation simulation over partitioned Sparse
//! Merkle Trees.
//!
//! A certificate authority keeps one SMT per partition and an aggregated
//! "prime root" that lets a node tell, from one small parity diff, which
//! partitions plausibly changed. Nodes carry a proof of inclusion for their
//! own certificate and patch it as revocations/reissues roll through,
//! either by peer gossip or by falling back to the CA.
//!
//! - [`hash`] - pluggable hash functions and the `Hash` sentinel type
//! - [`smt`] - sparse Merkle tree storage and level/sub caches
//! - [`proof`] - proof-of-inclusion algebra: split-level repair, cache folding
//! - [`ca`] - the partitioned certificate authority and its prime root
//! - [`node`] - passive network participants and the cache-carrying variant
//! - [`simulator`] - the epoch/sub_epoch/time_step discrete-event driver
//! - [`eval`] - batch sweeps across configurations, for CSV-driven analysis
//! - [`config`] - environment-driven simulation configuration
//! - [`logging`] - structured tracing setup
//! - [`persistence`] - SMT forest snapshotting

pub mod ca;
pub mod common;
pub mod config;
pub mod eval;
pub mod hash;
pub mod logging;
pub mod node;
pub mod persistence;
pub mod proof;
pub mod simulator;
pub mod smt;

pub use ca::{Ca, CaError, PrimeRoot, Update};
pub use common::{RevocError, Result};
pub use config::{ConfigError, RevocConfig};
pub use hash::{Hash, HashFn, Sha1Trunc8HashFn, Sha256HashFn};
pub use node::cacher::Cacher;
pub use node::Node;
pub use proof::{PathBitmap, SmtUtil};
pub use simulator::{Metrics, SimulationReport, Simulator};
pub use smt::{Smt, SmtError};
