//! `revoc-sim` - run the revocation simulator, or a config sweep, from the
//! command line.
//!
//! ```text
//!   revoc-sim sim                  run a single simulation with REVOC_* env config
//!   revoc-sim sweep <output.csv>   run the default node-count sweep, write csv
//!   revoc-sim help                 show this message
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use revoc_smt::config::RevocConfig;
use revoc_smt::eval;
use revoc_smt::hash::{HashFn, Sha256HashFn};
use revoc_smt::logging;
use revoc_smt::Simulator;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "sim" => run_sim(),
        "sweep" => run_sweep(args.get(2).map(String::as_str)),
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("unknown command: {other}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("revoc-sim - certificate-revocation SMT simulator");
    println!();
    println!("Usage:");
    println!("  revoc-sim sim                  run a single simulation");
    println!("  revoc-sim sweep <output.csv>   run the default node-count sweep");
    println!("  revoc-sim help                 show this message");
    println!();
    println!("Configuration is read from REVOC_* environment variables; see");
    println!("src/config.rs for the full list and their defaults.");
}

fn run_sim() -> ExitCode {
    let config = match RevocConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_from_config(&config) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = Arc::new(config);
    let hash_fn: Arc<dyn HashFn> = Arc::new(Sha256HashFn);

    let mut sim = match Simulator::new(config, hash_fn) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to set up simulator: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = sim.run();
    println!("{report:#?}");
    ExitCode::SUCCESS
}

fn run_sweep(output_path: Option<&str>) -> ExitCode {
    let Some(output_path) = output_path else {
        eprintln!("sweep requires an output csv path, e.g. `revoc-sim sweep result.csv`");
        return ExitCode::FAILURE;
    };

    let base = match RevocConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_from_config(&base) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let configs = eval::default_sweep_configs(&base);
    tracing::info!(run_count = configs.len(), "starting sweep");

    let rows = match eval::run_sweep(&configs, 0) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("sweep failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = eval::write_csv(std::path::Path::new(output_path), &rows) {
        eprintln!("failed to write csv: {e}");
        return ExitCode::FAILURE;
    }

    println!("wrote {} rows to {output_path}", rows.len());
    ExitCode::SUCCESS
}
