use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use lamport_mutex::config::{ClusterConfig, HoldPolicy};
use lamport_mutex::sync::{Cluster, Driver, Ledger};

/// Run N processes that repeatedly take turns on a shared resource using Lamport's
/// mutual exclusion algorithm, then check the grant history.
#[derive(Parser, Debug)]
#[command(name = "lamport-mutex", version)]
struct Cli {
    /// Number of processes
    #[arg(short = 'n', long, default_value_t = 3)]
    processes: usize,

    /// Acquisitions per process
    #[arg(short, long, default_value_t = 5)]
    rounds: usize,

    /// Minimum hold time in milliseconds
    #[arg(long, default_value_t = 0)]
    min_hold_ms: u64,

    /// Maximum hold time in milliseconds
    #[arg(long, default_value_t = 20)]
    max_hold_ms: u64,
}

impl Cli {
    fn config(&self) -> ClusterConfig {
        ClusterConfig::new(
            self.processes,
            HoldPolicy::random_millis(self.min_hold_ms, self.max_hold_ms),
        )
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let ledger = Arc::new(Ledger::new());
    let cluster = Cluster::start(&cli.config(), Arc::clone(&ledger))
        .context("failed to start cluster")?;

    let drivers: Vec<_> = cluster
        .processes()
        .iter()
        .map(|p| Driver::spawn(Arc::clone(p)))
        .collect();
    drivers.iter().for_each(|d| d.add_occupy_times(cli.rounds));
    drivers.iter().for_each(Driver::wait_done);
    drivers.into_iter().for_each(Driver::stop);
    cluster.shutdown();

    let grants = ledger.grants();
    let order: Vec<_> = grants.iter().map(ToString::to_string).collect();
    info!(grants = grants.len(), order = %order.join(" "), "grant history");

    let violations = ledger.violations();
    let in_order = grants.windows(2).all(|w| w[0] < w[1]);
    if violations > 0 || !in_order || grants.len() != cli.processes * cli.rounds {
        warn!(violations, in_order, "mutual exclusion violated");
        return Ok(ExitCode::FAILURE);
    }
    info!("no overlapping occupancy, grants in timestamp order");
    Ok(ExitCode::SUCCESS)
}
