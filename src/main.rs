//! Command-line driver for the `axiom-sync` harnesses.
//!
//! Each subcommand runs one harness and prints what it expected next to what
//! it observed. The `race` subcommand usually comes up short: that shortfall
//! is the lost-update behaviour the other subcommands avoid.

use std::time::Duration;

use anyhow::Context;
use axiom_sync::harness::{self, Delay, HarnessConfig};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "axiom-sync")]
#[command(about = "Contention demos for atomic counters, flags and spinlocks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Shape of a threads x iterations run.
#[derive(Args, Debug)]
struct Workload {
    /// Worker threads
    #[arg(short, long, default_value_t = 2)]
    threads: usize,

    /// Operations per worker
    #[arg(short, long, default_value_t = 100_000)]
    iterations: usize,

    /// Upper bound of the random pause after each operation, in microseconds
    #[arg(long)]
    delay_max_us: Option<u64>,

    /// Seed for the random pause
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl Workload {
    fn config(&self) -> HarnessConfig {
        let delay = match self.delay_max_us {
            Some(us) => Delay::Random {
                max: Duration::from_micros(us),
                seed: self.seed,
            },
            None => Delay::None,
        };
        HarnessConfig::new()
            .with_threads(self.threads)
            .with_iterations(self.iterations)
            .with_delay(delay)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Increment an atomic counter from every worker
    Counter(Workload),

    /// One increment or decrement per thread on an atomic counter
    Mixed {
        /// Threads that increment once
        #[arg(long, default_value_t = 100)]
        incrementers: usize,
        /// Threads that decrement once
        #[arg(long, default_value_t = 50)]
        decrementers: usize,
    },

    /// Increment a plain integer under the spinlock
    Spinlock(Workload),

    /// Increment a plain integer with no synchronization
    Race(Workload),

    /// Unset a flag from one wave of threads, then set it from another
    Flag {
        /// Threads that set the flag (second wave)
        #[arg(long, default_value_t = 10)]
        setters: usize,
        /// Threads that unset the flag (first wave)
        #[arg(long, default_value_t = 5)]
        unsetters: usize,
    },

    /// Measure how many threads are ever inside the spinlock at once
    Exclusion(Workload),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Counter(workload) => {
            let outcome = harness::atomic_counter(&workload.config())
                .context("atomic counter harness")?;
            println!("Final count (atomic): {}", outcome.observed);
            println!("  {outcome}");
        }
        Commands::Mixed {
            incrementers,
            decrementers,
        } => {
            let outcome = harness::mixed_counter(incrementers, decrementers)
                .context("mixed counter harness")?;
            println!("Final count (mixed): {}", outcome.observed);
            println!("  {outcome}");
        }
        Commands::Spinlock(workload) => {
            let outcome =
                harness::spinlock_counter(&workload.config()).context("spinlock harness")?;
            println!("Final count (spinlock): {}", outcome.observed);
            println!("  {outcome}");
        }
        Commands::Race(workload) => {
            let outcome = harness::unsynchronized_counter(&workload.config())
                .context("unsynchronized harness")?;
            println!("Final count (unsynchronized): {}", outcome.observed);
            println!("  {outcome}");
        }
        Commands::Flag { setters, unsetters } => {
            let set = harness::flag_waves(setters, unsetters).context("flag harness")?;
            println!("Flag set after {unsetters} unsetters then {setters} setters: {set}");
        }
        Commands::Exclusion(workload) => {
            let result = harness::mutual_exclusion(&workload.config())
                .context("mutual exclusion harness")?;
            println!(
                "Entries: {}, peak occupancy: {}",
                result.entries, result.peak_occupancy
            );
        }
    }

    Ok(())
}
