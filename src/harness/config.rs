//! Harness configuration and delay injection.
//!
//! A [`HarnessConfig`] fixes how many workers run, how many operations each
//! performs, and which [`Delay`] follows every operation. Delays only widen
//! race windows for demonstration; no primitive ever sleeps.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::{HarnessError, Result};

/// Pause injected after each operation to widen race windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delay {
    /// Run operations back to back.
    #[default]
    None,

    /// Sleep the same duration after every operation.
    Fixed(Duration),

    /// Sleep a uniform random duration in `0..=max` after every operation.
    /// Worker `i` draws from a generator seeded with `seed + i`, so a run is
    /// reproducible for a given seed.
    Random { max: Duration, seed: u64 },
}

impl Delay {
    pub(crate) fn injector(&self, worker: usize) -> DelayInjector {
        let source = match *self {
            Delay::None => Source::None,
            Delay::Fixed(d) if d.is_zero() => Source::None,
            Delay::Fixed(d) => Source::Fixed(d),
            Delay::Random { max, .. } if max.is_zero() => Source::None,
            Delay::Random { max, seed } => Source::Random {
                max_nanos: u64::try_from(max.as_nanos()).unwrap_or(u64::MAX),
                rng: StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
            },
        };
        DelayInjector { source }
    }
}

enum Source {
    None,
    Fixed(Duration),
    Random { max_nanos: u64, rng: StdRng },
}

/// Per-worker delay state; owned by exactly one worker thread.
pub(crate) struct DelayInjector {
    source: Source,
}

impl DelayInjector {
    // next pause length, or None when delay is disabled
    pub(crate) fn next_pause(&mut self) -> Option<Duration> {
        match &mut self.source {
            Source::None => None,
            Source::Fixed(d) => Some(*d),
            Source::Random { max_nanos, rng } => {
                Some(Duration::from_nanos(rng.gen_range(0..=*max_nanos)))
            }
        }
    }

    #[inline]
    pub(crate) fn pause(&mut self) {
        if let Some(d) = self.next_pause() {
            if !d.is_zero() {
                thread::sleep(d);
            }
        }
    }
}

/// Shape of a harness run: `threads` workers, each doing `iterations`
/// operations with `delay` after each one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Number of worker threads spawned.
    pub threads: usize,

    /// Operations performed by each worker.
    pub iterations: usize,

    /// Pause injected after every operation.
    pub delay: Delay,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            iterations: 100_000,
            delay: Delay::None,
        }
    }
}

impl HarnessConfig {
    /// Creates the default configuration: 2 threads x 100 000 iterations,
    /// no delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the operations per worker.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the injected delay.
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Total operations across all workers, checked against `isize`.
    pub fn total_ops(&self) -> Result<isize> {
        self.threads
            .checked_mul(self.iterations)
            .and_then(|n| isize::try_from(n).ok())
            .ok_or(HarnessError::WorkloadOverflow {
                threads: self.threads,
                iterations: self.iterations,
            })
    }

    /// Rejects configurations no harness can run.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(HarnessError::ZeroThreads);
        }
        if self.iterations == 0 {
            return Err(HarnessError::ZeroIterations);
        }
        self.total_ops().map(|_| ())
    }
}
