//! Errors raised while setting up or joining a harness run.
//!
//! The primitives themselves never fail; only the harness around them can.

use std::io;

use thiserror::Error;

/// Why a harness run could not produce a result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarnessError {
    /// The run would spawn no worker threads.
    #[error("harness needs at least one worker thread")]
    ZeroThreads,

    /// Each worker would perform no operations.
    #[error("harness needs at least one iteration per worker")]
    ZeroIterations,

    /// The total operation count does not fit the counter.
    #[error("{threads} threads x {iterations} iterations overflows the counter")]
    WorkloadOverflow { threads: usize, iterations: usize },

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// A worker panicked; `worker` is its index within `wave`.
    #[error("{wave} worker {worker} panicked")]
    WorkerPanicked { wave: &'static str, worker: usize },
}

/// Result alias for harness runs.
pub type Result<T> = std::result::Result<T, HarnessError>;
