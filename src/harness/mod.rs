//! # Harness
//!
//! Contention drivers for the primitives in this crate.
//!
//! Each harness owns its shared cell behind an [`Arc`], spawns a fixed number
//! of worker threads that each call exactly one primitive's operations, joins
//! them all, and only then reads the final value. Joining is what makes the
//! final read meaningful: it synchronizes the reader with every writer.
//!
//! | harness                     | workload                           | expectation          |
//! |-----------------------------|------------------------------------|----------------------|
//! | [`atomic_counter`]          | `threads x iterations` increments  | exactly `T x K`      |
//! | [`mixed_counter`]           | one increment or decrement each    | exactly `T1 - T2`    |
//! | [`spinlock_counter`]        | guarded `count += 1`               | exactly `T x K`      |
//! | [`unsynchronized_counter`]  | unguarded read-modify-write        | at most `T x K`      |
//! | [`flag_waves`]              | unsetters, join, then setters      | flag ends set        |
//! | [`mutual_exclusion`]        | occupancy gauge inside the lock    | peak occupancy 1     |
//!
//! ```rust
//! use axiom_sync::harness::{self, HarnessConfig};
//!
//! let config = HarnessConfig::new().with_threads(4).with_iterations(1_000);
//! let outcome = harness::spinlock_counter(&config).unwrap();
//! assert!(outcome.is_exact());
//! ```

mod config;
mod error;
mod unsync;

pub use config::{Delay, HarnessConfig};
pub use error::{HarnessError, Result};
pub use unsync::UnsyncCounter;

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use crate::{AtomicCounter, AtomicFlag, RawSpinLock};

/// Expected and observed final value of a counter harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub expected: isize,
    pub observed: isize,
}

impl Outcome {
    /// Observed value matches the expected one.
    pub fn is_exact(&self) -> bool {
        self.expected == self.observed
    }

    /// Updates missing from the observed value; zero when none were lost.
    pub fn lost_updates(&self) -> isize {
        self.expected.saturating_sub(self.observed).max(0)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, observed {}", self.expected, self.observed)?;
        if !self.is_exact() {
            write!(f, " ({} lost)", self.lost_updates())?;
        }
        Ok(())
    }
}

/// Result of [`mutual_exclusion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exclusion {
    /// Entries into the critical section, counted inside it.
    pub entries: usize,
    /// Largest number of threads seen inside the section at once.
    pub peak_occupancy: usize,
}

/// `threads x iterations` increments on an [`AtomicCounter`].
pub fn atomic_counter(config: &HarnessConfig) -> Result<Outcome> {
    let expected = prepare("atomic counter", config)?;
    let counter = Arc::new(AtomicCounter::new());

    let shared = Arc::clone(&counter);
    run_iterations(config, move || shared.increment())?;

    Ok(report("atomic counter", expected, counter.value()))
}

/// `incrementers` threads each increment once while `decrementers` threads
/// each decrement once, all on the same [`AtomicCounter`].
///
/// Both waves run concurrently. A worker that panics is reported with its
/// wave (`"inc"` or `"dec"`) and its index within that wave.
pub fn mixed_counter(incrementers: usize, decrementers: usize) -> Result<Outcome> {
    if incrementers == 0 && decrementers == 0 {
        return Err(HarnessError::ZeroThreads);
    }
    let expected = isize::try_from(incrementers)
        .ok()
        .zip(isize::try_from(decrementers).ok())
        .map(|(up, down)| up - down)
        .ok_or(HarnessError::WorkloadOverflow {
            threads: incrementers.saturating_add(decrementers),
            iterations: 1,
        })?;
    debug!("mixed counter: {incrementers} incrementers, {decrementers} decrementers");

    let counter = Arc::new(AtomicCounter::new());
    let up = Arc::clone(&counter);
    let down = Arc::clone(&counter);

    let inc = spawn_wave("inc", incrementers, move |_| up.increment())?;
    let dec = match spawn_wave("dec", decrementers, move |_| down.decrement()) {
        Ok(dec) => dec,
        Err(e) => {
            let _ = join_wave(inc);
            return Err(e);
        }
    };
    join_waves([inc, dec])?;

    Ok(report("mixed counter", expected, counter.value()))
}

/// A plain integer cell whose every access is bracketed by a [`RawSpinLock`].
struct GuardedCount {
    lock: RawSpinLock,
    count: UnsafeCell<isize>,
}

// Safety: `count` is only read or written between `lock.lock()` and
// `lock.unlock()`.
unsafe impl Sync for GuardedCount {}

impl GuardedCount {
    fn new() -> Self {
        Self {
            lock: RawSpinLock::new(),
            count: UnsafeCell::new(0),
        }
    }

    fn increment(&self) {
        self.lock.lock();
        // SAFETY: lock held.
        unsafe { *self.count.get() += 1 };
        // SAFETY: acquired above on this thread.
        unsafe { self.lock.unlock() };
    }

    fn read(&self) -> isize {
        self.lock.lock();
        // SAFETY: lock held.
        let value = unsafe { *self.count.get() };
        // SAFETY: acquired above on this thread.
        unsafe { self.lock.unlock() };
        value
    }
}

/// `threads x iterations` guarded `count += 1` on a plain integer.
pub fn spinlock_counter(config: &HarnessConfig) -> Result<Outcome> {
    let expected = prepare("spinlock counter", config)?;
    let cell = Arc::new(GuardedCount::new());

    let shared = Arc::clone(&cell);
    run_iterations(config, move || shared.increment())?;

    Ok(report("spinlock counter", expected, cell.read()))
}

/// `threads x iterations` unsynchronized increments on an [`UnsyncCounter`].
///
/// The observed value never exceeds the expected one and, under contention,
/// usually falls short of it. A shortfall is the point of this harness, not
/// a failure.
pub fn unsynchronized_counter(config: &HarnessConfig) -> Result<Outcome> {
    let expected = prepare("unsynchronized counter", config)?;
    let counter = Arc::new(UnsyncCounter::new());

    let shared = Arc::clone(&counter);
    run_iterations(config, move || shared.increment())?;

    Ok(report("unsynchronized counter", expected, counter.value()))
}

/// Runs `unsetters` threads calling [`AtomicFlag::unset`], joins them, then
/// runs `setters` threads calling [`AtomicFlag::set`]. Returns the final
/// [`AtomicFlag::is_set`].
///
/// The join between the two waves orders every set after every unset, so
/// the flag ends set whenever `setters > 0`. The flag alone gives no such
/// guarantee.
pub fn flag_waves(setters: usize, unsetters: usize) -> Result<bool> {
    if setters == 0 && unsetters == 0 {
        return Err(HarnessError::ZeroThreads);
    }
    debug!("flag: {unsetters} unsetters, then {setters} setters");
    let flag = Arc::new(AtomicFlag::new());

    let shared = Arc::clone(&flag);
    join_wave(spawn_wave("unset", unsetters, move |_| shared.unset())?)?;

    let shared = Arc::clone(&flag);
    join_wave(spawn_wave("set", setters, move |_| shared.set())?)?;

    let set = flag.is_set();
    info!("flag: is_set = {set}");
    Ok(set)
}

/// A critical section that records how many threads are inside it.
struct WatchedSection {
    lock: RawSpinLock,
    entries: UnsafeCell<usize>,
    // atomic so an overlap stays observable even if the lock were broken
    occupancy: AtomicUsize,
    peak: AtomicUsize,
}

// Safety: `entries` is only touched while `lock` is held.
unsafe impl Sync for WatchedSection {}

impl WatchedSection {
    fn new() -> Self {
        Self {
            lock: RawSpinLock::new(),
            entries: UnsafeCell::new(0),
            occupancy: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn enter(&self) {
        self.lock.lock();
        let now = self.occupancy.fetch_add(1, Relaxed) + 1;
        self.peak.fetch_max(now, Relaxed);
        // SAFETY: lock held.
        unsafe { *self.entries.get() += 1 };
        self.occupancy.fetch_sub(1, Relaxed);
        // SAFETY: acquired above on this thread.
        unsafe { self.lock.unlock() };
    }

    fn snapshot(&self) -> Exclusion {
        self.lock.lock();
        // SAFETY: lock held.
        let entries = unsafe { *self.entries.get() };
        // SAFETY: acquired above on this thread.
        unsafe { self.lock.unlock() };
        Exclusion {
            entries,
            peak_occupancy: self.peak.load(Relaxed),
        }
    }
}

/// `threads x iterations` entries into a [`RawSpinLock`]-guarded section
/// that tracks its own occupancy.
pub fn mutual_exclusion(config: &HarnessConfig) -> Result<Exclusion> {
    prepare("mutual exclusion", config)?;
    let section = Arc::new(WatchedSection::new());

    let shared = Arc::clone(&section);
    run_iterations(config, move || shared.enter())?;

    let result = section.snapshot();
    if result.peak_occupancy > 1 {
        warn!("mutual exclusion: peak occupancy {}", result.peak_occupancy);
    } else {
        info!(
            "mutual exclusion: {} entries, peak occupancy {}",
            result.entries, result.peak_occupancy
        );
    }
    Ok(result)
}

fn prepare(name: &str, config: &HarnessConfig) -> Result<isize> {
    config.validate()?;
    debug!(
        "{name}: {} threads x {} iterations, delay {:?}",
        config.threads, config.iterations, config.delay
    );
    config.total_ops()
}

fn report(name: &str, expected: isize, observed: isize) -> Outcome {
    let outcome = Outcome { expected, observed };
    if outcome.is_exact() {
        info!("{name}: {outcome}");
    } else {
        warn!("{name}: {outcome}");
    }
    outcome
}

// every worker runs `op` then the configured delay, `iterations` times
fn run_iterations<F>(config: &HarnessConfig, op: F) -> Result<()>
where
    F: Fn() + Send + Sync + 'static,
{
    let iterations = config.iterations;
    let delay = config.delay;
    join_wave(spawn_wave("worker", config.threads, move |worker| {
        let mut pause = delay.injector(worker);
        for _ in 0..iterations {
            op();
            pause.pause();
        }
    })?)
}

/// Threads started together for one role of a harness run.
struct Wave {
    label: &'static str,
    handles: Vec<JoinHandle<()>>,
}

// spawn `workers` threads running `job(index)`; on spawn failure the threads
// already started are joined before the error is returned
fn spawn_wave<F>(label: &'static str, workers: usize, job: F) -> Result<Wave>
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let mut wave = Wave {
        label,
        handles: Vec::with_capacity(workers),
    };

    for worker in 0..workers {
        let job = Arc::clone(&job);
        let spawned = thread::Builder::new()
            .name(format!("axiom-{label}-{worker}"))
            .spawn(move || job(worker));

        match spawned {
            Ok(handle) => wave.handles.push(handle),
            Err(e) => {
                warn!("spawning {label} worker {worker} failed: {e}");
                let _ = join_wave(wave);
                return Err(e.into());
            }
        }
    }

    debug!("spawned {workers} {label} workers");
    Ok(wave)
}

// join every handle; report the first worker that panicked
fn join_wave(wave: Wave) -> Result<()> {
    let Wave { label, handles } = wave;
    let mut first_panic = None;
    for (worker, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            warn!("{label} worker {worker} panicked");
            first_panic.get_or_insert(worker);
        }
    }

    match first_panic {
        Some(worker) => Err(HarnessError::WorkerPanicked {
            wave: label,
            worker,
        }),
        None => Ok(()),
    }
}

// join every wave, even after a failure; report the first failure
fn join_waves(waves: impl IntoIterator<Item = Wave>) -> Result<()> {
    waves
        .into_iter()
        .map(join_wave)
        .fold(Ok(()), |acc, joined| acc.and(joined))
}
