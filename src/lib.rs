//! # axiom-sync 🌀
//!
//! Small shared-memory synchronization primitives, plus the harnesses that
//! show them holding up under contention next to an unsynchronized baseline
//! that does not.
//!
//! The crate includes:
//!
//! - [`AtomicCounter`]: a signed counter changed only by atomic add/subtract.
//! - [`AtomicFlag`]: a boolean stored as an atomic `0`/`1`.
//! - [`RawSpinLock`]: a compare-and-swap spinlock guarding an external
//!   critical section, and [`SpinLock<T>`] which owns its data behind an
//!   RAII [`SpinGuard`].
//! - [`BackOff`]: the bounded exponential back-off the lock spins with.
//! - [`harness`] (`std`): N-thread by M-iteration drivers for each primitive
//!   and for the unsynchronized negative control.
//!
//! Nothing here blocks on an OS primitive. Waiting means spinning, with an
//! optional cooperative yield once contention persists.
//!
//! ## ✨ Features
//!
//! - ⚙️ `std` (default): yield the CPU while backing off, deadline-bounded
//!   locking, and the [`harness`] module.
//! - 🧰 `cli` (default): the `axiom-sync` demonstration binary.
//!
//! ## 🚀 Quick Example
//!
//! ```rust
//! use axiom_sync::{AtomicCounter, AtomicFlag, SpinLock};
//!
//! let hits = AtomicCounter::new();
//! hits.increment();
//! assert_eq!(hits.value(), 1);
//!
//! let done = AtomicFlag::new();
//! done.set();
//! assert!(done.is_set());
//!
//! let lock = SpinLock::new(0);
//! {
//!     let mut guard = lock.lock();
//!     *guard += 1;
//! } // unlocked when the guard is dropped
//! assert_eq!(*lock.lock(), 1);
//! ```
//!
//! ## ⚠️ Contract
//!
//! These primitives never fail and never check for misuse. Misuse gives
//! silently wrong results:
//!
//! - Unlocking a [`RawSpinLock`] you do not hold lets two threads in at once.
//! - Locking a spinlock you already hold spins forever (no reentrancy).
//! - A waiter may starve indefinitely (no fairness).
//! - Reading a counter before synchronizing with its writers (join, barrier)
//!   may give any value they have produced so far.
//!
//! ## 📦 Modules
//!
//! - [`backoff`]: bounded exponential back-off.
//! - [`counter`]: atomic counter.
//! - [`flag`]: atomic flag.
//! - [`spinlock`]: raw and data-owning spinlocks.
//! - [`harness`]: contention drivers (`std`).

pub mod backoff;
pub mod counter;
pub mod flag;
pub mod spinlock;

#[cfg(feature = "std")]
pub mod harness;

pub use backoff::BackOff;
pub use counter::AtomicCounter;
pub use flag::AtomicFlag;
pub use spinlock::{RawSpinLock, SpinGuard, SpinLock};
