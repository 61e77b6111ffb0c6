//! # BackOff
//!
//! Bounded exponential back-off for compare-and-swap retry loops.
//!
//! Every call to [`BackOff::snooze`] issues a burst of
//! [`core::hint::spin_loop`] hints twice as long as the one before. Once a
//! burst reaches [`SPIN_LIMIT`] the back-off stops growing. From then on each
//! step gives the rest of the time slice back to the scheduler with
//! [`std::thread::yield_now`] when the `std` feature is enabled, or keeps
//! spinning at the limit without it.
//!
//! A step never parks the thread or waits on an OS object. The caller is back
//! in its retry loop as soon as the step returns, so contention only costs
//! CPU time and never changes who may acquire next.
//!
//! ## Example
//! ```rust
//! use axiom_sync::BackOff;
//! use core::sync::atomic::{AtomicBool, Ordering};
//!
//! let ready = AtomicBool::new(true);
//! let backoff = BackOff::new();
//!
//! while ready
//!     .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
//!     .is_err()
//! {
//!     backoff.snooze();
//! }
//! ```
//!
//! ## Feature flags
//! - **`std`**: yield to the scheduler once the spin burst is saturated.

use core::{cell::Cell, hint::spin_loop};

/// Spin hints issued by the first step.
pub const START_SPIN: u32 = 1;

/// Largest burst of spin hints a single step will issue.
pub const SPIN_LIMIT: u32 = 1 << 10;

/// Exponential back-off state for one waiter.
///
/// Cheap to create; build a fresh one at the start of every acquisition
/// attempt rather than sharing it between threads (it is `!Sync`).
#[derive(Debug)]
pub struct BackOff {
    spin: Cell<u32>,
}

impl BackOff {
    /// Creates a back-off starting at [`START_SPIN`].
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            spin: Cell::new(START_SPIN),
        }
    }

    /// Creates a back-off whose first burst is `start` spins.
    ///
    /// `start` is clamped into `1..=SPIN_LIMIT`.
    ///
    /// ```
    /// use axiom_sync::backoff::{BackOff, SPIN_LIMIT};
    ///
    /// assert_eq!(BackOff::new_with(0).current(), 1);
    /// assert_eq!(BackOff::new_with(u32::MAX).current(), SPIN_LIMIT);
    /// ```
    #[inline(always)]
    pub const fn new_with(start: u32) -> Self {
        let start = if start == 0 {
            1
        } else if start > SPIN_LIMIT {
            SPIN_LIMIT
        } else {
            start
        };
        Self {
            spin: Cell::new(start),
        }
    }

    /// Waits for one step.
    ///
    /// Below the limit this spins `current()` times and doubles the burst.
    /// At the limit it yields the thread (`std`) or spins a full burst.
    #[inline]
    pub fn snooze(&self) {
        let burst = self.spin.get();

        if burst < SPIN_LIMIT {
            for _ in 0..burst {
                spin_loop();
            }
            self.spin.set((burst << 1).min(SPIN_LIMIT));
            return;
        }

        #[cfg(feature = "std")]
        std::thread::yield_now();

        #[cfg(not(feature = "std"))]
        for _ in 0..burst {
            spin_loop();
        }
    }

    /// Returns `true` once the burst has stopped growing.
    #[inline(always)]
    pub fn is_saturated(&self) -> bool {
        self.spin.get() >= SPIN_LIMIT
    }

    /// Returns the number of spins the next step will issue.
    #[inline(always)]
    pub fn current(&self) -> u32 {
        self.spin.get()
    }

    /// Restarts the back-off from [`START_SPIN`].
    #[inline(always)]
    pub fn reset(&self) {
        self.spin.set(START_SPIN);
    }
}

impl Default for BackOff {
    fn default() -> Self {
        Self::new()
    }
}
