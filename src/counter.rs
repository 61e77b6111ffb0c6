//! # AtomicCounter
//!
//! A signed machine-word counter that is only ever changed by atomic
//! read-modify-write operations.
//!
//! Every operation on one counter is part of a single total order that all
//! threads agree on, so increments are never lost. The counter is *not* a
//! fence: its operations are [`Relaxed`], and a thread that reads the counter
//! learns nothing about other memory written by the incrementing threads.
//! Synchronize with the writers (for example by joining them) before trusting
//! a value as final.
//!
//! ## Overflow
//! Arithmetic wraps around on overflow, in two's complement, like
//! [`isize::wrapping_add`]. No operation panics. Do not build logic on the
//! wrap.
//!
//! ```rust
//! use axiom_sync::AtomicCounter;
//!
//! let hits = AtomicCounter::new();
//! hits.increment();
//! hits.increment();
//! hits.decrement();
//! assert_eq!(hits.value(), 1);
//! ```

use core::sync::atomic::{AtomicIsize, Ordering::Relaxed};

/// Signed counter mutated only through atomic add and subtract.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicIsize,
}

impl AtomicCounter {
    /// Creates a counter at zero.
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_value(0)
    }

    /// Creates a counter at `value`.
    #[inline(always)]
    pub const fn with_value(value: isize) -> Self {
        Self {
            value: AtomicIsize::new(value),
        }
    }

    /// Atomically adds one.
    #[inline]
    pub fn increment(&self) {
        self.value.fetch_add(1, Relaxed);
    }

    /// Atomically subtracts one.
    #[inline]
    pub fn decrement(&self) {
        self.value.fetch_sub(1, Relaxed);
    }

    /// Atomically adds `delta` and returns the previous value.
    #[inline]
    pub fn add(&self, delta: isize) -> isize {
        self.value.fetch_add(delta, Relaxed)
    }

    /// Atomically reads the current value.
    #[inline]
    pub fn value(&self) -> isize {
        self.value.load(Relaxed)
    }

    /// Consumes the counter and returns its value.
    #[inline]
    pub fn into_inner(self) -> isize {
        self.value.into_inner()
    }
}

impl From<isize> for AtomicCounter {
    fn from(value: isize) -> Self {
        Self::with_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(AtomicCounter::new().value(), 0);
        assert_eq!(AtomicCounter::default().value(), 0);
        assert_eq!(AtomicCounter::from(-12).value(), -12);
    }

    #[test]
    fn test_increment_decrement_add() {
        let c = AtomicCounter::new();
        c.increment();
        c.increment();
        c.decrement();
        assert_eq!(c.add(10), 1);
        assert_eq!(c.add(-4), 11);
        assert_eq!(c.into_inner(), 7);
    }

    #[test]
    fn test_wraps_on_overflow() {
        let c = AtomicCounter::with_value(isize::MAX);
        c.increment();
        assert_eq!(c.value(), isize::MIN);
        c.decrement();
        assert_eq!(c.value(), isize::MAX);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_concurrent_increments_converge() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(AtomicCounter::new());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    for _ in 0..100_000 {
                        c.increment();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.value(), 200_000);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_mixed_increment_decrement() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(AtomicCounter::new());
        let mut handles = Vec::with_capacity(150);
        for i in 0..150 {
            let c = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                if i < 100 {
                    c.increment()
                } else {
                    c.decrement()
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.value(), 50);
    }
}
