//! Negative control: a counter incremented without synchronization.
//!
//! A true data race on a plain integer is undefined behaviour in Rust, so the
//! counter keeps its value in an atomic cell but increments it as two separate
//! steps: a relaxed load followed by a relaxed store of `value + 1`. Another
//! thread can store between the two, and its increment is then overwritten.
//! That is the lost update a plain `count++` suffers, without the UB.

use std::sync::atomic::{AtomicIsize, Ordering::Relaxed};

/// Counter whose increment is a separate load and store, so concurrent
/// increments can overwrite each other.
#[derive(Debug, Default)]
pub struct UnsyncCounter {
    value: AtomicIsize,
}

impl UnsyncCounter {
    /// Creates a counter at zero.
    pub const fn new() -> Self {
        Self {
            value: AtomicIsize::new(0),
        }
    }

    /// Read, add one, write back. Not atomic as a whole.
    #[inline]
    pub fn increment(&self) {
        let seen = self.value.load(Relaxed);
        self.value.store(seen.wrapping_add(1), Relaxed);
    }

    /// Reads the current value. Only final once every incrementing thread
    /// has been joined.
    pub fn value(&self) -> isize {
        self.value.load(Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_thread_is_exact() {
        let c = UnsyncCounter::new();
        for _ in 0..1_000 {
            c.increment();
        }
        assert_eq!(c.value(), 1_000);
        assert_eq!(UnsyncCounter::default().value(), 0);
    }
}
