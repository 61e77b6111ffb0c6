//! # AtomicFlag
//!
//! A boolean stored as an atomic `0`/`1` byte.
//!
//! Each store and load is whole: no reader ever sees anything but `0` or `1`.
//! The flag does **not** order competing writers. If one thread calls
//! [`AtomicFlag::set`] while another calls [`AtomicFlag::unset`], the final
//! value is whichever store landed last, exactly as with two plain stores.
//! Callers that need a particular winner have to order the writers
//! themselves, for example by joining one group before starting the other.
//!
//! Stores are [`Release`] and loads [`Acquire`]: a thread that observes the
//! flag set also observes everything the setter wrote before setting it.
//!
//! ```rust
//! use axiom_sync::AtomicFlag;
//!
//! let flag = AtomicFlag::new();
//! assert!(!flag.is_set());
//! flag.set();
//! flag.set();
//! assert!(flag.is_set());
//! flag.unset();
//! assert!(!flag.is_set());
//! ```

use core::fmt;
use core::sync::atomic::{
    AtomicU8,
    Ordering::{Acquire, Release},
};

const UNSET: u8 = 0;
const SET: u8 = 1;

/// Boolean cell mutated only through atomic store.
#[derive(Default)]
pub struct AtomicFlag {
    state: AtomicU8,
}

impl AtomicFlag {
    /// Creates an unset flag.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNSET),
        }
    }

    /// Atomically stores `1`.
    #[inline]
    pub fn set(&self) {
        self.state.store(SET, Release);
    }

    /// Atomically stores `0`.
    #[inline]
    pub fn unset(&self) {
        self.state.store(UNSET, Release);
    }

    /// Sets the flag when `value` is `true`, unsets it otherwise.
    #[inline]
    pub fn store(&self, value: bool) {
        self.state.store(if value { SET } else { UNSET }, Release);
    }

    /// Atomically loads the flag.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.state.load(Acquire) == SET
    }
}

impl From<bool> for AtomicFlag {
    fn from(value: bool) -> Self {
        let flag = Self::new();
        flag.store(value);
        flag
    }
}

impl fmt::Debug for AtomicFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicFlag")
            .field("set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_unset_idempotent() {
        let flag = AtomicFlag::default();
        flag.unset();
        assert!(!flag.is_set());
        flag.set();
        flag.set();
        assert!(flag.is_set());
        flag.store(false);
        flag.store(false);
        assert!(!flag.is_set());
        assert!(AtomicFlag::from(true).is_set());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_setters_after_unsetters_end_set() {
        use std::sync::Arc;
        use std::thread;

        let flag = Arc::new(AtomicFlag::new());

        let unsetters: Vec<_> = (0..5)
            .map(|_| {
                let flag = Arc::clone(&flag);
                thread::spawn(move || flag.unset())
            })
            .collect();
        for h in unsetters {
            h.join().unwrap();
        }

        let setters: Vec<_> = (0..10)
            .map(|_| {
                let flag = Arc::clone(&flag);
                thread::spawn(move || flag.set())
            })
            .collect();
        for h in setters {
            h.join().unwrap();
        }

        assert!(flag.is_set());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_set_publishes_prior_writes() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::thread;

        let flag = Arc::new(AtomicFlag::new());
        let payload = Arc::new(AtomicUsize::new(0));

        let writer = {
            let (flag, payload) = (Arc::clone(&flag), Arc::clone(&payload));
            thread::spawn(move || {
                payload.store(42, Ordering::Relaxed);
                flag.set();
            })
        };

        while !flag.is_set() {
            std::hint::spin_loop();
        }
        assert_eq!(payload.load(Ordering::Relaxed), 42);
        writer.join().unwrap();
    }
}
