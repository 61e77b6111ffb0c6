//! # SpinLock
//!
//! Mutual exclusion by busy-waiting on a compare-and-swap state word.
//!
//! Two layers are provided:
//!
//! - [`RawSpinLock`] is the bare state word. It knows nothing about the data
//!   it protects; callers bracket their critical section between
//!   [`RawSpinLock::lock`] and [`RawSpinLock::unlock`] themselves. It also
//!   implements [`lock_api::RawMutex`], so `lock_api::Mutex<RawSpinLock, T>`
//!   works as expected.
//! - [`SpinLock<T>`] owns its data and hands out a [`SpinGuard`] that releases
//!   the lock on drop, including during unwinding.
//!
//! ## State machine
//!
//! The state word holds `0` (unlocked) or `1` (locked) and starts unlocked.
//! Acquisition is a single CAS from `0` to `1`, retried with a [`BackOff`]
//! step between failures. Release is an unconditional store of `0`.
//!
//! ## Contract
//!
//! - **Not reentrant.** Locking again from the holding thread spins forever.
//! - **Not fair.** Under sustained contention any waiter may starve.
//! - **No timeout on `lock`.** Use [`RawSpinLock::try_lock_for`] or
//!   [`RawSpinLock::try_lock_until`] when waiting must be bounded.
//! - **Unlocking a lock you do not hold is not detected.** It simply stores
//!   `0`, after which two threads may both believe they hold the lock.
//!
//! ## Example
//! ```rust
//! use axiom_sync::SpinLock;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let lock = Arc::new(SpinLock::new(0u64));
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let lock = Arc::clone(&lock);
//!         thread::spawn(move || {
//!             for _ in 0..1_000 {
//!                 *lock.lock() += 1;
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(*lock.lock(), 4_000);
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

use crate::BackOff;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A spinlock state word with no attached data.
pub struct RawSpinLock {
    state: AtomicU32,
}

impl RawSpinLock {
    /// Creates an unlocked lock.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
        }
    }

    /// Acquires the lock, spinning until the CAS from unlocked to locked
    /// succeeds.
    ///
    /// ```
    /// use axiom_sync::RawSpinLock;
    ///
    /// let lock = RawSpinLock::new();
    /// lock.lock();
    /// assert!(lock.is_locked());
    /// unsafe { lock.unlock() };
    /// ```
    #[inline]
    pub fn lock(&self) {
        let backoff = BackOff::new();
        while self
            .state
            .compare_exchange_weak(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_err()
        {
            backoff.snooze();
        }
    }

    /// Makes a single acquisition attempt.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_ok()
    }

    /// Makes at most `attempts` acquisition attempts, backing off between
    /// them.
    #[inline]
    pub fn try_lock_for(&self, attempts: usize) -> bool {
        let backoff = BackOff::new();
        for _ in 0..attempts {
            if self.try_lock() {
                return true;
            }
            backoff.snooze();
        }
        false
    }

    /// Retries acquisition until it succeeds or `deadline` passes.
    ///
    /// At least one attempt is made, even with a deadline in the past.
    #[cfg(feature = "std")]
    pub fn try_lock_until(&self, deadline: std::time::Instant) -> bool {
        let backoff = BackOff::new();
        loop {
            if self.try_lock() {
                return true;
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            backoff.snooze();
        }
    }

    /// Releases the lock by storing `0`.
    ///
    /// # Safety
    /// The calling thread must hold the lock, acquired through `lock` or a
    /// successful `try_lock*`. Nothing checks this. Releasing a lock held by
    /// another thread lets a third thread in while the holder is still inside
    /// its critical section.
    #[inline]
    pub unsafe fn unlock(&self) {
        self.state.store(UNLOCKED, Release);
    }

    /// Returns whether the lock was held at the moment of the load.
    ///
    /// The answer may be stale by the time it is inspected.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.state.load(Relaxed) == LOCKED
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawSpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSpinLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = lock_api::GuardSend;

    #[inline]
    fn lock(&self) {
        RawSpinLock::lock(self)
    }

    #[inline]
    fn try_lock(&self) -> bool {
        RawSpinLock::try_lock(self)
    }

    #[inline]
    unsafe fn unlock(&self) {
        RawSpinLock::unlock(self)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        RawSpinLock::is_locked(self)
    }
}

/// A spinlock owning the value it protects.
///
/// See the [module-level documentation](self) for the locking contract.
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

/// Exclusive access to the data of a [`SpinLock`]; releases the lock when
/// dropped.
pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
    // shared guards only hand out `&T` across threads when `T: Sync`
    _marker: PhantomData<&'a mut T>,
}

impl<T> SpinLock<T> {
    /// Creates an unlocked [`SpinLock`] wrapping `data`.
    ///
    /// ```
    /// use axiom_sync::SpinLock;
    ///
    /// static TOTAL: SpinLock<u32> = SpinLock::new(7);
    /// assert_eq!(*TOTAL.lock(), 7);
    /// ```
    #[inline(always)]
    pub const fn new(data: T) -> Self {
        SpinLock {
            raw: RawSpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    #[inline(always)]
    fn guard(&self) -> SpinGuard<'_, T> {
        SpinGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    /// Acquires the lock, spinning until it becomes available.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_, T> {
        self.raw.lock();
        self.guard()
    }

    /// Attempts to acquire the lock once.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        self.raw.try_lock().then(|| self.guard())
    }

    /// Attempts to acquire the lock at most `attempts` times.
    #[inline]
    pub fn try_lock_for(&self, attempts: usize) -> Option<SpinGuard<'_, T>> {
        self.raw.try_lock_for(attempts).then(|| self.guard())
    }

    /// Attempts to acquire the lock until `deadline`.
    #[cfg(feature = "std")]
    pub fn try_lock_until(&self, deadline: std::time::Instant) -> Option<SpinGuard<'_, T>> {
        self.raw.try_lock_until(deadline).then(|| self.guard())
    }

    /// Runs `f` with exclusive access to the data.
    ///
    /// ```
    /// use axiom_sync::SpinLock;
    ///
    /// let lock = SpinLock::new(vec![1, 2]);
    /// let len = lock.with_lock(|v| {
    ///     v.push(3);
    ///     v.len()
    /// });
    /// assert_eq!(len, 3);
    /// ```
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Returns whether the lock is currently held.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Returns a mutable reference without locking; the borrow proves no
    /// guard exists.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the lock and returns the data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for SpinLock<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SpinLock");
        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.finish()
    }
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while this thread holds the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while this thread holds the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: a guard is only built after a successful acquisition.
        unsafe { self.lock.raw.unlock() }
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// Safety: the state word admits one guard at a time, so `T` is only ever
// reached from one thread at a time.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_basic_lock_unlock() {
        let lock = SpinLock::new(10);

        {
            let mut guard = lock.lock();
            *guard += 5;
            assert_eq!(*guard, 15);
            assert!(lock.is_locked());
        }

        assert!(!lock.is_locked(), "Lock should be released after guard drop");
        assert_eq!(lock.into_inner(), 15);
    }

    #[test]
    fn test_get_mut_and_from() {
        let mut lock = SpinLock::from(vec![1, 2]);
        lock.get_mut().push(3);
        assert!(!lock.is_locked(), "get_mut must not take the lock");
        assert_eq!(*lock.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_raw_try_lock_fails_while_held() {
        let raw = RawSpinLock::new();
        assert!(raw.try_lock());
        assert!(!raw.try_lock());
        assert!(!raw.try_lock_for(10));
        unsafe { raw.unlock() };
        assert!(raw.try_lock());
        unsafe { raw.unlock() };
        assert!(!raw.is_locked());
    }

    #[test]
    fn test_try_lock_for_behavior() {
        let lock = SpinLock::new(42);

        let guard = lock.lock();
        assert!(lock.try_lock().is_none());
        assert!(lock.try_lock_for(10).is_none(), "Lock should not be acquirable while held");

        drop(guard);
        let guard2 = lock.try_lock_for(1000);
        assert!(guard2.is_some(), "Lock should succeed after previous guard drop");
    }

    #[test]
    fn test_debug_does_not_block_when_held() {
        let lock = SpinLock::new(3);
        assert_eq!(format!("{lock:?}"), "SpinLock { data: 3 }");
        let _guard = lock.lock();
        assert_eq!(format!("{lock:?}"), "SpinLock { data: <locked> }");
    }

    #[cfg(feature = "std")]
    mod threaded {
        use super::super::*;
        use std::cell::UnsafeCell;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::thread;
        use std::time::{Duration, Instant};

        struct Guarded {
            lock: RawSpinLock,
            count: UnsafeCell<usize>,
        }

        // Safety: `count` is only touched between `lock` and `unlock`.
        unsafe impl Sync for Guarded {}

        #[test]
        fn test_raw_lock_serializes_read_modify_write() {
            let shared = Arc::new(Guarded {
                lock: RawSpinLock::new(),
                count: UnsafeCell::new(0),
            });

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let shared = Arc::clone(&shared);
                    thread::spawn(move || {
                        for _ in 0..100_000 {
                            shared.lock.lock();
                            unsafe { *shared.count.get() += 1 };
                            unsafe { shared.lock.unlock() };
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }

            shared.lock.lock();
            let total = unsafe { *shared.count.get() };
            unsafe { shared.lock.unlock() };
            assert_eq!(total, 200_000);
        }

        #[test]
        fn test_concurrent_access() {
            let lock = Arc::new(SpinLock::new(0usize));
            let mut handles = vec![];

            for _ in 0..8 {
                let lock = Arc::clone(&lock);
                handles.push(thread::spawn(move || {
                    for _ in 0..10_000 {
                        *lock.lock() += 1;
                    }
                }));
            }

            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(*lock.lock(), 8 * 10_000, "Counter should match total increments");
        }

        #[test]
        fn test_single_occupant() {
            let lock = Arc::new(SpinLock::new(()));
            let inside = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let (lock, inside, peak) =
                        (Arc::clone(&lock), Arc::clone(&inside), Arc::clone(&peak));
                    thread::spawn(move || {
                        for _ in 0..5_000 {
                            let _guard = lock.lock();
                            let now = inside.fetch_add(1, Ordering::Relaxed) + 1;
                            peak.fetch_max(now, Ordering::Relaxed);
                            inside.fetch_sub(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(peak.load(Ordering::Relaxed), 1);
        }

        #[test]
        fn test_try_lock_until_gives_up_at_deadline() {
            let lock = SpinLock::new(0);
            let _held = lock.lock();

            let start = Instant::now();
            let deadline = start + Duration::from_millis(20);
            assert!(lock.try_lock_until(deadline).is_none());
            assert!(Instant::now() >= deadline);
        }

        #[test]
        fn test_try_lock_until_past_deadline_still_attempts() {
            let lock = SpinLock::new(0);
            assert!(lock.try_lock_until(Instant::now()).is_some());
        }

        #[test]
        fn test_guard_released_on_panic() {
            let lock = Arc::new(SpinLock::new(0));
            let poisoner = Arc::clone(&lock);

            let result = thread::spawn(move || {
                let mut guard = poisoner.lock();
                *guard += 1;
                panic!("critical section failed");
            })
            .join();

            assert!(result.is_err());
            assert!(!lock.is_locked());
            assert_eq!(*lock.lock(), 1);
        }

        #[test]
        fn test_backs_lock_api_mutex() {
            let mutex = Arc::new(lock_api::Mutex::<RawSpinLock, u32>::new(0));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let mutex = Arc::clone(&mutex);
                    thread::spawn(move || {
                        for _ in 0..10_000 {
                            *mutex.lock() += 1;
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(*mutex.lock(), 40_000);
            assert!(mutex.try_lock().is_some());
        }
    }
}
