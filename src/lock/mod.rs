//! Reader/Writer Region Lock
//!
//! A reader/writer lock over two 32-bit atomic words, shaped so that every
//! handle of a store sees the same words through a shared `Arc`:
//!
//! ```text
//! Offset  Size   Field
//! 0       4      readers (AtomicI32, >= 0)
//! 4       4      writer  (AtomicU32, 0 = free, 1 = held)
//! ```
//!
//! Acquisition is a single atomic op in the uncontended case. Contended
//! paths park on a futex-style wait queue per word: waits are value-keyed
//! (a waiter parks only while the word still reads the value it last saw)
//! and bounded to [`WAIT_SLICE`] per spin, retrying until the cumulative
//! timeout elapses. Notify holds the queue mutex, so a waiter either
//! observes the updated word or is already parked when the notify lands.
//!
//! The same block doubles as the store-wide exclusive lock gating changes
//! to the key set.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

/// Upper bound for a single futex-style wait before the word is re-checked.
pub const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Default cumulative timeout for lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Value-keyed wait/notify for one lock word.
///
/// The in-process stand-in for a futex: `wait_if_*` parks the caller only
/// while the word still holds the value the caller last observed, for at
/// most `timeout`. Spurious wakeups are fine; callers re-check in a loop.
struct WaitQueue {
    mutex: Mutex<()>,
    cond: Condvar,
}

impl WaitQueue {
    const fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    fn wait_if_u32(&self, word: &AtomicU32, seen: u32, timeout: Duration) {
        let mut guard = self.mutex.lock();
        if word.load(Ordering::Acquire) != seen {
            return;
        }
        let _ = self.cond.wait_for(&mut guard, timeout);
    }

    fn wait_if_i32(&self, word: &AtomicI32, seen: i32, timeout: Duration) {
        let mut guard = self.mutex.lock();
        if word.load(Ordering::Acquire) != seen {
            return;
        }
        let _ = self.cond.wait_for(&mut guard, timeout);
    }

    fn notify_one(&self) {
        let _guard = self.mutex.lock();
        self.cond.notify_one();
    }

    fn notify_all(&self) {
        let _guard = self.mutex.lock();
        self.cond.notify_all();
    }
}

/// The shared lock block: two atomic words plus their wait queues.
///
/// `readers` counts in-flight shared holders; `writer` is the exclusive
/// flag. Readers never contend with each other, and the split-word design
/// keeps shared acquisition to one atomic add when no writer is around.
#[repr(C)]
pub struct RegionLock {
    readers: AtomicI32,
    writer: AtomicU32,
    readers_q: WaitQueue,
    writer_q: WaitQueue,
}

impl RegionLock {
    pub const fn new() -> Self {
        Self {
            readers: AtomicI32::new(0),
            writer: AtomicU32::new(0),
            readers_q: WaitQueue::new(),
            writer_q: WaitQueue::new(),
        }
    }

    /// Acquire the lock in shared mode.
    ///
    /// Increments `readers`; if a writer turns out to hold the block, the
    /// increment is undone and the caller waits on the writer word before
    /// retrying. Returns `false` once the cumulative timeout elapses.
    pub fn acquire_shared(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.readers.fetch_add(1, Ordering::AcqRel);
            if self.writer.load(Ordering::Acquire) == 0 {
                return true;
            }

            // Writer active: back out so it can finish draining.
            self.retire_reader();

            let now = Instant::now();
            if now >= deadline {
                tracing::trace!("shared acquisition timed out");
                return false;
            }
            let slice = WAIT_SLICE.min(deadline - now);
            self.writer_q.wait_if_u32(&self.writer, 1, slice);
        }
    }

    /// Acquire the lock in exclusive mode.
    ///
    /// CAS the writer word 0 -> 1, then wait for in-flight readers to
    /// drain to zero. If the readers never drain before the deadline the
    /// writer word is given back and the call fails.
    pub fn acquire_exclusive(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self
                .writer
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                loop {
                    let seen = self.readers.load(Ordering::Acquire);
                    if seen <= 0 {
                        return true;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::trace!("exclusive acquisition timed out with {} readers", seen);
                        self.release_exclusive();
                        return false;
                    }
                    let slice = WAIT_SLICE.min(deadline - now);
                    self.readers_q.wait_if_i32(&self.readers, seen, slice);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::trace!("exclusive acquisition timed out on writer word");
                return false;
            }
            let slice = WAIT_SLICE.min(deadline - now);
            self.writer_q.wait_if_u32(&self.writer, 1, slice);
        }
    }

    /// Non-blocking exclusive acquisition.
    ///
    /// Fails immediately when the writer word is taken or any reader is
    /// in flight. Used by pattern delete, which must never wait while it
    /// holds the store lock.
    pub fn try_acquire_exclusive(&self) -> bool {
        if self
            .writer
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if self.readers.load(Ordering::Acquire) > 0 {
            self.release_exclusive();
            return false;
        }
        true
    }

    /// Release a shared hold. The last reader out wakes one waiter parked
    /// on the readers word (a draining writer).
    pub fn release_shared(&self) {
        self.retire_reader();
    }

    /// Release the exclusive hold and wake everything parked on the
    /// writer word.
    pub fn release_exclusive(&self) {
        self.writer.store(0, Ordering::Release);
        self.writer_q.notify_all();
    }

    fn retire_reader(&self) {
        if self.readers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.readers_q.notify_one();
        }
    }

    /// Current reader count (diagnostic).
    pub fn readers(&self) -> i32 {
        self.readers.load(Ordering::Acquire)
    }

    /// Whether the writer word is currently held (diagnostic).
    pub fn writer_held(&self) -> bool {
        self.writer.load(Ordering::Acquire) == 1
    }
}

impl Default for RegionLock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionLock")
            .field("readers", &self.readers())
            .field("writer", &self.writer_held())
            .finish()
    }
}
