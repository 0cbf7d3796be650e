use super::*;
use std::sync::Arc;
use std::thread;

// ============================================================
// UNCONTENDED PATHS
// ============================================================

#[test]
fn test_shared_acquire_release() {
    let lock = RegionLock::new();

    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));
    assert_eq!(lock.readers(), 1);

    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));
    assert_eq!(lock.readers(), 2);

    lock.release_shared();
    lock.release_shared();
    assert_eq!(lock.readers(), 0);
}

#[test]
fn test_exclusive_acquire_release() {
    let lock = RegionLock::new();

    assert!(lock.acquire_exclusive(DEFAULT_LOCK_TIMEOUT));
    assert!(lock.writer_held());

    lock.release_exclusive();
    assert!(!lock.writer_held());
}

#[test]
fn test_try_exclusive() {
    let lock = RegionLock::new();

    assert!(lock.try_acquire_exclusive());
    assert!(!lock.try_acquire_exclusive());
    lock.release_exclusive();
    assert!(lock.try_acquire_exclusive());
    lock.release_exclusive();
}

#[test]
fn test_try_exclusive_fails_under_reader() {
    let lock = RegionLock::new();

    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));
    assert!(!lock.try_acquire_exclusive());
    // The failed attempt must not leave the writer word set.
    assert!(!lock.writer_held());
    lock.release_shared();
}

// ============================================================
// CONTENTION / TIMEOUT
// ============================================================

#[test]
fn test_shared_times_out_under_writer() {
    let lock = RegionLock::new();

    assert!(lock.acquire_exclusive(DEFAULT_LOCK_TIMEOUT));
    let start = std::time::Instant::now();
    assert!(!lock.acquire_shared(Duration::from_millis(50)));
    assert!(start.elapsed() >= Duration::from_millis(50));
    // Backed-out increment must not linger.
    assert_eq!(lock.readers(), 0);
    lock.release_exclusive();
}

#[test]
fn test_exclusive_times_out_under_reader() {
    let lock = RegionLock::new();

    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));
    assert!(!lock.acquire_exclusive(Duration::from_millis(50)));
    // The failed writer must release the word so readers keep flowing.
    assert!(!lock.writer_held());
    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));
    lock.release_shared();
    lock.release_shared();
}

#[test]
fn test_writer_waits_for_reader_drain() {
    let lock = Arc::new(RegionLock::new());

    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));

    let writer_lock = lock.clone();
    let writer = thread::spawn(move || writer_lock.acquire_exclusive(DEFAULT_LOCK_TIMEOUT));

    // Give the writer time to take the writer word and start draining.
    thread::sleep(Duration::from_millis(50));
    assert!(lock.writer_held());

    lock.release_shared();
    assert!(writer.join().unwrap());
    lock.release_exclusive();
}

#[test]
fn test_reader_waits_for_writer_release() {
    let lock = Arc::new(RegionLock::new());

    assert!(lock.acquire_exclusive(DEFAULT_LOCK_TIMEOUT));

    let reader_lock = lock.clone();
    let reader = thread::spawn(move || reader_lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));

    thread::sleep(Duration::from_millis(50));
    lock.release_exclusive();

    assert!(reader.join().unwrap());
    lock.release_shared();
}

#[test]
fn test_writers_are_mutually_exclusive() {
    let lock = Arc::new(RegionLock::new());
    let in_critical = Arc::new(std::sync::atomic::AtomicI32::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let lock = lock.clone();
        let in_critical = in_critical.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                assert!(lock.acquire_exclusive(DEFAULT_LOCK_TIMEOUT));
                let now = in_critical.fetch_add(1, Ordering::SeqCst);
                assert_eq!(now, 0, "two writers inside the critical section");
                in_critical.fetch_sub(1, Ordering::SeqCst);
                lock.release_exclusive();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(lock.readers(), 0);
    assert!(!lock.writer_held());
}

#[test]
fn test_readers_run_concurrently() {
    let lock = Arc::new(RegionLock::new());

    assert!(lock.acquire_shared(DEFAULT_LOCK_TIMEOUT));

    // A second reader must get in while the first one is still holding.
    let other = lock.clone();
    let handle = thread::spawn(move || {
        let ok = other.acquire_shared(Duration::from_millis(100));
        if ok {
            other.release_shared();
        }
        ok
    });

    assert!(handle.join().unwrap());
    lock.release_shared();
}
