use super::*;
use crate::lock::DEFAULT_LOCK_TIMEOUT;
use std::sync::Arc;

#[test]
fn test_meta_starts_empty() {
    let meta = MetaRegion::new();
    assert_eq!(meta.payload_len(), 0);
    assert_eq!(meta.lock().readers(), 0);
    assert!(!meta.lock().writer_held());
}

#[test]
fn test_payload_len_roundtrip() {
    let meta = MetaRegion::new();
    meta.set_payload_len(42);
    assert_eq!(meta.payload_len(), 42);
}

#[test]
fn test_data_write_read() {
    let meta = MetaRegion::new();
    let data = DataRegion::new(64);
    assert_eq!(data.byte_len(), 64);

    assert!(meta.lock().acquire_exclusive(DEFAULT_LOCK_TIMEOUT));
    unsafe { data.write(b"hello") };
    meta.set_payload_len(5);
    meta.lock().release_exclusive();

    assert!(meta.lock().acquire_shared(DEFAULT_LOCK_TIMEOUT));
    let out = unsafe { data.read(meta.payload_len()) };
    meta.lock().release_shared();

    assert_eq!(out, b"hello");
}

#[test]
fn test_binding_identity() {
    let a = Binding::new(Arc::new(MetaRegion::new()), Arc::new(DataRegion::new(16)));
    let b = a.clone();
    let c = Binding::new(Arc::new(MetaRegion::new()), Arc::new(DataRegion::new(16)));

    assert!(a.same_regions(&b));
    assert!(!a.same_regions(&c));
}

#[test]
fn test_regions_shared_across_threads() {
    let meta = Arc::new(MetaRegion::new());
    let data = Arc::new(DataRegion::new(32));

    let writer_meta = meta.clone();
    let writer_data = data.clone();
    let writer = std::thread::spawn(move || {
        assert!(writer_meta.lock().acquire_exclusive(DEFAULT_LOCK_TIMEOUT));
        unsafe { writer_data.write(b"shared") };
        writer_meta.set_payload_len(6);
        writer_meta.lock().release_exclusive();
    });
    writer.join().unwrap();

    assert!(meta.lock().acquire_shared(DEFAULT_LOCK_TIMEOUT));
    let out = unsafe { data.read(meta.payload_len()) };
    meta.lock().release_shared();
    assert_eq!(out, b"shared");
}
