#[cfg(test)]
mod tests {
    use crate::channel::{self, StoreMessage};
    use crate::membership::service;
    use crate::store::SharedStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn unique_store(tag: &str) -> String {
        format!("membership-{}-{}", tag, uuid::Uuid::new_v4())
    }

    fn settle() {
        std::thread::sleep(Duration::from_millis(200));
    }

    /// Open a store whose creation timestamp sits comfortably above the
    /// offsets subtracted in the donation-rule tests.
    fn open_warm(name: &str) -> Arc<SharedStore> {
        let _ = crate::store::now_ms();
        std::thread::sleep(Duration::from_millis(2));
        SharedStore::open(name)
    }

    // ============================================================
    // HANDSHAKE END TO END
    // ============================================================

    #[test]
    fn test_late_joiner_adopts_existing_state() {
        let name = unique_store("adopt");
        let older = SharedStore::open(&name);
        assert!(older.set("x", &json!({"n": 1})));

        let newer = SharedStore::open(&name);
        settle();

        assert_eq!(newer.get("x"), Some(json!({"n": 1})));

        // The newcomer descends from the donor now.
        assert_eq!(
            newer.init_timestamp.load(Ordering::Acquire),
            older.init_timestamp.load(Ordering::Acquire)
        );

        // And shares the donor's store-lock region identity.
        assert!(Arc::ptr_eq(
            &older.store_lock.read().clone(),
            &newer.store_lock.read().clone()
        ));

        older.close();
        newer.close();
    }

    #[test]
    fn test_late_joiner_adopts_ttl_entries() {
        let name = unique_store("ttl");
        let older = SharedStore::open(&name);
        assert!(older.set_with(
            "expiring",
            &json!("v"),
            crate::store::SetOptions {
                ttl: Some(60),
                ..Default::default()
            },
        ));

        let newer = SharedStore::open(&name);
        settle();

        assert!(newer.ttl.contains_key("expiring"));

        older.close();
        newer.close();
    }

    #[test]
    fn test_without_older_peers_local_state_stands() {
        let name = unique_store("alone");
        let store = SharedStore::open(&name);
        settle();

        assert!(store.list_keys(None).is_empty());
        assert_eq!(store.get("anything"), None);

        store.close();
    }

    // ============================================================
    // DONATION RULES (direct calls, no second handle)
    // ============================================================

    #[test]
    fn test_only_strictly_older_handles_donate() {
        let name = unique_store("donate");
        let store = open_warm(&name);
        let own = store.init_timestamp.load(Ordering::Acquire);

        // Listen on the bus as a raw peer to observe donations.
        let observer = channel::subscribe(&name);

        // A requester younger than us: we must donate.
        service::handle_initialize_request(&store, own + 10);
        match observer.rx.recv_timeout(Duration::from_millis(200)) {
            Ok(StoreMessage::InitializeResponse { timestamp, .. }) => {
                assert_eq!(timestamp, own);
            }
            other => panic!("expected a donation, got {:?}", other),
        }

        // A requester older than us (or ourselves): silence.
        service::handle_initialize_request(&store, own);
        service::handle_initialize_request(&store, own - 1);
        assert!(observer.rx.recv_timeout(Duration::from_millis(100)).is_err());

        channel::unsubscribe(&name, &observer.peer);
        store.close();
    }

    #[test]
    fn test_younger_donation_is_ignored() {
        let name = unique_store("ignore");
        let store = open_warm(&name);
        let own = store.init_timestamp.load(Ordering::Acquire);
        let before = store.store_lock.read().clone();

        service::handle_initialize_response(
            &store,
            own + 100,
            Arc::new(crate::lock::RegionLock::new()),
            Vec::new(),
        );

        assert_eq!(store.init_timestamp.load(Ordering::Acquire), own);
        assert!(Arc::ptr_eq(&before, &store.store_lock.read().clone()));

        store.close();
    }

    #[test]
    fn test_adoption_is_monotonic() {
        let name = unique_store("monotonic");
        let store = open_warm(&name);
        let own = store.init_timestamp.load(Ordering::Acquire);

        let first_lock = Arc::new(crate::lock::RegionLock::new());
        service::handle_initialize_response(&store, own - 10, first_lock.clone(), Vec::new());
        assert_eq!(store.init_timestamp.load(Ordering::Acquire), own - 10);

        // A donor younger than the one already adopted: no effect.
        service::handle_initialize_response(
            &store,
            own - 5,
            Arc::new(crate::lock::RegionLock::new()),
            Vec::new(),
        );
        assert_eq!(store.init_timestamp.load(Ordering::Acquire), own - 10);
        assert!(Arc::ptr_eq(&first_lock, &store.store_lock.read().clone()));

        // An even older donor still wins.
        let oldest_lock = Arc::new(crate::lock::RegionLock::new());
        service::handle_initialize_response(&store, own - 20, oldest_lock.clone(), Vec::new());
        assert_eq!(store.init_timestamp.load(Ordering::Acquire), own - 20);
        assert!(Arc::ptr_eq(&oldest_lock, &store.store_lock.read().clone()));

        store.close();
    }

    #[test]
    fn test_concurrent_newcomers_converge_on_oldest() {
        let name = unique_store("race");
        let oldest = SharedStore::open(&name);
        assert!(oldest.set("seed", &json!(1)));

        let middle = SharedStore::open(&name);
        settle();
        let newest = SharedStore::open(&name);
        settle();

        // Everyone descends from the oldest handle.
        let root = oldest.init_timestamp.load(Ordering::Acquire);
        assert_eq!(middle.init_timestamp.load(Ordering::Acquire), root);
        assert_eq!(newest.init_timestamp.load(Ordering::Acquire), root);

        let root_lock = oldest.store_lock.read().clone();
        assert!(Arc::ptr_eq(&root_lock, &middle.store_lock.read().clone()));
        assert!(Arc::ptr_eq(&root_lock, &newest.store_lock.read().clone()));

        assert_eq!(newest.get("seed"), Some(json!(1)));

        oldest.close();
        middle.close();
        newest.close();
    }
}
