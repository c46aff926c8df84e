//! Behavioural tests for HistoryStore against real storage backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use skycast_history::{HistoryStore, KeyValueStore, MemoryStore, SqliteStore, StorageError};
use skycast_weather::Coordinates;

fn memory_store(limit: usize) -> HistoryStore {
    HistoryStore::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        "weather_search_history",
        limit,
    )
}

/// Reads succeed, every write fails
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Write("quota exceeded".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Write("quota exceeded".into()))
    }
}

/// Every read fails
struct UnreadableStore;

impl KeyValueStore for UnreadableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Read("disk error".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Memory store whose writes can be made to fail between operations
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Write("disk full".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.remove(key)
    }
}

fn flaky_store() -> (HistoryStore, Arc<FlakyStore>, Arc<FlakyStore>) {
    let durable = Arc::new(FlakyStore::default());
    let session = Arc::new(FlakyStore::default());
    let store = HistoryStore::new(durable.clone(), session.clone(), "h", 10);
    (store, durable, session)
}

fn ids(store: &HistoryStore) -> Vec<String> {
    store.get_all().into_iter().map(|i| i.id).collect()
}

#[test]
fn test_add_trims_and_stamps_new_entry() {
    let store = memory_store(10);
    let before = chrono::Utc::now().timestamp_millis();

    let list = store
        .add("  Kyiv  ", Some("Ukraine"), Coordinates::new(50.45, 30.52), None)
        .unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].city, "Kyiv");
    assert_eq!(list[0].country.as_deref(), Some("Ukraine"));
    assert!(!list[0].id.is_empty());
    assert!(list[0].timestamp >= before);
}

#[test]
fn test_add_blank_city_is_noop() {
    let store = memory_store(10);
    store
        .add("Lima", Some("PE"), Coordinates::new(-12.05, -77.04), None)
        .unwrap();

    let list = store.add("   ", Some("PE"), Coordinates::new(1.0, 1.0), None).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].city, "Lima");
}

#[test]
fn test_add_same_location_replaces() {
    let store = memory_store(10);
    let coords = Coordinates::new(10.0, 20.0);
    store.add("OldCity", Some("OC"), coords, None).unwrap();

    let list = store
        .add("NewCity", Some("NC"), Coordinates::new(10.00009, 20.00009), None)
        .unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].city, "NewCity");
}

#[test]
fn test_limit_keeps_most_recent() {
    let store = memory_store(2);
    store.add("City1", Some("C1"), Coordinates::new(1.0, 1.0), None).unwrap();
    store.add("City2", Some("C2"), Coordinates::new(2.0, 2.0), None).unwrap();
    let list = store.add("City3", Some("C3"), Coordinates::new(3.0, 3.0), None).unwrap();

    let cities: Vec<_> = list.iter().map(|i| i.city.as_str()).collect();
    assert_eq!(cities, ["City3", "City2"]);
}

#[test]
fn test_limit_one_keeps_latest_only() {
    let store = memory_store(1);
    store.add("A", Some("X"), Coordinates::new(1.0, 1.0), None).unwrap();
    let list = store.add("B", Some("X"), Coordinates::new(2.0, 2.0), None).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].city, "B");
}

#[test]
fn test_remove_then_undo_restores_entry() {
    let store = memory_store(10);
    let added = store
        .add("Berlin", Some("Germany"), Coordinates::new(52.52, 13.4), Some("Berlin"))
        .unwrap();
    let original = added[0].clone();

    let after_remove = store.remove(&original.id).unwrap();
    assert!(after_remove.is_empty());
    assert!(store.can_undo());

    let restored = store.undo_remove().unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0], original);
    assert!(!store.can_undo());
}

#[test]
fn test_undo_pops_one_entry_at_a_time() {
    let store = memory_store(10);
    store.add("A", None, Coordinates::new(1.0, 1.0), None).unwrap();
    let list = store.add("B", None, Coordinates::new(2.0, 2.0), None).unwrap();

    store.remove(&list[0].id).unwrap();
    store.remove(&list[1].id).unwrap();

    let restored = store.undo_remove().unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].city, "A");
    assert!(store.can_undo());

    let restored = store.undo_remove().unwrap();
    assert_eq!(restored.len(), 2);
    assert!(!store.can_undo());
}

#[test]
fn test_remove_unknown_id_is_noop() {
    let store = memory_store(10);
    let list = store.add("Madrid", Some("Spain"), Coordinates::new(40.4, -3.7), None).unwrap();

    let after = store.remove("non-existent").unwrap();

    assert_eq!(after, list);
    assert!(!store.can_undo());
}

#[test]
fn test_undo_with_empty_stack_is_noop() {
    let store = memory_store(10);
    let list = store.add("Paris", Some("France"), Coordinates::new(48.85, 2.35), None).unwrap();

    assert_eq!(store.undo_remove().unwrap(), list);
}

#[test]
fn test_clear_empties_both_collections() {
    let store = memory_store(10);
    let list = store.add("Madrid", Some("Spain"), Coordinates::new(40.4, -3.7), None).unwrap();
    store.add("Seville", Some("Spain"), Coordinates::new(37.4, -6.0), None).unwrap();
    store.remove(&list[0].id).unwrap();

    store.clear().unwrap();

    assert!(store.get_all().is_empty());
    assert!(!store.can_undo());
}

#[test]
fn test_active_history_survives_reopen_but_undo_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    {
        let store = HistoryStore::new(
            Arc::new(SqliteStore::open(&path).unwrap()),
            Arc::new(MemoryStore::new()),
            "weather_search_history",
            10,
        );
        let list = store.add("Tokyo", Some("JP"), Coordinates::new(35.68, 139.69), None).unwrap();
        store.add("Osaka", Some("JP"), Coordinates::new(34.69, 135.5), None).unwrap();
        store.remove(&list[0].id).unwrap();
        assert!(store.can_undo());
    }

    let reopened = HistoryStore::new(
        Arc::new(SqliteStore::open(&path).unwrap()),
        Arc::new(MemoryStore::new()),
        "weather_search_history",
        10,
    );
    let list = reopened.get_all();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].city, "Osaka");
    assert!(!reopened.can_undo());
}

#[test]
fn test_write_failure_surfaces_from_mutations() {
    let store = HistoryStore::new(
        Arc::new(ReadOnlyStore),
        Arc::new(MemoryStore::new()),
        "h",
        10,
    );

    let result = store.add("Quito", Some("EC"), Coordinates::new(-0.18, -78.47), None);
    assert!(matches!(result, Err(StorageError::Write(_))));
    assert!(store.clear().is_err());
}

#[test]
fn test_read_failure_degrades_to_empty() {
    let store = HistoryStore::new(Arc::new(UnreadableStore), Arc::new(UnreadableStore), "h", 10);

    assert!(store.get_all().is_empty());
    assert!(!store.can_undo());
    assert!(store.undo_remove().unwrap().is_empty());
}

#[test]
fn test_failed_durable_write_on_undo_keeps_entry_restorable() {
    let (store, durable, _) = flaky_store();
    let list = store.add("Lima", Some("PE"), Coordinates::new(-12.05, -77.04), None).unwrap();
    store.add("Cusco", Some("PE"), Coordinates::new(-13.53, -71.97), None).unwrap();
    store.remove(&list[0].id).unwrap();

    durable.fail_writes(true);
    assert!(store.undo_remove().is_err());
    assert_eq!(store.get_all().len(), 1);
    assert!(store.can_undo());

    durable.fail_writes(false);
    let restored = store.undo_remove().unwrap();
    assert_eq!(restored.len(), 2);
    assert!(!store.can_undo());
}

#[test]
fn test_failed_session_write_on_undo_rolls_back_active_list() {
    let (store, _, session) = flaky_store();
    let list = store.add("Lima", Some("PE"), Coordinates::new(-12.05, -77.04), None).unwrap();
    store.add("Cusco", Some("PE"), Coordinates::new(-13.53, -71.97), None).unwrap();
    store.remove(&list[0].id).unwrap();

    session.fail_writes(true);
    assert!(store.undo_remove().is_err());
    assert_eq!(store.get_all().len(), 1);
    assert!(store.can_undo());

    session.fail_writes(false);
    store.undo_remove().unwrap();
    let mut restored = ids(&store);
    assert_eq!(restored.len(), 2);
    restored.dedup();
    assert_eq!(restored.len(), 2);
}

#[test]
fn test_failed_session_write_on_remove_leaves_entry_active() {
    let (store, _, session) = flaky_store();
    let list = store.add("Lima", Some("PE"), Coordinates::new(-12.05, -77.04), None).unwrap();

    session.fail_writes(true);
    assert!(store.remove(&list[0].id).is_err());
    assert_eq!(ids(&store), vec![list[0].id.clone()]);
    assert!(!store.can_undo());

    session.fail_writes(false);
    store.undo_remove().unwrap();
    assert_eq!(ids(&store), vec![list[0].id.clone()]);
}

#[test]
fn test_failed_durable_write_on_remove_changes_nothing() {
    let (store, durable, _) = flaky_store();
    let list = store.add("Lima", Some("PE"), Coordinates::new(-12.05, -77.04), None).unwrap();

    durable.fail_writes(true);
    assert!(store.remove(&list[0].id).is_err());
    assert_eq!(ids(&store), vec![list[0].id.clone()]);
    assert!(!store.can_undo());
}
