use super::*;
use tempfile::tempdir;

fn store_with(dir: &Path, files: &[&str]) -> BackupStore {
    let store = BackupStore::new(dir.join("backup"));
    fs::create_dir_all(store.dir()).unwrap();
    for f in files {
        fs::write(store.path_of(f), f).unwrap();
    }
    store
}

#[test]
fn test_record_first_version() {
    let mut ledger = Ledger::new();
    let v = ledger.record(
        "UserTable",
        "App\\UserTable",
        "2026-01-01T000000UserTable.sql",
        "2026-01-01T00:00:00",
    );

    assert_eq!(v, 1);
    let entry = ledger.get("UserTable").unwrap();
    assert_eq!(entry.last_version, 0);
    assert_eq!(entry.latest_version, 1);
    assert_eq!(entry.namespace, "App\\UserTable");
    assert_eq!(entry.latest().unwrap().backup, "2026-01-01T000000UserTable.sql");
}

#[test]
fn test_record_is_monotonic() {
    let mut ledger = Ledger::new();
    for expected in 1..=4 {
        let v = ledger.record("a", "a", &format!("b{expected}"), "t");
        assert_eq!(v, expected);
    }
    let entry = ledger.get("a").unwrap();
    assert_eq!(entry.latest_version, 4);
    assert_eq!(entry.last_version, 3);
    assert_eq!(entry.metadata.len(), 4);
    assert_eq!(*entry.metadata.keys().next_back().unwrap(), entry.latest_version);
}

#[test]
fn test_serialized_shape() {
    let mut ledger = Ledger::new();
    ledger.record(
        "UserTable",
        "App\\Database\\Migrations\\UserTable",
        "2026-03-04T050607UserTable.sql",
        "2026-03-04T05:06:07",
    );

    let value: serde_json::Value = serde_json::from_str(&ledger.to_json().unwrap()).unwrap();
    let expected = serde_json::json!({
        "UserTable": {
            "namespace": "App\\Database\\Migrations\\UserTable",
            "lastVersion": 0,
            "latestVersion": 1,
            "metadata": {
                "1": {
                    "backup": "2026-03-04T050607UserTable.sql",
                    "timestamp": "2026-03-04T05:06:07",
                    "version": 1
                }
            }
        }
    });
    assert_eq!(value, expected);
    assert!(ledger.to_json().unwrap().contains("\n    \"UserTable\""));
}

#[test]
fn test_load_missing_empty_and_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("migrations.lock");

    assert!(Ledger::load(&path).unwrap().is_empty());

    fs::write(&path, "   \n").unwrap();
    assert!(Ledger::load(&path).unwrap().is_empty());

    fs::write(&path, "{ not json").unwrap();
    assert!(Ledger::load(&path).unwrap().is_empty());
}

#[test]
fn test_load_accepts_list_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("seeders.lock");
    fs::write(
        &path,
        r#"{"Users": {"namespace": "Users", "lastVersion": 0, "latestVersion": 2,
            "metadata": [{"backup": "a", "timestamp": "t", "version": 1},
                         {"backup": "b", "timestamp": "t", "version": 2}]}}"#,
    )
    .unwrap();

    let ledger = Ledger::load(&path).unwrap();
    let entry = ledger.get("Users").unwrap();
    assert_eq!(entry.version(2).unwrap().backup, "b");
    assert_eq!(entry.metadata.len(), 2);
}

#[test]
fn test_persist_round_trip_is_stable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("backup").join("migrations.lock");

    let mut ledger = Ledger::new();
    ledger.record("b", "ns\\b", "x1", "2026-01-01T00:00:00");
    ledger.record("a", "ns\\a", "x2", "2026-01-01T00:00:01");
    ledger.record("a", "ns\\a", "x3", "2026-01-01T00:00:02");
    ledger.persist(&path).unwrap();

    let first = fs::read_to_string(&path).unwrap();
    let loaded = Ledger::load(&path).unwrap();
    assert_eq!(loaded, ledger);

    loaded.persist(&path).unwrap();
    let second = fs::read_to_string(&path).unwrap();
    assert_eq!(first, second);

    // No temp files left behind
    let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_record_drop_promotes_next_version() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &["b1", "b2", "b3"]);
    let mut ledger = Ledger::new();
    ledger.record("a", "a", "b1", "t");
    ledger.record("a", "a", "b2", "t");
    ledger.record("a", "a", "b3", "t");

    assert_eq!(ledger.record_drop("a", &store), Some(3));

    let entry = ledger.get("a").unwrap();
    assert_eq!(entry.latest_version, 2);
    assert_eq!(entry.last_version, 1);
    assert!(entry.version(3).is_none());
    assert!(!store.exists("b3"));
    assert!(store.exists("b2"));
}

#[test]
fn test_record_drop_last_version_removes_entry() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &["b1"]);
    let mut ledger = Ledger::new();
    ledger.record("a", "a", "b1", "t");

    assert_eq!(ledger.record_drop("a", &store), Some(1));
    assert!(ledger.get("a").is_none());
    assert!(!store.exists("b1"));
    assert_eq!(ledger.record_drop("a", &store), None);
}

#[test]
fn test_rewrite_after_rollback() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &["b1", "b2", "b3"]);
    let mut ledger = Ledger::new();
    ledger.record("UserTable", "UserTable", "b1", "t1");
    ledger.record("UserTable", "UserTable", "b2", "t2");

    let v = ledger
        .rewrite("UserTable", 1, "UserTable", "b3", "t3", &store)
        .unwrap();

    assert_eq!(v, 3);
    let entry = ledger.get("UserTable").unwrap();
    assert_eq!(entry.last_version, 1);
    assert_eq!(entry.latest_version, 3);
    assert_eq!(entry.metadata.keys().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(entry.latest().unwrap().backup, "b3");
    assert!(!store.exists("b1"));
    assert!(!store.exists("b2"));
    assert!(store.exists("b3"));
}

#[test]
fn test_rewrite_keeps_older_history() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &["b1", "b2", "b3", "b4"]);
    let mut ledger = Ledger::new();
    ledger.record("a", "a", "b1", "t");
    ledger.record("a", "a", "b2", "t");
    ledger.record("a", "a", "b3", "t");

    ledger.rewrite("a", 2, "a", "b4", "t", &store).unwrap();

    let entry = ledger.get("a").unwrap();
    assert_eq!(entry.metadata.keys().copied().collect::<Vec<_>>(), vec![1, 4]);
    assert!(store.exists("b1"));
    assert!(ledger.missing_backups(&store).is_empty());
}

#[test]
fn test_rewrite_unknown_entry() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &[]);
    let mut ledger = Ledger::new();
    let err = ledger.rewrite("a", 1, "a", "b", "t", &store).unwrap_err();
    assert!(matches!(err, CoreError::NoLedgerEntry { .. }));
}

#[test]
fn test_clear_and_clear_all() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &["a1", "a2", "b1"]);
    let mut ledger = Ledger::new();
    ledger.record("a", "a", "a1", "t");
    ledger.record("a", "a", "a2", "t");
    ledger.record("b", "b", "b1", "t");

    assert!(ledger.clear("a", &store));
    assert!(!ledger.clear("a", &store));
    assert!(!store.exists("a1"));
    assert!(!store.exists("a2"));

    assert_eq!(ledger.clear_all(&store), 1);
    assert!(ledger.is_empty());
    assert!(!store.exists("b1"));
}

#[test]
fn test_missing_backups() {
    let dir = tempdir().unwrap();
    let store = store_with(dir.path(), &["present"]);
    let mut ledger = Ledger::new();
    ledger.record("a", "a", "present", "t");
    ledger.record("a", "a", "gone", "t");

    let missing = ledger.missing_backups(&store);
    assert_eq!(missing, vec![("a".to_string(), 2, "gone".to_string())]);
}
