/*!
End-to-end tests for the snapshot store: dump, lookup, listing, pruning,
and custom type bindings, all against a real directory.
*/

use chrono::{Duration, TimeZone, Utc};
use snapwire_core::snapshot::{format_timestamp, parse_file_name};
use snapwire_core::value::mapping_from_json;
use snapwire_core::{
    CompressionSetting, Mapping, SnapshotStore, SnapwireError, StoreConfig, TypeBinding, Value,
    ValueKind,
};
use std::fs;
use std::thread::sleep;
use tempfile::TempDir;

fn open_store() -> (TempDir, SnapshotStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::open(StoreConfig::with_dir(temp_dir.path())).unwrap();
    (temp_dir, store)
}

fn json_doc(json: serde_json::Value) -> Mapping {
    match json {
        serde_json::Value::Object(map) => mapping_from_json(map).unwrap(),
        other => panic!("expected an object, got {other}"),
    }
}

fn pause() {
    // Keep modification times strictly ordered.
    sleep(std::time::Duration::from_millis(20));
}

#[test]
fn test_complex_document_survives_dump_and_load() {
    let (_tmp, store) = open_store();
    let doc = json_doc(serde_json::json!({
        "users": [
            {"name": "Alice", "age": 30, "tags": ["admin", "ops"]},
            {"name": "Bob", "age": 25, "tags": []}
        ],
        "settings": {
            "theme": "dark",
            "ratio": 0.75,
            "notes": "lorem ipsum ".repeat(50)
        },
        "counter": 12345678901234567890u64
    }));

    store.dump(&doc).unwrap();
    let loaded = store.load(None).unwrap();
    assert_eq!(loaded, doc);
    assert_eq!(
        loaded["counter"],
        Value::Integer("12345678901234567890".parse().unwrap())
    );
}

#[test]
fn test_dump_file_name_matches_pattern() {
    let (_tmp, store) = open_store();
    let before = Utc::now();
    let snapshot = store.dump(&json_doc(serde_json::json!({"k": 1}))).unwrap();
    let after = Utc::now();

    let (ts, seq) = parse_file_name(&snapshot.id()).unwrap();
    assert_eq!(seq, 0);
    assert_eq!(ts, snapshot.timestamp());
    assert!(ts >= before - Duration::milliseconds(1) && ts <= after);
    assert_eq!(format_timestamp(ts), snapshot.id());
}

#[test]
fn test_multiple_dumps_and_loads() {
    let (_tmp, store) = open_store();
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(store.dump(&json_doc(serde_json::json!({"iteration": i}))).unwrap());
        pause();
    }

    assert_eq!(store.load(None).unwrap()["iteration"], Value::from(2));
    for (i, snapshot) in ids.iter().enumerate() {
        let doc = store.load_snapshot(&snapshot.id()).unwrap();
        assert_eq!(doc["iteration"], Value::from(i));
    }
}

#[test]
fn test_load_nearest_to_target() {
    let (_tmp, store) = open_store();
    let codec = store.codec();
    let t1 = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2023, 6, 2, 12, 0, 0).unwrap();
    for (ts, label) in [(t1, "first"), (t2, "second")] {
        let doc = json_doc(serde_json::json!({ "label": label }));
        fs::write(
            store.dir().join(format_timestamp(ts)),
            codec.encode(&doc).unwrap(),
        )
        .unwrap();
    }

    let near_first = store.load(Some(t1 + Duration::hours(1))).unwrap();
    assert_eq!(near_first["label"], Value::from("first"));
    let near_second = store.load(Some(t2 - Duration::hours(1))).unwrap();
    assert_eq!(near_second["label"], Value::from("second"));

    let listed: Vec<_> = store
        .list(Some(t2 + Duration::days(1)))
        .unwrap()
        .iter()
        .map(|s| s.timestamp())
        .collect();
    assert_eq!(listed, vec![t2, t1]);
}

#[test]
fn test_foreign_files_are_ignored() {
    let (_tmp, store) = open_store();
    fs::write(store.dir().join("notes.txt"), b"not a snapshot").unwrap();
    fs::create_dir(store.dir().join("2023-06-01T12-00-00.000000")).unwrap();

    assert!(store.list(None).unwrap().is_empty());
    assert!(store.load(None).unwrap().is_empty());

    store.dump(&json_doc(serde_json::json!({"ok": "yes"}))).unwrap();
    assert_eq!(store.list(None).unwrap().len(), 1);
}

#[test]
fn test_prune_then_load_falls_back() {
    let (_tmp, store) = open_store();
    for i in 0..4 {
        store.dump(&json_doc(serde_json::json!({"n": i}))).unwrap();
        pause();
    }

    assert_eq!(store.prune(2).unwrap(), 2);
    assert_eq!(store.list(None).unwrap().len(), 2);
    // The two newest are gone; the newest survivor is n = 1.
    assert_eq!(store.load(None).unwrap()["n"], Value::from(1));

    assert_eq!(store.prune(5).unwrap(), 0);
    assert_eq!(store.prune(0).unwrap(), 0);
    assert_eq!(store.list(None).unwrap().len(), 2);
}

#[test]
fn test_prune_snapshot_missing_reports_not_found() {
    let (_tmp, store) = open_store();
    let err = store.prune_snapshot("2020-01-01T00-00-00.000000").unwrap_err();
    assert!(matches!(err, SnapwireError::SnapshotNotFound(_)));
    assert_eq!(
        err.to_string(),
        "Snapshot 2020-01-01T00-00-00.000000 doesn't exist"
    );
}

#[test]
fn test_prune_snapshot_refuses_foreign_files() {
    let (_tmp, store) = open_store();
    let readme = store.dir().join("README");
    fs::write(&readme, b"snapshot directory").unwrap();
    store.dump(&json_doc(serde_json::json!({"kept": 1}))).unwrap();

    let err = store.prune_snapshot("README").unwrap_err();
    assert!(matches!(err, SnapwireError::SnapshotNotFound(_)));
    assert_eq!(err.to_string(), "Snapshot README doesn't exist");
    assert!(readme.is_file());
    assert_eq!(store.list(None).unwrap().len(), 1);
}

#[test]
fn test_truncated_snapshot_loads_readable_entries() {
    let (_tmp, store) = open_store();
    let mut doc = Mapping::new();
    doc.insert("name".to_string(), Value::from("partial"));
    doc.insert(
        "items".to_string(),
        Value::from(vec![Value::from(1), Value::from(2), Value::from(3)]),
    );
    let snapshot = store.dump(&doc).unwrap();

    // Drop the terminator and the last byte of the final INT8 element.
    let bytes = fs::read(snapshot.path()).unwrap();
    fs::write(snapshot.path(), &bytes[..bytes.len() - 2]).unwrap();

    let loaded = store.load(None).unwrap();
    assert_eq!(loaded["name"], Value::from("partial"));
    assert_eq!(
        loaded["items"],
        Value::from(vec![Value::from(1), Value::from(2)])
    );
    assert_eq!(store.load_snapshot(&snapshot.id()).unwrap(), loaded);
}

#[test]
fn test_compression_setting_controls_file_size() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig {
        dir: temp_dir.path().to_path_buf(),
        compression: CompressionSetting::None,
    };
    let store = SnapshotStore::open(config).unwrap();
    let doc = json_doc(serde_json::json!({"blob": "z".repeat(1000)}));

    let snapshot = store.dump(&doc).unwrap();
    assert!(snapshot.size() > 1000);
    assert_eq!(store.load(None).unwrap(), doc);

    // A zlib store writes the same document much smaller.
    let zlib_dir = TempDir::new().unwrap();
    let zlib_store = SnapshotStore::open(StoreConfig::with_dir(zlib_dir.path())).unwrap();
    assert!(zlib_store.dump(&doc).unwrap().size() < 100);
}

#[test]
fn test_custom_binding_round_trip() {
    let (_tmp, mut store) = open_store();
    store
        .register(TypeBinding::new(ValueKind::Float, 42).overriding())
        .unwrap();
    assert!(store.codec().registry().lookup_by_id(4).is_none());

    let doc = json_doc(serde_json::json!({"pi": 3.5}));
    let snapshot = store.dump(&doc).unwrap();
    assert_eq!(fs::read(snapshot.path()).unwrap()[1], 42);
    assert_eq!(store.load(None).unwrap(), doc);

    // A store with default bindings cannot read it.
    let other = SnapshotStore::open(StoreConfig::with_dir(store.dir())).unwrap();
    assert!(matches!(
        other.load(None),
        Err(SnapwireError::UnknownType(_))
    ));
}

#[test]
fn test_rejected_binding_leaves_store_usable() {
    let (_tmp, mut store) = open_store();
    let err = store
        .register(TypeBinding::new(ValueKind::Text, 1))
        .unwrap_err();
    assert!(matches!(err, SnapwireError::DuplicateBinding(_)));
    assert!(matches!(
        store.register(TypeBinding::new(ValueKind::Text, 200)),
        Err(SnapwireError::ReservedWireId(200))
    ));

    let doc = json_doc(serde_json::json!({"still": "works"}));
    store.dump(&doc).unwrap();
    assert_eq!(store.load(None).unwrap(), doc);
}
