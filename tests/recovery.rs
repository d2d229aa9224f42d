//! Durability: commits survive reopen, extensions repopulate from recovered data

use std::sync::Arc;
use tesseradb::{
    Database, DatabaseConfig, Grouping, IndexQuery, IndexRow, IndexSetup, IndexValue, IndexedType,
    Indexer, ItemKey, SecondaryIndex, Sorting, SyncMode, Value, View, ViewHandle,
};

fn put_score(db: &Database, key: &str, score: i64) {
    db.write(|txn| txn.put_value(ItemKey::new("scores", key), Value::Int(score)))
        .unwrap();
}

#[test]
fn reopened_database_serves_committed_data() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::at(dir.path());

    {
        let db = Database::open(config.clone()).unwrap();
        put_score(&db, "a", 10);
        put_score(&db, "b", 20);
        db.write(|txn| txn.remove(ItemKey::new("scores", "a"))).unwrap();
    }

    let db = Database::open(config).unwrap();
    assert_eq!(db.len(), 1);
    assert_eq!(db.version(), 3);
    assert_eq!(
        db.read(|txn| txn.get_value(&ItemKey::new("scores", "b"))),
        Some(Value::Int(20))
    );
}

#[test]
fn extensions_repopulate_after_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::at(dir.path());

    {
        let db = Database::open(config.clone()).unwrap();
        put_score(&db, "a", 10);
        put_score(&db, "b", 30);
    }

    let db = Database::open(config).unwrap();

    let view = Arc::new(View::new(
        "by_score",
        Grouping::single_group("all"),
        Sorting::by_value(|a, b| {
            a.as_int().unwrap_or(0).cmp(&b.as_int().unwrap_or(0))
        }),
    ));
    db.register(view.clone()).unwrap();
    let keys: Vec<_> = view.keys_in_group("all").into_iter().map(|k| k.key).collect();
    assert_eq!(keys, vec!["a", "b"]);

    let setup = IndexSetup::new().column("score", IndexedType::Integer).unwrap();
    let index = Arc::new(SecondaryIndex::new(
        "score_idx",
        setup,
        Indexer::by_value(|_, v| {
            let mut row = IndexRow::new();
            row.insert("score".into(), IndexValue::Integer(v.as_int()?));
            Some(row)
        }),
    ));
    db.register(index.clone()).unwrap();
    assert_eq!(index.count(&IndexQuery::new().at_least("score", 20i64)).unwrap(), 1);
}

#[test]
fn recovery_with_sync_never_still_replays_flushed_commits() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::at(dir.path()).sync_mode(SyncMode::Never);

    {
        let db = Database::open(config.clone()).unwrap();
        put_score(&db, "a", 1);
    }

    // The WalWriter flushed on drop/commit path; the record must be replayable
    let db = Database::open(config).unwrap();
    assert_eq!(
        db.read(|txn| txn.get_value(&ItemKey::new("scores", "a"))),
        Some(Value::Int(1))
    );
}

#[test]
fn writes_after_reopen_continue_the_version_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::at(dir.path());

    {
        let db = Database::open(config.clone()).unwrap();
        put_score(&db, "a", 1);
    }
    {
        let db = Database::open(config.clone()).unwrap();
        put_score(&db, "b", 2);
        assert_eq!(db.version(), 2);
    }

    let db = Database::open(config).unwrap();
    assert_eq!(db.version(), 2);
    assert_eq!(db.len(), 2);
}
