// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

use std::{fs, io::Write};

use anyhow::Result;
use indexmap::indexmap;
use tempfile::TempDir;

use crate::{
    store::Store,
    tree::Resolved,
    wal::{self, Wal},
    ConfigError, Value,
};

fn leaf(value: impl Into<Value>) -> Option<Resolved> {
    Some(Resolved::Value(value.into()))
}

#[test]
fn in_memory_store_is_not_persistent() -> Result<()> {
    let mut store = Store::in_memory();
    assert!(!store.is_persistent());
    assert_eq!(store.resolve(r#"app.name="demo""#)?, None);
    assert_eq!(store.resolve("app.name")?, leaf("demo"));
    store.close()?;
    Ok(())
}

#[test]
fn resolve_surfaces_errors() {
    let mut store = Store::in_memory();
    assert!(matches!(
        store.resolve("missing").unwrap_err(),
        ConfigError::PathNotFound(_)
    ));
    assert!(matches!(
        store.resolve("a.b='x'").unwrap_err(),
        ConfigError::Parse { .. }
    ));
    store.resolve("a.b=1").unwrap();
    assert!(matches!(
        store.resolve("a.b.c=2").unwrap_err(),
        ConfigError::InvalidOverwrite { .. }
    ));
}

#[test]
fn safe_get_resolves_null_on_fresh_store() {
    let mut store = Store::in_memory();
    assert_eq!(store.resolve("anything!").unwrap(), leaf(Value::Null));
}

#[test]
fn list_survives_close_and_reopen() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = Store::open(dir.path())?;
    assert!(store.is_persistent());
    store.resolve("data=[1, 2, 3]")?;
    store.close()?;

    let mut store = Store::open(dir.path())?;
    assert_eq!(
        store.resolve("data")?,
        leaf(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
    store.close()?;
    Ok(())
}

#[test]
fn close_compacts_into_snapshot_and_empties_log() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = Store::open(dir.path())?;
    store.resolve(r#"a.b="x""#)?;
    store.close()?;

    assert!(dir.path().join("snapshot.cfgx").exists());
    assert!(!dir.path().join("snapshot.cfgx.tmp").exists());
    assert_eq!(fs::metadata(dir.path().join("wal.log"))?.len(), 0);
    Ok(())
}

#[test]
fn unclosed_store_recovers_from_log_alone() -> Result<()> {
    let dir = TempDir::new()?;

    {
        let mut store = Store::open(dir.path())?;
        store.resolve(r#"session.user="amira""#)?;
        store.resolve("session.count=2")?;
        store.resolve("session.count=3")?;
        // Dropped without close: no snapshot, the log holds everything.
    }
    assert!(!dir.path().join("snapshot.cfgx").exists());

    let mut store = Store::open(dir.path())?;
    assert_eq!(store.resolve("session.user")?, leaf("amira"));
    assert_eq!(store.resolve("session.count")?, leaf(Value::Int(3)));
    store.close()?;
    Ok(())
}

#[test]
fn recovery_layers_log_over_snapshot() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = Store::open(dir.path())?;
    store.resolve(r#"base="snapshotted""#)?;
    store.close()?;

    {
        let mut store = Store::open(dir.path())?;
        store.resolve(r#"extra="logged""#)?;
        store.resolve("base-")?;
        // Dropped without close.
    }

    let mut store = Store::open(dir.path())?;
    assert_eq!(store.resolve("extra")?, leaf("logged"));
    assert!(matches!(
        store.resolve("base").unwrap_err(),
        ConfigError::PathNotFound(_)
    ));
    store.close()?;
    Ok(())
}

#[test]
fn deletes_are_logged() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let mut store = Store::open(dir.path())?;
        store.resolve("a=1")?;
        store.resolve("b=2")?;
        store.resolve("a-")?;
    }
    let contents = wal::read(dir.path().join("wal.log"))?;
    let statements: Vec<&str> = contents
        .records
        .iter()
        .map(|r| r.statement.as_str())
        .collect();
    assert_eq!(statements, vec!["a=1", "b=2", "a-"]);

    let mut store = Store::open(dir.path())?;
    assert!(!store.tree().exists(&["a"]));
    assert_eq!(store.resolve("b")?, leaf(Value::Int(2)));
    Ok(())
}

#[test]
fn reads_are_not_logged() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = Store::open(dir.path())?;
    store.resolve("a=1")?;
    store.resolve("a")?;
    store.resolve("a!")?;
    store.resolve("missing!")?;
    drop(store);

    let contents = wal::read(dir.path().join("wal.log"))?;
    assert_eq!(contents.records.len(), 1);
    Ok(())
}

#[test]
fn failed_mutations_are_not_logged() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = Store::open(dir.path())?;
    store.resolve("a.b=1")?;
    store.resolve("a.b.c=2").unwrap_err();
    drop(store);

    let contents = wal::read(dir.path().join("wal.log"))?;
    assert_eq!(contents.records.len(), 1);
    Ok(())
}

#[test]
fn compact_resets_log_and_keeps_serving() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = Store::open(dir.path())?;
    store.resolve("a=1")?;
    store.compact()?;
    assert_eq!(fs::metadata(dir.path().join("wal.log"))?.len(), 0);

    store.resolve("b=2")?;
    assert_eq!(store.resolve("a")?, leaf(Value::Int(1)));
    assert_eq!(store.resolve("b")?, leaf(Value::Int(2)));
    drop(store);

    // Snapshot has `a`, the log has only `b`.
    let contents = wal::read(dir.path().join("wal.log"))?;
    assert_eq!(contents.records.len(), 1);
    let mut store = Store::open(dir.path())?;
    assert_eq!(store.resolve("a")?, leaf(Value::Int(1)));
    assert_eq!(store.resolve("b")?, leaf(Value::Int(2)));
    Ok(())
}

#[test]
fn garbage_log_tail_is_discarded_and_trimmed() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let mut store = Store::open(dir.path())?;
        store.resolve(r#"a.b="x""#)?;
    }
    let wal_path = dir.path().join("wal.log");
    let clean_len = fs::metadata(&wal_path)?.len();

    // Simulate a crash mid-append: a few stray bytes after the last
    // complete record.
    let mut file = fs::OpenOptions::new().append(true).open(&wal_path)?;
    file.write_all(&[0x00, 0x00, 0x00])?;
    drop(file);

    let mut store = Store::open(dir.path())?;
    assert_eq!(store.resolve("a.b")?, leaf("x"));
    drop(store);
    assert_eq!(fs::metadata(&wal_path)?.len(), clean_len);
    Ok(())
}

#[test]
fn corrupted_record_ends_replay() -> Result<()> {
    let dir = TempDir::new()?;
    let wal_path = dir.path().join("wal.log");
    {
        let mut wal = Wal::open(&wal_path)?;
        wal.append("a=1")?;
        wal.append("b=2")?;
        wal.append("c=3")?;
    }
    // Flip a payload byte in the middle record; its CRC no longer holds.
    let mut bytes = fs::read(&wal_path)?;
    let second_payload = 4 + 3 + 4 + 4;
    bytes[second_payload] ^= 0xff;
    fs::write(&wal_path, &bytes)?;

    let mut store = Store::open(dir.path())?;
    assert_eq!(store.resolve("a")?, leaf(Value::Int(1)));
    assert!(matches!(
        store.resolve("b").unwrap_err(),
        ConfigError::PathNotFound(_)
    ));
    assert!(matches!(
        store.resolve("c").unwrap_err(),
        ConfigError::PathNotFound(_)
    ));
    Ok(())
}

#[test]
fn inapplicable_record_ends_replay_and_trims() -> Result<()> {
    let dir = TempDir::new()?;
    let wal_path = dir.path().join("wal.log");
    let first_record_len;
    {
        let mut wal = Wal::open(&wal_path)?;
        wal.append("a.b=1")?;
        first_record_len = fs::metadata(&wal_path)?.len();
        // Descends into a leaf; fails on replay.
        wal.append("a.b.c=2")?;
        // Unreachable once replay stops.
        wal.append("d=3")?;
    }

    let mut store = Store::open(dir.path())?;
    assert_eq!(store.resolve("a.b")?, leaf(Value::Int(1)));
    assert!(matches!(
        store.resolve("d").unwrap_err(),
        ConfigError::PathNotFound(_)
    ));
    drop(store);
    assert_eq!(fs::metadata(&wal_path)?.len(), first_record_len);
    Ok(())
}

#[test]
fn open_rejects_corrupt_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("snapshot.cfgx"), b"not a snapshot")?;
    let err = Store::open(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFormat(_)));
    Ok(())
}

#[test]
fn open_creates_missing_directory() -> Result<()> {
    let dir = TempDir::new()?;
    let nested = dir.path().join("state").join("config");
    let mut store = Store::open(&nested)?;
    store.resolve("k=1")?;
    store.close()?;
    assert!(nested.join("snapshot.cfgx").exists());
    Ok(())
}

#[test]
fn projection_resolves_through_the_facade() -> Result<()> {
    let mut store = Store::in_memory();
    store.resolve(r#"svc.host="localhost""#)?;
    store.resolve("svc.port=8080")?;
    assert_eq!(
        store.resolve("svc")?,
        Some(Resolved::Map(indexmap! {
            "host".to_string() => Resolved::Value(Value::from("localhost")),
            "port".to_string() => Resolved::Value(Value::Int(8080)),
        }))
    );
    Ok(())
}

#[test]
fn wal_read_reports_clean_log() -> Result<()> {
    let dir = TempDir::new()?;
    let wal_path = dir.path().join("wal.log");
    {
        let mut wal = Wal::open(&wal_path)?;
        wal.append("x=1")?;
        wal.append(r#"y="üñíçødé""#)?;
        wal.sync()?;
    }
    let contents = wal::read(&wal_path)?;
    assert!(!contents.corrupt_tail);
    assert_eq!(contents.valid_len, fs::metadata(&wal_path)?.len());
    assert_eq!(contents.records[1].statement, r#"y="üñíçødé""#);
    Ok(())
}

#[test]
fn wal_read_of_missing_file_is_empty() -> Result<()> {
    let contents = wal::read("/definitely/not/here/wal.log")?;
    assert_eq!(contents, wal::WalContents::default());
    Ok(())
}
