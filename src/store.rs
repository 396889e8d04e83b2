// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! The store facade.
//!
//! [`Store`] binds the parser, interpreter, tree, and persistence layers
//! into the single object embedders interact with. Two modes:
//!
//! * [`Store::in_memory`] — a pure in-memory tree, no files touched.
//! * [`Store::open`] — durable: state lives in a storage directory as a
//!   binary snapshot plus a write-ahead log of mutating statements.
//!
//! On open, the snapshot (if any) is loaded and the log is replayed over
//! it. Every successful mutation is appended to the log. On
//! [`compact`](Store::compact) or [`close`](Store::close) a fresh
//! snapshot is written atomically and the log is reset.
//!
//! A store owns its storage directory exclusively for its lifetime;
//! running two stores over the same directory is not supported.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::Result,
    interpreter, parser,
    snapshot,
    tree::{ConfigTree, Resolved},
    wal::{self, Wal},
};

/// Snapshot file name inside the storage directory.
const SNAPSHOT_FILE: &str = "snapshot.cfgx";
/// Transient snapshot written before the atomic rename.
const SNAPSHOT_TMP_FILE: &str = "snapshot.cfgx.tmp";
/// Write-ahead log file name inside the storage directory.
const WAL_FILE: &str = "wal.log";

/// A hierarchical configuration store, optionally durable.
#[derive(Debug)]
pub struct Store {
    tree: ConfigTree,
    persistence: Option<Persistence>,
}

#[derive(Debug)]
struct Persistence {
    dir: PathBuf,
    wal: Wal,
}

impl Store {
    /// Creates a non-persistent store. No disk operations are ever
    /// performed; dropping it discards all state.
    pub fn in_memory() -> Store {
        Store {
            tree: ConfigTree::new(),
            persistence: None,
        }
    }

    /// Opens a persistent store backed by `storage_dir`, creating the
    /// directory if needed.
    ///
    /// Recovery order: load `snapshot.cfgx` if present (a missing
    /// snapshot just means an empty base tree), then replay `wal.log`
    /// over it. A log record that fails its checksum, fails to parse, or
    /// fails to execute ends replay at that point — the expected shape of
    /// a crash-cut tail — and the log is trimmed back to the last record
    /// that applied, so later appends never land behind garbage.
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Store> {
        let dir = storage_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let mut tree = if snapshot_path.exists() {
            snapshot::load(&snapshot_path)?
        } else {
            ConfigTree::new()
        };

        let (mut wal, contents) = wal::open_and_read(dir.join(WAL_FILE))?;
        let mut applied_len = 0u64;
        let mut failed = contents.corrupt_tail;
        for record in &contents.records {
            match interpreter::run(&mut tree, &record.statement) {
                Ok(_) => applied_len = record.end_offset,
                Err(err) => {
                    warn!(
                        statement = %record.statement,
                        error = %err,
                        "log replay stopped at inapplicable record; discarding the rest"
                    );
                    failed = true;
                    break;
                }
            }
        }
        if contents.corrupt_tail {
            warn!(
                valid_len = contents.valid_len,
                "log ends in a corrupt or truncated record; discarding tail"
            );
        }
        if failed {
            wal.truncate_to(applied_len)?;
        }

        debug!(dir = %dir.display(), replayed = contents.records.len(), "store opened");
        Ok(Store {
            tree,
            persistence: Some(Persistence { dir, wal }),
        })
    }

    /// Whether this store writes through to disk.
    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    /// Parses and executes one CFGQL statement.
    ///
    /// Returns `None` for mutating statements (SET, DELETE) and
    /// `Some` with the value or projection for GET and safe GET. When the
    /// store is persistent, a mutation that succeeded is appended to the
    /// write-ahead log before this returns.
    pub fn resolve(&mut self, query: &str) -> Result<Option<Resolved>> {
        let statement = parser::parse(query)?;
        let output = interpreter::execute(&mut self.tree, &statement)?;
        if statement.is_mutation() {
            if let Some(persistence) = &mut self.persistence {
                persistence.wal.append(query)?;
            }
        }
        Ok(output)
    }

    /// Direct read-only access to the underlying tree, for embedders that
    /// want to inspect state without going through query text.
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Writes a fresh snapshot and resets the log.
    ///
    /// The snapshot lands atomically: it is written and synced to
    /// `snapshot.cfgx.tmp` first, then renamed over `snapshot.cfgx`, so an
    /// interrupted compaction leaves the previous snapshot intact. The log
    /// is truncated only after the rename. No-op for in-memory stores.
    pub fn compact(&mut self) -> Result<()> {
        let Some(persistence) = &mut self.persistence else {
            return Ok(());
        };
        let tmp_path = persistence.dir.join(SNAPSHOT_TMP_FILE);
        snapshot::save(&self.tree, &tmp_path)?;
        fs::rename(&tmp_path, persistence.dir.join(SNAPSHOT_FILE))?;
        persistence.wal.truncate()?;
        debug!(dir = %persistence.dir.display(), "snapshot compacted");
        Ok(())
    }

    /// Compacts and releases file handles. For a persistent store this is
    /// the clean shutdown path; skipping it is still safe because the log
    /// already holds every mutation since the last snapshot.
    pub fn close(mut self) -> Result<()> {
        self.compact()?;
        if let Some(persistence) = self.persistence.take() {
            drop(persistence);
        }
        Ok(())
    }
}
