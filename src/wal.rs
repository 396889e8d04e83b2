// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Write-ahead log.
//!
//! Every successful mutating statement is appended to the log as raw
//! statement text so a crash between snapshots loses nothing. The record
//! framing, big-endian:
//!
//! ```text
//! u32 len | len bytes statement UTF-8 | u32 CRC32(statement bytes)
//! ```
//!
//! Reading is deliberately forgiving at the tail: a crash can cut a
//! record short, so the reader returns every record up to the first frame
//! that is truncated, fails its checksum, or is not UTF-8, and reports
//! where the valid prefix ends. It never errors on corruption — deciding
//! what to do about it is the store's call.

use std::{
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::Result;

/// An append handle to a write-ahead log file.
#[derive(Debug)]
pub struct Wal {
    file: File,
    path: PathBuf,
}

/// One successfully read record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalRecord {
    /// The statement text exactly as it was appended.
    pub statement: String,
    /// Byte offset one past this record's frame, i.e. the log length that
    /// keeps this record and drops everything after it.
    pub end_offset: u64,
}

/// The outcome of scanning a log file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WalContents {
    pub records: Vec<WalRecord>,
    /// Length of the valid prefix. Equal to the file length when the log
    /// is clean; shorter when a corrupt or cut-off tail was skipped.
    pub valid_len: u64,
    /// Whether bytes past `valid_len` were present and discarded.
    pub corrupt_tail: bool,
}

impl Wal {
    /// Opens the log at `path` for appending, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Wal> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Wal { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one statement record and flushes it to the OS.
    pub fn append(&mut self, statement: &str) -> Result<()> {
        let bytes = statement.as_bytes();
        let mut frame = Vec::with_capacity(bytes.len() + 8);
        frame.write_u32::<BigEndian>(bytes.len() as u32)?;
        frame.extend_from_slice(bytes);
        frame.write_u32::<BigEndian>(crc32fast::hash(bytes))?;
        self.file.write_all(&frame)?;
        self.file.flush()?;
        Ok(())
    }

    /// Empties the log. Called after a snapshot has made its contents
    /// redundant.
    pub fn truncate(&mut self) -> Result<()> {
        self.truncate_to(0)
    }

    /// Cuts the log back to `len` bytes, dropping records past the point
    /// replay stopped at.
    pub fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::End(0))?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Syncs outstanding appends to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Scans the log at `path` into records. A missing file reads as an empty
/// log. Corruption never errors; it ends the scan (see module docs).
pub fn read(path: impl AsRef<Path>) -> Result<WalContents> {
    let bytes = match std::fs::read(path.as_ref()) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(WalContents::default())
        }
        Err(err) => return Err(err.into()),
    };

    let mut contents = WalContents::default();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let Some(record) = read_record(&bytes, pos) else {
            contents.corrupt_tail = true;
            break;
        };
        pos = record.end_offset as usize;
        contents.records.push(record);
    }
    contents.valid_len = pos as u64;
    Ok(contents)
}

/// Decodes the record framed at `pos`, or `None` if the frame is cut
/// short, fails its CRC, or holds non-UTF-8 bytes.
fn read_record(bytes: &[u8], pos: usize) -> Option<WalRecord> {
    let remaining = &bytes[pos..];
    if remaining.len() < 4 {
        return None;
    }
    let len = BigEndian::read_u32(&remaining[..4]) as usize;
    let frame_len = 4 + len + 4;
    if remaining.len() < frame_len {
        return None;
    }
    let payload = &remaining[4..4 + len];
    let stored_crc = BigEndian::read_u32(&remaining[4 + len..frame_len]);
    if crc32fast::hash(payload) != stored_crc {
        return None;
    }
    let statement = std::str::from_utf8(payload).ok()?.to_string();
    Some(WalRecord {
        statement,
        end_offset: (pos + frame_len) as u64,
    })
}

/// Opens the log and reads its contents in one go, handing back both the
/// append handle and whatever was already recorded.
pub fn open_and_read(path: impl AsRef<Path>) -> Result<(Wal, WalContents)> {
    let contents = read(path.as_ref())?;
    let wal = Wal::open(path)?;
    Ok((wal, contents))
}
