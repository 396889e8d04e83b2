// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types surfaced by the store.
//!
//! Every fallible operation in this crate returns [`ConfigError`]. The
//! variants map one-to-one onto the failure classes callers need to tell
//! apart: query text that does not parse, paths that do not resolve,
//! writes that would collapse an interior node into a leaf, snapshots that
//! fail structural validation, and plain I/O failures.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Lexical or grammatical failure in CFGQL source.
    #[error("parse error at byte {offset}: {message}")]
    Parse {
        /// Byte offset of the offending token in the statement source.
        offset: usize,
        message: String,
    },

    /// A GET or DELETE addressed a path with no node, or a snapshot load
    /// addressed a file that does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// A SET would have violated leaf/interior exclusivity.
    #[error("invalid overwrite at '{path}': {message}")]
    InvalidOverwrite { path: String, message: String },

    /// A snapshot failed structural validation while being read.
    #[error("invalid snapshot format: {0}")]
    InvalidFormat(#[from] FormatError),

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Builds a [`ConfigError::PathNotFound`] from already-split segments.
    pub(crate) fn path_not_found(segments: &[impl AsRef<str>]) -> Self {
        ConfigError::PathNotFound(join_path(segments))
    }

    /// Builds a [`ConfigError::InvalidOverwrite`] from already-split segments.
    pub(crate) fn invalid_overwrite(segments: &[impl AsRef<str>], message: impl Into<String>) -> Self {
        ConfigError::InvalidOverwrite {
            path: join_path(segments),
            message: message.into(),
        }
    }
}

fn join_path(segments: &[impl AsRef<str>]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

/// Error thrown when a snapshot byte stream fails validation, via
/// [`snapshot::decode`](crate::snapshot::decode).
#[derive(Debug, Error, Eq, PartialEq)]
pub enum FormatError {
    /// The stream does not start with the `CFGX` magic.
    #[error("bad magic header: {found:?}")]
    BadMagic { found: [u8; 4] },

    /// The header version byte is not one this reader understands.
    #[error("unsupported snapshot version: {version}")]
    UnsupportedVersion { version: u8 },

    /// A value carried a tag outside the recognized set.
    #[error("unknown value tag: {tag:#04x}")]
    UnknownTag { tag: u8 },

    /// A declared length runs past the end of the stream or the enclosing
    /// list payload.
    #[error("truncated snapshot: {context}")]
    Truncated { context: &'static str },

    /// A fixed-width payload declared the wrong length for its tag.
    #[error("bad payload length {len} for tag '{tag}'")]
    BadPayloadLength { tag: char, len: u32 },

    /// A node name or string value is not valid UTF-8.
    #[error("invalid utf-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    /// A node record declared a non-null value together with children,
    /// which would violate leaf/interior exclusivity.
    #[error("node '{name}' carries both a value and {children} children")]
    LeafWithChildren { name: String, children: u32 },

    /// Bytes remain after the root node record.
    #[error("{0} trailing bytes after root node")]
    TrailingData(usize),

    /// The tree or a list nesting exceeds the bounded recursion depth.
    #[error("nesting deeper than {limit} levels")]
    TooDeep { limit: usize },
}
