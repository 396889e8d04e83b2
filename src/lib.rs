// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! An embeddable hierarchical configuration store.
//!
//! State is a tree: interior nodes group children into dotted-path
//! namespaces, leaves hold typed scalar or list values. Clients drive the
//! store with CFGQL, a point-addressed statement language:
//!
//! ```text
//! app.ui.theme="dark"      SET: create or overwrite a leaf
//! app.ui.theme             GET: read a leaf, or project a subtree
//! app.ui.theme!            safe GET: null instead of an error on a miss
//! app.ui.theme-            DELETE: remove a node and its subtree
//! ```
//!
//! # Quickstart
//!
//! ```no_run
//! use configx::Store;
//!
//! fn main() -> configx::Result<()> {
//!     let mut store = Store::open("/var/lib/myapp/config")?;
//!     store.resolve(r#"app.ui.theme="dark""#)?;
//!     let theme = store.resolve("app.ui.theme")?;
//!     store.close()
//! }
//! ```
//!
//! Persistent stores keep a binary snapshot of the whole tree plus a
//! CRC-framed write-ahead log of mutating statements; on open the
//! snapshot is loaded and the log replayed over it, so a crash between
//! snapshots loses nothing that was acknowledged. [`Store::in_memory`]
//! skips the disk entirely.
//!
//! The pieces compose in layers, each usable on its own:
//!
//! * [`tree::ConfigTree`] — the data model and its invariants,
//! * [`parser`] / [`interpreter`] — CFGQL front end and execution,
//! * [`snapshot`] — the binary full-tree codec,
//! * [`wal`] — the statement log,
//! * [`store::Store`] — the facade binding them together.
//!
//! A store instance is single-threaded and synchronous: every operation
//! completes or fails before returning, and a storage directory belongs
//! to at most one live store.

pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod value;
pub mod wal;

#[cfg(test)]
mod tests;

pub use error::{ConfigError, FormatError, Result};
pub use node::Node;
pub use parser::{parse, Statement};
pub use store::Store;
pub use tree::{ConfigTree, Resolved};
pub use value::{Value, ValueTag};
