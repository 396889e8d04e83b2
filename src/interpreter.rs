// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Statement execution.
//!
//! Maps a parsed [`Statement`] onto the corresponding [`ConfigTree`]
//! operation and shapes the result for the caller:
//!
//! | statement | tree op  | missing path        | interior node         |
//! |-----------|----------|---------------------|-----------------------|
//! | GET       | `get`    | `PathNotFound`      | projection map        |
//! | SAFE GET  | `get`    | resolves to `null`  | projection map        |
//! | SET       | `set`    | creates the path    | `InvalidOverwrite`    |
//! | DELETE    | `delete` | `PathNotFound`      | removes the subtree   |
//!
//! GET variants produce `Some`; SET and DELETE produce `None`.

use crate::{
    error::{ConfigError, Result},
    parser::{parse, Statement},
    tree::{ConfigTree, Resolved},
    value::Value,
};

/// Executes one parsed statement against `tree`.
pub fn execute(tree: &mut ConfigTree, statement: &Statement) -> Result<Option<Resolved>> {
    match statement {
        Statement::Get { path } => tree.get(path).map(Some),
        Statement::SafeGet { path } => match tree.get(path) {
            Ok(resolved) => Ok(Some(resolved)),
            // The `!` suffix turns a miss into a null result instead of
            // an error.
            Err(ConfigError::PathNotFound(_)) => Ok(Some(Resolved::Value(Value::Null))),
            Err(err) => Err(err),
        },
        Statement::Set { path, value } => {
            tree.set(path, value.clone())?;
            Ok(None)
        }
        Statement::Delete { path } => {
            tree.delete(path)?;
            Ok(None)
        }
    }
}

/// Parses and executes a single statement in one step.
pub fn run(tree: &mut ConfigTree, source: &str) -> Result<Option<Resolved>> {
    let statement = parse(source)?;
    execute(tree, &statement)
}
