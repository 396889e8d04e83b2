// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! The configuration tree.
//!
//! [`ConfigTree`] owns the root node and exposes the path-addressed
//! operations the interpreter maps statements onto: [`set`](ConfigTree::set),
//! [`get`](ConfigTree::get), [`delete`](ConfigTree::delete) and
//! [`exists`](ConfigTree::exists). Paths arrive as already-split segment
//! slices; splitting dotted source text is the parser's job.
//!
//! Two invariants hold after every operation:
//!
//! 1. **Leaf/interior exclusivity** — a node with children has no value,
//!    a node with a value has no children.
//! 2. **Root is interior** — the root is a nameless container and never
//!    carries a value.

use indexmap::IndexMap;

use crate::{
    error::{ConfigError, FormatError, Result},
    node::Node,
    value::Value,
};

/// Maximum node depth the store will process. Shared by subtree
/// projection and the snapshot codec, which also applies it to list
/// nesting, so every recursive walk over the tree is bounded the same
/// way.
pub const MAX_DEPTH: usize = 1024;

/// The materialized result of reading a path.
///
/// Reading a leaf yields the leaf's value. Reading an interior node yields
/// a mapping from child name to the child's own resolution, recursively;
/// an interior node with no children yields an empty map.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolved {
    Value(Value),
    Map(IndexMap<String, Resolved>),
}

impl Resolved {
    /// Shorthand for asserting on leaf reads in embedding code.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(v) => Some(v),
            Resolved::Map(_) => None,
        }
    }

    /// Shorthand for asserting on interior reads in embedding code.
    pub fn as_map(&self) -> Option<&IndexMap<String, Resolved>> {
        match self {
            Resolved::Value(_) => None,
            Resolved::Map(m) => Some(m),
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

/// An in-memory configuration tree rooted at a nameless interior node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigTree {
    root: Node,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    /// Creates an empty tree: a root with no value and no children.
    pub fn new() -> Self {
        Self {
            root: Node::new(""),
        }
    }

    pub(crate) fn root(&self) -> &Node {
        &self.root
    }

    /// Replaces the entire tree contents. Used by snapshot load.
    pub(crate) fn replace_root(&mut self, root: Node) {
        self.root = root;
    }

    /// Assigns `value` at `path`, creating missing intermediates as empty
    /// interior nodes.
    ///
    /// Fails with [`ConfigError::InvalidOverwrite`] if an intermediate
    /// segment currently resolves to a leaf (a scalar cannot be descended
    /// into), or if the final segment resolves to an interior node (a
    /// namespace cannot be demoted to a scalar). Overwriting an existing
    /// leaf with a value of any type is allowed.
    ///
    /// Validation runs against the existing prefix before any node is
    /// created, so a failed `set` leaves the tree untouched.
    pub fn set(&mut self, path: &[impl AsRef<str>], value: Value) -> Result<()> {
        let (last, intermediates) = match path.split_last() {
            Some(split) => split,
            None => {
                return Err(ConfigError::invalid_overwrite(
                    path,
                    "empty path cannot address a node",
                ))
            }
        };

        // Walk the part of the path that already exists without mutating
        // anything, checking for leaves standing in the way.
        let mut existing = &self.root;
        let mut walked = 0;
        for segment in intermediates {
            match existing.child(segment.as_ref()) {
                Some(child) if child.is_leaf() => {
                    return Err(ConfigError::invalid_overwrite(
                        &path[..walked + 1],
                        format!(
                            "intermediate segment '{}' is a leaf and cannot be descended into",
                            segment.as_ref()
                        ),
                    ));
                }
                Some(child) => {
                    existing = child;
                    walked += 1;
                }
                None => break,
            }
        }
        if walked == intermediates.len() {
            if let Some(target) = existing.child(last.as_ref()) {
                if target.has_children() {
                    return Err(ConfigError::invalid_overwrite(
                        path,
                        "target is an interior node with children",
                    ));
                }
            }
        }

        // Safe to mutate: create whatever is missing and assign.
        let mut node = &mut self.root;
        for segment in intermediates {
            node = node.child_or_insert(segment.as_ref());
        }
        node.child_or_insert(last.as_ref()).set_value(value);
        Ok(())
    }

    /// Reads the node at `path`: the value if it is a leaf, its projection
    /// if it is interior. Fails with [`ConfigError::PathNotFound`] if no
    /// node exists at `path`, or with [`FormatError::TooDeep`] if the
    /// subtree below it nests past [`MAX_DEPTH`].
    pub fn get(&self, path: &[impl AsRef<str>]) -> Result<Resolved> {
        let node = self
            .walk(path)
            .ok_or_else(|| ConfigError::path_not_found(path))?;
        project(node, 0)
    }

    /// Removes the node at `path` together with its subtree.
    ///
    /// The parent is left in place even if it ends up childless: an empty
    /// interior node still marks a namespace the user declared, and
    /// pruning it would make a later `get` on the parent fail
    /// unexpectedly.
    pub fn delete(&mut self, path: &[impl AsRef<str>]) -> Result<()> {
        let (last, intermediates) = path
            .split_last()
            .ok_or_else(|| ConfigError::path_not_found(path))?;

        let mut node = &mut self.root;
        for segment in intermediates {
            node = match node.child_mut(segment.as_ref()) {
                Some(child) => child,
                None => return Err(ConfigError::path_not_found(path)),
            };
        }
        node.detach_child(last.as_ref())
            .map(|_| ())
            .ok_or_else(|| ConfigError::path_not_found(path))
    }

    /// Whether a node exists at `path`. Never errors.
    pub fn exists(&self, path: &[impl AsRef<str>]) -> bool {
        !path.is_empty() && self.walk(path).is_some()
    }

    fn walk(&self, path: &[impl AsRef<str>]) -> Option<&Node> {
        if path.is_empty() {
            return None;
        }
        let mut node = &self.root;
        for segment in path {
            node = node.child(segment.as_ref())?;
        }
        Some(node)
    }
}

/// Materializes a node: leaves project to their value, interior nodes to
/// the recursive mapping of their children in insertion order. Recursion
/// is bounded at [`MAX_DEPTH`]; nothing caps the length of a SET path, so
/// a tree can be deeper than any projection is willing to walk.
fn project(node: &Node, depth: usize) -> Result<Resolved> {
    if depth >= MAX_DEPTH {
        return Err(FormatError::TooDeep { limit: MAX_DEPTH }.into());
    }
    match node.value() {
        Some(value) => Ok(Resolved::Value(value.clone())),
        None => {
            let mut map = IndexMap::new();
            for child in node.children() {
                map.insert(child.name().to_string(), project(child, depth + 1)?);
            }
            Ok(Resolved::Map(map))
        }
    }
}
