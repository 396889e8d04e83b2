// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory tree nodes.
//!
//! A [`Node`] either holds a value (a *leaf*) or holds children (an
//! *interior* node), never both. Children are kept in an insertion-ordered
//! map so that snapshot output is deterministic: the codec walks children
//! in exactly the order they were first attached.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueTag};

/// A single node in the configuration tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    name: String,
    value: Option<Value>,
    /// Discriminator of the last assigned value. Redundant with `value`
    /// while a value is present; retained after snapshot load so a future
    /// format revision can distinguish null leaves from interior nodes.
    type_tag: Option<ValueTag>,
    children: IndexMap<String, Node>,
}

impl Node {
    /// Creates a node with no value and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            type_tag: None,
            children: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn type_tag(&self) -> Option<ValueTag> {
        self.type_tag
    }

    /// Assigns a value, making this node a leaf. The caller is responsible
    /// for upholding leaf/interior exclusivity before calling.
    pub(crate) fn set_value(&mut self, value: Value) {
        debug_assert!(self.children.is_empty());
        self.type_tag = Some(value.tag());
        self.value = Some(value);
    }

    /// Restores value and tag as recorded in a snapshot. Load is the one
    /// path where the tag may be present while the value is absent.
    pub(crate) fn restore_value(&mut self, value: Option<Value>, type_tag: Option<ValueTag>) {
        self.value = value;
        self.type_tag = type_tag;
    }

    /// A node with a value is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    /// A node without a value is interior, even with zero children.
    pub fn is_interior(&self) -> bool {
        self.value.is_none()
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Attaches a child under its own name. Fails if a child with that
    /// name is already present and `replace` was not requested.
    pub(crate) fn attach_child(&mut self, child: Node, replace: bool) -> Result<(), Node> {
        if !replace && self.children.contains_key(child.name()) {
            return Err(child);
        }
        self.children.insert(child.name.clone(), child);
        Ok(())
    }

    /// Returns the named child, creating an empty interior child if absent.
    pub(crate) fn child_or_insert(&mut self, name: &str) -> &mut Node {
        self.children
            .entry(name.to_string())
            .or_insert_with(|| Node::new(name))
    }

    /// Unlinks the named child and its entire subtree. `shift_remove`
    /// keeps the remaining siblings in their original order, which keeps
    /// snapshot output stable across deletions.
    pub(crate) fn detach_child(&mut self, name: &str) -> Option<Node> {
        self.children.shift_remove(name)
    }
}

// Child order is part of a node's identity: two nodes with the same
// children attached in a different order serialize differently.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.value == other.value
            && self.type_tag == other.type_tag
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
    }
}

impl Eq for Node {}
