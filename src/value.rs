// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed leaf values.
//!
//! A [`Value`] is the closed set of scalars a leaf node can hold, plus
//! ordered lists whose elements are themselves values. Lists are leaf
//! payloads, not tree structure: a node holding a list has no children.

#[cfg(any(test, feature = "fuzzing"))]
use proptest::{collection::vec, prelude::*};
#[cfg(any(test, feature = "fuzzing"))]
use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};

/// A typed value stored at a leaf node.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The `null` literal. Distinct from "no value at all": an interior
    /// node has no value, while a leaf may hold `Null` explicitly.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

/// One-byte discriminator for [`Value`], matching the tag byte the
/// snapshot codec writes. Nodes keep the tag of their last assignment so
/// null-valued leaves remain distinguishable from interior nodes even
/// though both serialize under [`ValueTag::Null`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "fuzzing"), derive(Arbitrary))]
pub enum ValueTag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl ValueTag {
    /// The ASCII tag byte written to snapshots.
    pub fn as_byte(self) -> u8 {
        match self {
            ValueTag::Null => b'N',
            ValueTag::Bool => b'B',
            ValueTag::Int => b'I',
            ValueTag::Float => b'F',
            ValueTag::Str => b'S',
            ValueTag::List => b'L',
        }
    }

    /// Maps a snapshot tag byte back to a discriminator.
    pub fn from_byte(byte: u8) -> Option<ValueTag> {
        match byte {
            b'N' => Some(ValueTag::Null),
            b'B' => Some(ValueTag::Bool),
            b'I' => Some(ValueTag::Int),
            b'F' => Some(ValueTag::Float),
            b'S' => Some(ValueTag::Str),
            b'L' => Some(ValueTag::List),
            _ => None,
        }
    }
}

impl Value {
    /// The discriminator for this value.
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Null => ValueTag::Null,
            Value::Bool(_) => ValueTag::Bool,
            Value::Int(_) => ValueTag::Int,
            Value::Float(_) => ValueTag::Float,
            Value::Str(_) => ValueTag::Str,
            Value::List(_) => ValueTag::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// Floats are compared bitwise so that NaN and signed zeroes are stable
// under snapshot round-trips. This makes equality total and `Eq` sound.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(any(test, feature = "fuzzing"))]
impl Arbitrary for Value {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        let scalar = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            any::<f64>().prop_map(Value::Float),
            ".*".prop_map(Value::Str),
        ];
        scalar
            .prop_recursive(4, 32, 8, |element| {
                vec(element, 0..8).prop_map(Value::List)
            })
            .boxed()
    }
}
