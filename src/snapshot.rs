// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Binary snapshot codec.
//!
//! A snapshot is the full tree serialized to a self-describing byte
//! stream and restored exactly. The layout, big-endian throughout:
//!
//! ```text
//! HEADER: magic "CFGX" (4 bytes) | version u8 (=1)
//! BODY:   one NODE record for the root, recursively
//!
//! NODE:   name_len u32 | name UTF-8 | VALUE | child_count u32 | children
//! VALUE:  tag u8 in {'N','B','I','F','S','L'} | val_len u32 | payload
//! ```
//!
//! Children are written in the insertion order of the parent's child map,
//! so the same tree always produces the same bytes. Lists are
//! self-delimiting: the outer `val_len` covers the packed element records
//! and the element count is implicit.
//!
//! The reader validates everything it touches — magic, version, tags,
//! declared lengths against the remaining stream, UTF-8 — and reports
//! failures as typed [`FormatError`]s. Both directions bound recursion at
//! [`MAX_DEPTH`] so a pathological input cannot blow the call stack.

use std::{
    fs,
    io::{Cursor, Read, Write},
    path::Path,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    error::{ConfigError, FormatError, Result},
    node::Node,
    tree::ConfigTree,
    value::{Value, ValueTag},
};

/// Leading magic of every snapshot file.
pub const MAGIC: [u8; 4] = *b"CFGX";

/// Current snapshot format version.
pub const FORMAT_VERSION: u8 = 1;

pub use crate::tree::MAX_DEPTH;

/// Serializes the entire tree to a byte vector.
pub fn encode(tree: &ConfigTree) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_all(&MAGIC)?;
    out.write_u8(FORMAT_VERSION)?;
    write_node(&mut out, tree.root(), 0)?;
    Ok(out)
}

/// Deserializes a tree from a byte stream produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<ConfigTree> {
    let mut reader = Cursor::new(bytes);
    read_header(&mut reader)?;
    let root = read_node(&mut reader, 0)?;
    let remaining = bytes.len() - reader.position() as usize;
    if remaining != 0 {
        return Err(FormatError::TrailingData(remaining).into());
    }
    let mut tree = ConfigTree::new();
    tree.replace_root(root);
    Ok(tree)
}

/// Writes a snapshot of `tree` to `path`, creating any missing parent
/// directories, and syncs it to disk.
pub fn save(tree: &ConfigTree, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = encode(tree)?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Loads a snapshot from `path`. A missing file reports
/// [`ConfigError::PathNotFound`]; everything else that goes wrong with the
/// file itself is [`ConfigError::Io`], and malformed content is
/// [`ConfigError::InvalidFormat`].
pub fn load(path: impl AsRef<Path>) -> Result<ConfigTree> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::PathNotFound(path.display().to_string()))
        }
        Err(err) => return Err(err.into()),
    };
    decode(&bytes)
}

fn read_header(reader: &mut Cursor<&[u8]>) -> Result<()> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| FormatError::Truncated { context: "magic" })?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic { found: magic }.into());
    }
    let version = reader
        .read_u8()
        .map_err(|_| FormatError::Truncated { context: "version" })?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion { version }.into());
    }
    Ok(())
}

fn write_node(out: &mut Vec<u8>, node: &Node, depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(FormatError::TooDeep { limit: MAX_DEPTH }.into());
    }

    let name = node.name().as_bytes();
    out.write_u32::<BigEndian>(name.len() as u32)?;
    out.write_all(name)?;

    write_value(out, node.value(), 0)?;

    out.write_u32::<BigEndian>(node.child_count() as u32)?;
    for child in node.children() {
        write_node(out, child, depth + 1)?;
    }
    Ok(())
}

/// Writes one VALUE record. An absent value writes tag `'N'` with an
/// empty payload, the same encoding a `null` leaf gets.
fn write_value(out: &mut Vec<u8>, value: Option<&Value>, depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(FormatError::TooDeep { limit: MAX_DEPTH }.into());
    }

    let value = match value {
        None | Some(Value::Null) => {
            out.write_u8(ValueTag::Null.as_byte())?;
            out.write_u32::<BigEndian>(0)?;
            return Ok(());
        }
        Some(value) => value,
    };

    out.write_u8(value.tag().as_byte())?;
    match value {
        Value::Null => unreachable!("handled above"),
        Value::Bool(b) => {
            out.write_u32::<BigEndian>(1)?;
            out.write_u8(*b as u8)?;
        }
        Value::Int(i) => {
            out.write_u32::<BigEndian>(8)?;
            out.write_i64::<BigEndian>(*i)?;
        }
        Value::Float(f) => {
            out.write_u32::<BigEndian>(8)?;
            out.write_f64::<BigEndian>(*f)?;
        }
        Value::Str(s) => {
            out.write_u32::<BigEndian>(s.len() as u32)?;
            out.write_all(s.as_bytes())?;
        }
        Value::List(items) => {
            // Elements are packed end-to-end; the element count is implied
            // by the payload length, so the payload is built first.
            let mut payload = Vec::new();
            for item in items {
                write_value(&mut payload, Some(item), depth + 1)?;
            }
            out.write_u32::<BigEndian>(payload.len() as u32)?;
            out.write_all(&payload)?;
        }
    }
    Ok(())
}

fn read_node(reader: &mut Cursor<&[u8]>, depth: usize) -> Result<Node> {
    if depth >= MAX_DEPTH {
        return Err(FormatError::TooDeep { limit: MAX_DEPTH }.into());
    }

    let name_len = reader
        .read_u32::<BigEndian>()
        .map_err(|_| FormatError::Truncated { context: "name length" })?;
    let name_bytes = take(reader, name_len as usize, "node name")?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| FormatError::InvalidUtf8 { context: "node name" })?;
    let mut node = Node::new(name);

    let (tag, value) = read_value(reader, 0)?;
    // Tag 'N' covers both interior nodes and null leaves; both load as
    // "no value" under the current format. See the type_tag notes on
    // `Node` for how a future version can split them apart.
    let type_tag = match tag {
        ValueTag::Null => None,
        other => Some(other),
    };
    node.restore_value(value, type_tag);

    let child_count = reader
        .read_u32::<BigEndian>()
        .map_err(|_| FormatError::Truncated { context: "child count" })?;
    // Leaf/interior exclusivity holds on disk too: a record with a
    // decoded value must not declare children.
    if child_count > 0 && node.value().is_some() {
        return Err(FormatError::LeafWithChildren {
            name: node.name().to_string(),
            children: child_count,
        }
        .into());
    }
    for _ in 0..child_count {
        let child = read_node(reader, depth + 1)?;
        // Later duplicates replace earlier ones, mirroring a plain map
        // insert on load.
        let _ = node.attach_child(child, true);
    }
    Ok(node)
}

/// Reads one VALUE record from the outer stream, returning the tag and
/// the decoded value (`None` for tag `'N'`).
fn read_value(reader: &mut Cursor<&[u8]>, depth: usize) -> Result<(ValueTag, Option<Value>)> {
    let tag_byte = reader
        .read_u8()
        .map_err(|_| FormatError::Truncated { context: "value tag" })?;
    let tag =
        ValueTag::from_byte(tag_byte).ok_or(FormatError::UnknownTag { tag: tag_byte })?;
    let val_len = reader
        .read_u32::<BigEndian>()
        .map_err(|_| FormatError::Truncated { context: "value length" })?;
    let payload = take(reader, val_len as usize, "value payload")?;
    let value = decode_payload(tag, &payload, depth)?;
    Ok((tag, value))
}

/// Interprets a value payload for `tag`. `depth` counts list nesting.
fn decode_payload(tag: ValueTag, payload: &[u8], depth: usize) -> Result<Option<Value>> {
    if depth >= MAX_DEPTH {
        return Err(FormatError::TooDeep { limit: MAX_DEPTH }.into());
    }

    let value = match tag {
        ValueTag::Null => {
            if !payload.is_empty() {
                return Err(FormatError::BadPayloadLength {
                    tag: 'N',
                    len: payload.len() as u32,
                }
                .into());
            }
            return Ok(None);
        }
        ValueTag::Bool => {
            if payload.len() != 1 {
                return Err(FormatError::BadPayloadLength {
                    tag: 'B',
                    len: payload.len() as u32,
                }
                .into());
            }
            Value::Bool(payload[0] != 0)
        }
        ValueTag::Int => {
            if payload.len() != 8 {
                return Err(FormatError::BadPayloadLength {
                    tag: 'I',
                    len: payload.len() as u32,
                }
                .into());
            }
            Value::Int(Cursor::new(payload).read_i64::<BigEndian>()?)
        }
        ValueTag::Float => {
            if payload.len() != 8 {
                return Err(FormatError::BadPayloadLength {
                    tag: 'F',
                    len: payload.len() as u32,
                }
                .into());
            }
            Value::Float(Cursor::new(payload).read_f64::<BigEndian>()?)
        }
        ValueTag::Str => {
            let s = std::str::from_utf8(payload)
                .map_err(|_| FormatError::InvalidUtf8 { context: "string value" })?;
            Value::Str(s.to_string())
        }
        ValueTag::List => {
            let mut items = Vec::new();
            let mut cursor = Cursor::new(payload);
            while (cursor.position() as usize) < payload.len() {
                let (_, element) = read_value(&mut cursor, depth + 1)?;
                // A list element with tag 'N' is a genuine null literal;
                // there is no "absent" inside a list.
                items.push(element.unwrap_or(Value::Null));
            }
            Value::List(items)
        }
    };
    Ok(Some(value))
}

/// Reads exactly `len` bytes, reporting truncation with `context`.
fn take(reader: &mut Cursor<&[u8]>, len: usize, context: &'static str) -> Result<Vec<u8>> {
    let pos = reader.position() as usize;
    let data = *reader.get_ref();
    if data.len() - pos < len {
        return Err(FormatError::Truncated { context }.into());
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
