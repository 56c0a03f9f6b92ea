//! Value-list walker: flattens a decoded value tree into a depth-first
//! sequence of (path, scalar) pairs, following pointers transparently
//! while guarding against cycles (spec §4.4).
//!
//! Used by the dump CLI and by tests that want to materialize an entire
//! record without knowing its shape ahead of time.

use std::collections::HashSet;

use crate::error::{MmdbError, Result};
use crate::mmdb::decoder::{Cursor, DecodedValue};
use crate::mmdb::path::PathStep;

/// A fully materialized scalar, detached from the database image's
/// lifetime so callers can collect a `Vec<WalkEntry>` independent of it.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Utf8String(String),
    Double(f64),
    Bytes(Vec<u8>),
    Uint16(u16),
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Uint128 { hi: u64, lo: u64 },
    Boolean(bool),
    Float(f32),
}

/// One leaf of the walk: its path from the root, and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkEntry {
    pub path: Vec<PathStep>,
    pub value: Scalar,
}

/// Default cap on the number of values a single walk will visit, guarding
/// against pathological or maliciously deep/wide records.
pub const DEFAULT_MAX_NODES: usize = 64 * 1024;

/// Walk the entire value tree rooted at `cursor`, emitting every scalar
/// leaf in depth-first order. A data-section offset visited twice along
/// the same path (a pointer cycle) is an error — pointers are expected
/// to reference shared substructure, not self-reference.
pub fn walk_all<'d>(cursor: Cursor<'d>) -> Result<Vec<WalkEntry>> {
    walk_all_bounded(cursor, DEFAULT_MAX_NODES)
}

/// Like [`walk_all`], with an explicit cap on the number of values
/// visited before giving up with `MmdbError::InvalidData`.
pub fn walk_all_bounded<'d>(cursor: Cursor<'d>, max_nodes: usize) -> Result<Vec<WalkEntry>> {
    let mut out = Vec::new();
    let mut visiting = HashSet::new();
    let mut budget = max_nodes;
    walk_into(cursor, Vec::new(), &mut visiting, &mut budget, &mut out)?;
    Ok(out)
}

fn walk_into<'d>(
    cursor: Cursor<'d>,
    path: Vec<PathStep>,
    visiting: &mut HashSet<usize>,
    budget: &mut usize,
    out: &mut Vec<WalkEntry>,
) -> Result<()> {
    if *budget == 0 {
        return Err(MmdbError::invalid_data(0, "value-list walk exceeded its node budget"));
    }
    *budget -= 1;
    let (value, _) = cursor.decode_follow()?;
    match value {
        DecodedValue::Map { count, body } => {
            let container_key = body.rel_offset();
            if !visiting.insert(container_key) {
                return Err(MmdbError::invalid_data(
                    container_key,
                    "cycle detected while walking value tree",
                ));
            }
            let mut cur = body;
            for _ in 0..count {
                let (key, after_key) = cur.decode_follow()?;
                let key_str = match key {
                    DecodedValue::Utf8String(s) => s.to_owned(),
                    other => {
                        return Err(MmdbError::invalid_data(
                            0,
                            format!("map key is not a string: {}", other.type_name()),
                        ))
                    }
                };
                let mut child_path = path.clone();
                child_path.push(PathStep::Key(key_str));
                let (_, after_val) = after_key.decode_follow()?;
                walk_into(after_key, child_path, visiting, budget, out)?;
                cur = after_val;
            }
            visiting.remove(&container_key);
        }
        DecodedValue::Array { count, body } => {
            let container_key = body.rel_offset();
            if !visiting.insert(container_key) {
                return Err(MmdbError::invalid_data(
                    container_key,
                    "cycle detected while walking value tree",
                ));
            }
            let mut cur = body;
            for i in 0..count {
                let mut child_path = path.clone();
                child_path.push(PathStep::Index(i));
                let (_, after) = cur.decode_follow()?;
                walk_into(cur, child_path, visiting, budget, out)?;
                cur = after;
            }
            visiting.remove(&container_key);
        }
        scalar => out.push(WalkEntry {
            path,
            value: to_scalar(scalar)?,
        }),
    }

    Ok(())
}

fn to_scalar(value: DecodedValue<'_>) -> Result<Scalar> {
    Ok(match value {
        DecodedValue::Utf8String(s) => Scalar::Utf8String(s.to_owned()),
        DecodedValue::Double(d) => Scalar::Double(d),
        DecodedValue::Bytes(b) => Scalar::Bytes(b.to_vec()),
        DecodedValue::Uint16(v) => Scalar::Uint16(v),
        DecodedValue::Uint32(v) => Scalar::Uint32(v),
        DecodedValue::Int32(v) => Scalar::Int32(v),
        DecodedValue::Uint64(v) => Scalar::Uint64(v),
        DecodedValue::Uint128 { hi, lo } => Scalar::Uint128 { hi, lo },
        DecodedValue::Boolean(v) => Scalar::Boolean(v),
        DecodedValue::Float(v) => Scalar::Float(v),
        other @ (DecodedValue::Map { .. } | DecodedValue::Array { .. } | DecodedValue::Pointer(_)) => {
            return Err(MmdbError::invalid_data(
                0,
                format!("expected a scalar value, got {}", other.type_name()),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_str(s: &str) -> Vec<u8> {
        let mut out = vec![0b010_00000u8 | (s.len() as u8)];
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_walk_flat_map() {
        let mut data = Vec::new();
        data.push(0b111_00000u8 | 2);
        data.extend_from_slice(&encode_str("a"));
        data.extend_from_slice(&encode_str("1"));
        data.extend_from_slice(&encode_str("b"));
        data.extend_from_slice(&encode_str("2"));

        let cursor = Cursor::at(&data, 0, 0);
        let entries = walk_all(cursor).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, vec![PathStep::key("a")]);
        assert_eq!(entries[0].value, Scalar::Utf8String("1".into()));
        assert_eq!(entries[1].path, vec![PathStep::key("b")]);
        assert_eq!(entries[1].value, Scalar::Utf8String("2".into()));
    }

    #[test]
    fn test_walk_nested_array_in_map() {
        let mut data = Vec::new();
        data.push(0b111_00000u8 | 1); // map, 1 pair
        data.extend_from_slice(&encode_str("tags"));
        data.push(0b000_00010u8); // extended, low5=2 (array length 2)
        data.push(0x04); // type 11 = array
        data.extend_from_slice(&encode_str("x"));
        data.extend_from_slice(&encode_str("y"));

        let cursor = Cursor::at(&data, 0, 0);
        let entries = walk_all(cursor).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, vec![PathStep::key("tags"), PathStep::Index(0)]);
        assert_eq!(entries[1].path, vec![PathStep::key("tags"), PathStep::Index(1)]);
    }

    #[test]
    fn test_walk_empty_map() {
        let data = vec![0b111_00000u8];
        let cursor = Cursor::at(&data, 0, 0);
        let entries = walk_all(cursor).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_walk_respects_node_budget() {
        let mut data = Vec::new();
        data.push(0b111_00000u8 | 2);
        data.extend_from_slice(&encode_str("a"));
        data.extend_from_slice(&encode_str("1"));
        data.extend_from_slice(&encode_str("b"));
        data.extend_from_slice(&encode_str("2"));

        let cursor = Cursor::at(&data, 0, 0);
        let err = walk_all_bounded(cursor, 2).unwrap_err();
        assert!(matches!(err, MmdbError::InvalidData { offset: 0, .. }));
    }
}
