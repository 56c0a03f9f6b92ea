//! Path resolver: navigates a decoded value by a sequence of map keys
//! and array indices (spec §4.5), the same shape as `"country/iso_code"`
//! style lookups against a GeoIP record.

use crate::error::{MmdbError, Result};
use crate::mmdb::decoder::{Cursor, DecodedValue};

/// One step of a lookup path: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl PathStep {
    pub fn key(s: impl Into<String>) -> Self {
        PathStep::Key(s.into())
    }
}

/// Resolve `path` against the value at `cursor`, following pointers
/// transparently (one hop) at every step. An empty path resolves to the
/// cursor itself. Returns `LookupPathDoesNotMatch` if a step names a
/// field absent from a map, an index out of an array's bounds, or
/// attempts to step into a scalar. Returns `InvalidLookupPath` if a
/// step's type mismatches the node it is applied to (a key against an
/// array, or an index against a map).
pub fn resolve<'d>(cursor: Cursor<'d>, path: &[PathStep]) -> Result<(DecodedValue<'d>, Cursor<'d>)> {
    let (mut value, mut next) = cursor.decode_follow()?;

    for step in path {
        match (step, value) {
            (PathStep::Key(want), DecodedValue::Map { count, body }) => {
                let mut found = None;
                let mut cur = body;
                for _ in 0..count {
                    let (key, after_key) = cur.decode_follow()?;
                    let key_str = match key {
                        DecodedValue::Utf8String(s) => s,
                        other => {
                            return Err(MmdbError::invalid_data(
                                0,
                                format!("map key is not a string: {}", other.type_name()),
                            ))
                        }
                    };
                    let (val, after_val) = after_key.decode_follow()?;
                    if key_str == want {
                        found = Some((val, after_val));
                        break;
                    }
                    cur = after_val;
                }
                match found {
                    Some((val, after)) => {
                        value = val;
                        next = after;
                    }
                    None => return Err(MmdbError::LookupPathDoesNotMatch),
                }
            }
            (PathStep::Index(want), DecodedValue::Array { count, body }) => {
                if *want >= count {
                    return Err(MmdbError::LookupPathDoesNotMatch);
                }
                let mut cur = body;
                let mut result = None;
                for i in 0..count {
                    let (val, after) = cur.decode_follow()?;
                    if i == *want {
                        result = Some((val, after));
                        break;
                    }
                    cur = after;
                }
                let (val, after) = result.ok_or(MmdbError::LookupPathDoesNotMatch)?;
                value = val;
                next = after;
            }
            (PathStep::Key(_), DecodedValue::Array { .. }) => {
                return Err(MmdbError::InvalidLookupPath(
                    "path step is a key, but the node at this position is an array".into(),
                ))
            }
            (PathStep::Index(_), DecodedValue::Map { .. }) => {
                return Err(MmdbError::InvalidLookupPath(
                    "path step is an index, but the node at this position is a map".into(),
                ))
            }
            _ => return Err(MmdbError::LookupPathDoesNotMatch),
        }
    }

    Ok((value, next))
}
