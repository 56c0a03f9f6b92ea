//! Lookup facade: the public entry point tying together the memory
//! region, metadata, tree walker and value decoder (spec §4.7).

use std::path::Path;

use crate::error::{MmdbError, Result};
use crate::mmdb::address::canonicalize;
use crate::mmdb::decoder::{Cursor, DecodedValue};
use crate::mmdb::memory::Region;
use crate::mmdb::metadata::Metadata;
use crate::mmdb::path::{resolve, PathStep};
use crate::mmdb::tree::{NodeRecord, Tree};
use crate::mmdb::walker::{walk_all, WalkEntry};

/// An open, read-only MaxMindDB database.
///
/// Holds the backing [`Region`] for its whole lifetime; all lookups
/// borrow from it without copying. Safe to share across threads behind
/// an `Arc` — nothing here is interior-mutable.
pub struct Reader<'a> {
    region: Region<'a>,
    metadata: Metadata,
}

/// Result of a successful lookup: whether the address matched a network
/// and, if so, the record's position in the tree (for `prefix_len`) and
/// a cursor ready to decode or resolve a path against.
pub struct Lookup<'d> {
    pub prefix_len: u32,
    cursor: Cursor<'d>,
}

/// The two classified children of a single tree node, as returned by
/// [`Reader::read_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    pub left: NodeRecord,
    pub right: NodeRecord,
}

impl<'a> Reader<'a> {
    /// Open and memory-map a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let region = Region::open_file(path)?;
        let reader = Self::from_region(region)?;
        tracing::debug!(
            path = %path.display(),
            ip_version = reader.metadata.ip_version,
            record_size = reader.metadata.record_size,
            node_count = reader.metadata.node_count,
            "opened mmdb database"
        );
        Ok(reader)
    }

    /// Build a reader over an owned in-memory buffer (e.g. one read from
    /// a non-file source).
    pub fn from_buffer(bytes: Vec<u8>) -> Result<Self> {
        let region = Region::from_owned(bytes)?;
        Self::from_region(region)
    }

    /// Build a reader borrowing a caller-owned buffer.
    pub fn from_slice(bytes: &'a [u8]) -> Result<Self> {
        let region = Region::from_slice(bytes)?;
        Self::from_region(region)
    }

    fn from_region(region: Region<'a>) -> Result<Self> {
        let metadata = Metadata::parse(&region)?;
        Ok(Reader { region, metadata })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn tree(&self) -> Tree<'_> {
        let tree_bytes = &self.region[0..self.metadata.tree_size_bytes];
        Tree::new(tree_bytes, self.metadata.record_size, self.metadata.node_count)
    }

    /// Read both classified children of a tree node directly, bypassing
    /// address lookup. Exposed mainly for diagnostics and conformance
    /// testing against known node fixtures.
    pub fn read_node(&self, node_index: u32) -> Result<TreeNode> {
        let tree = self.tree();
        let (left, right) = tree.read_node(node_index)?;
        Ok(TreeNode {
            left: tree.classify(left)?,
            right: tree.classify(right)?,
        })
    }

    /// Walk the tree for a textual IP address. Returns `Ok(None)` if the
    /// address falls in an unassigned (empty) branch — a well-formed,
    /// ordinary "not found" outcome, not an error.
    pub fn lookup_address(&self, address: &str) -> Result<Option<Lookup<'_>>> {
        let canonical = canonicalize(address, self.metadata.ip_version)?;
        let tree = self.tree();
        let (record, consumed) = tree.walk(canonical.bits, canonical.start_bit, canonical.bit_count)?;
        match record {
            NodeRecord::Data(offset) => {
                let cursor = Cursor::at(&self.region, self.metadata.data_section_start, offset);
                Ok(Some(Lookup {
                    prefix_len: consumed,
                    cursor,
                }))
            }
            NodeRecord::Empty => Ok(None),
            NodeRecord::Node(_) => {
                // Only possible if bit_count ran out before reaching a
                // leaf, i.e. the tree is deeper than the address width.
                Err(MmdbError::invalid_data(
                    0,
                    "tree traversal exhausted address bits without reaching a leaf",
                ))
            }
        }
    }

    /// Look up an address and resolve a dotted path against its record
    /// in one step, the common case ("country/iso_code").
    pub fn lookup_path(&self, address: &str, path: &[PathStep]) -> Result<Option<DecodedValueOwned>> {
        let Some(found) = self.lookup_address(address)? else {
            return Ok(None);
        };
        let (value, _) = resolve(found.cursor, path)?;
        Ok(Some(DecodedValueOwned::from_borrowed(value)?))
    }

    /// Materialize the entire record for an address as a flat list of
    /// (path, scalar) leaves.
    pub fn lookup_all(&self, address: &str) -> Result<Option<Vec<WalkEntry>>> {
        let Some(found) = self.lookup_address(address)? else {
            return Ok(None);
        };
        Ok(Some(walk_all(found.cursor)?))
    }
}

impl<'d> Lookup<'d> {
    /// Resolve a dotted path against this record.
    pub fn resolve(&self, path: &[PathStep]) -> Result<DecodedValueOwned> {
        let (value, _) = resolve(self.cursor, path)?;
        DecodedValueOwned::from_borrowed(value)
    }

    /// The raw cursor at the record's root, for callers that want
    /// [`Cursor::decode`] or [`Cursor::iterate`] directly.
    pub fn cursor(&self) -> Cursor<'d> {
        self.cursor
    }
}

/// A scalar detached from the database's lifetime, returned by
/// [`Reader::lookup_path`]. Containers are rejected at that boundary —
/// use [`Reader::lookup_all`] when the full record shape is wanted.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValueOwned {
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

impl DecodedValueOwned {
    fn from_borrowed(value: DecodedValue<'_>) -> Result<Self> {
        Ok(match value {
            DecodedValue::Utf8String(s) => DecodedValueOwned::Utf8String(s.to_owned()),
            DecodedValue::Double(d) => DecodedValueOwned::Double(d),
            DecodedValue::Bytes(b) => DecodedValueOwned::Bytes(b.to_vec()),
            DecodedValue::Uint16(v) => DecodedValueOwned::Uint16(v),
            DecodedValue::Uint32(v) => DecodedValueOwned::Uint32(v),
            DecodedValue::Int32(v) => DecodedValueOwned::Int32(v),
            DecodedValue::Uint64(v) => DecodedValueOwned::Uint64(v),
            DecodedValue::Uint128 { hi, lo } => DecodedValueOwned::Uint128 { hi, lo },
            DecodedValue::Boolean(v) => DecodedValueOwned::Boolean(v),
            DecodedValue::Float(v) => DecodedValueOwned::Float(v),
            other @ (DecodedValue::Map { .. } | DecodedValue::Array { .. } | DecodedValue::Pointer(_)) => {
                return Err(MmdbError::invalid_data(
                    0,
                    format!(
                        "path resolved to a {}, not a scalar — use lookup_all for full records",
                        other.type_name()
                    ),
                ))
            }
        })
    }
}
