//! Core A: read-only, memory-mapped MaxMindDB-format IP lookup engine.
//!
//! Submodules are ordered leaf-to-root: [`memory`] owns the raw bytes,
//! [`metadata`] and [`decoder`] interpret them, [`tree`], [`path`] and
//! [`walker`] build on the decoder, and [`reader`] is the public facade
//! that ties all of it together.

pub mod address;
pub mod decoder;
pub mod memory;
pub mod metadata;
pub mod path;
pub mod reader;
pub mod tree;
pub mod walker;

pub use address::{canonicalize, CanonicalAddress};
pub use decoder::{Cursor, DecodedValue, ValueIter, ValueType};
pub use memory::Region;
pub use metadata::Metadata;
pub use path::PathStep;
pub use reader::{DecodedValueOwned, Lookup, Reader, TreeNode};
pub use tree::{NodeRecord, Tree};
pub use walker::{walk_all, walk_all_bounded, Scalar, WalkEntry, DEFAULT_MAX_NODES};
