//! Read-only, memory-mapped IP-to-data lookup engine in the MaxMindDB
//! binary format (Core A), plus a single-pass JSON structural indexer
//! (Core B).
//!
//! The two cores share nothing but this crate's error conventions —
//! [`mmdb`] never touches JSON and [`json_index`] never touches the
//! binary tree format. See each module's docs for its own contract.

pub mod error;
pub mod json_index;
pub mod mmdb;

pub use error::{JsonIndexError, MmdbError, Result};
pub use json_index::{index_json, json_index_into, IndexStatus, Token as JsonToken};
pub use mmdb::{PathStep, Reader};
