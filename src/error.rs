//! Error types for the mmdb lookup engine and JSON indexer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MmdbError>;

/// Errors produced by the IP lookup engine (Core A).
#[derive(Error, Debug)]
pub enum MmdbError {
    #[error("failed to open database file: {0}")]
    FileOpen(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("out of memory")]
    OutOfMemory,

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid data at offset {offset}: {reason}")]
    InvalidData { offset: usize, reason: String },

    #[error("invalid lookup path: {0}")]
    InvalidLookupPath(String),

    #[error("lookup path does not match database contents")]
    LookupPathDoesNotMatch,

    #[error("invalid node number {0}")]
    InvalidNodeNumber(u32),

    #[error("IPv6 address looked up in an IPv4-only database")]
    Ipv6InIpv4Database,
}

impl MmdbError {
    /// Short machine-readable error code, for callers that want to branch
    /// on error kind without matching the full enum.
    pub fn code(&self) -> &'static str {
        match self {
            MmdbError::FileOpen(_) => "FILE_OPEN",
            MmdbError::Io(_) => "IO",
            MmdbError::OutOfMemory => "OUT_OF_MEMORY",
            MmdbError::InvalidMetadata(_) => "INVALID_METADATA",
            MmdbError::InvalidData { .. } => "INVALID_DATA",
            MmdbError::InvalidLookupPath(_) => "INVALID_LOOKUP_PATH",
            MmdbError::LookupPathDoesNotMatch => "LOOKUP_PATH_DOES_NOT_MATCH",
            MmdbError::InvalidNodeNumber(_) => "INVALID_NODE_NUMBER",
            MmdbError::Ipv6InIpv4Database => "IPV6_LOOKUP_IN_IPV4_DATABASE",
        }
    }

    pub(crate) fn invalid_data(offset: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(offset, reason = %reason, "invalid data encountered while decoding");
        MmdbError::InvalidData { offset, reason }
    }
}

/// Errors produced by the JSON structural indexer (Core B).
///
/// Distinct from [`MmdbError`] — the indexer is an unrelated core with
/// its own error shape (a byte offset or a remaining-depth count, not a
/// kind taxonomy).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonIndexError {
    #[error("invalid JSON byte at offset {0}")]
    InvalidByte(usize),

    #[error("truncated input, {0} level(s) of nesting left unclosed")]
    Truncated(u32),
}
