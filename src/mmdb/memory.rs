//! Memory provider: owns the byte region backing an open database.
//!
//! Mirrors the way `storage_v2::segment` crosses from a mapped file to a
//! plain byte slice — everything above this module addresses the region
//! as `&[u8]` and does not care whether it came from `mmap` or from a
//! caller-owned buffer.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{MmdbError, Result};

/// Smallest possible tail: marker (14 bytes) + a one-byte metadata map.
const MIN_IMAGE_LEN: usize = 15;

/// The byte region backing a database handle.
///
/// `Mapped` owns a live `mmap` and unmaps on drop (via `Mmap`'s own
/// `Drop`). `Owned` holds a buffer the handle itself now owns. `Borrowed`
/// addresses caller memory the handle does not own and will not free —
/// the caller must outlive the handle, which the `'a` lifetime enforces.
pub enum Region<'a> {
    Mapped(Mmap),
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

impl<'a> Region<'a> {
    /// Open and memory-map a file read-only.
    pub fn open_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(MmdbError::FileOpen)?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(MmdbError::Io)?;
        Self::validate_len(mmap.len())?;
        Ok(Region::Mapped(mmap))
    }

    /// Take ownership of a caller-supplied buffer.
    pub fn from_owned(bytes: Vec<u8>) -> Result<Self> {
        Self::validate_len(bytes.len())?;
        Ok(Region::Owned(bytes))
    }

    /// Borrow a caller-supplied buffer without copying it.
    pub fn from_slice(bytes: &'a [u8]) -> Result<Self> {
        Self::validate_len(bytes.len())?;
        Ok(Region::Borrowed(bytes))
    }

    fn validate_len(len: usize) -> Result<()> {
        if len < MIN_IMAGE_LEN {
            return Err(MmdbError::InvalidMetadata(format!(
                "database image too small: {len} bytes, need at least {MIN_IMAGE_LEN}"
            )));
        }
        Ok(())
    }
}

impl Deref for Region<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Region::Mapped(m) => m,
            Region::Owned(v) => v,
            Region::Borrowed(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_owned_too_small() {
        let err = Region::from_owned(vec![0u8; 3]).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_from_slice_ok() {
        let bytes = vec![0u8; MIN_IMAGE_LEN];
        let region = Region::from_slice(&bytes).unwrap();
        assert_eq!(region.len(), MIN_IMAGE_LEN);
    }

    #[test]
    fn test_open_file_missing() {
        let err = Region::open_file(Path::new("/nonexistent/path/db.mmdb")).unwrap_err();
        assert!(matches!(err, MmdbError::FileOpen(_)));
    }

    #[test]
    fn test_open_file_roundtrip() {
        use std::io::Write;

        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&vec![0xAAu8; 64]).unwrap();
        temp.flush().unwrap();

        let region = Region::open_file(temp.path()).unwrap();
        assert_eq!(region.len(), 64);
        assert_eq!(region[0], 0xAA);
    }
}
