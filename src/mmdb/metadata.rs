//! Metadata parser: locates and decodes the trailing metadata map.
//!
//! The metadata block has no fixed offset — it is found by scanning
//! backward from the end of the image for the marker, the same way
//! `storage_v2::types::FooterIndex` is found by reading fixed bytes off
//! the tail of a segment, except here the tail itself is variable length
//! and self-delimiting only by the marker.

use crate::error::{MmdbError, Result};
use crate::mmdb::decoder::{Cursor, DecodedValue};

const MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Search window: real metadata blocks are small (well under 128 KiB);
/// bound the backward scan so a corrupt image without a marker fails
/// fast instead of scanning the entire file.
const MAX_SCAN_WINDOW: usize = 128 * 1024;

/// Parsed database metadata (spec §4.2).
#[derive(Debug, Clone)]
pub struct Metadata {
    pub binary_format_major_version: u16,
    pub binary_format_minor_version: u16,
    pub ip_version: u16,
    pub record_size: u16,
    pub node_count: u32,
    pub database_type: String,
    pub languages: Vec<String>,
    pub description: Vec<(String, String)>,
    pub build_epoch: u64,
    /// Total size in bytes of the search tree (node_count * node size).
    pub tree_size_bytes: usize,
    /// Byte offset of the data section relative to the start of the image.
    pub data_section_start: usize,
}

impl Metadata {
    /// Parse the metadata block out of a full database image.
    pub fn parse(image: &[u8]) -> Result<Self> {
        let marker_pos = find_marker(image)?;
        let metadata_start = marker_pos + MARKER.len();

        let cursor = Cursor::at(image, metadata_start, 0);
        let (value, _) = cursor.decode()?;
        let DecodedValue::Map { count, body } = value else {
            return Err(MmdbError::InvalidMetadata(
                "metadata block is not a map".into(),
            ));
        };

        let mut binary_format_major_version = None;
        let mut binary_format_minor_version = 0u16;
        let mut ip_version = None;
        let mut record_size = None;
        let mut node_count = None;
        let mut database_type = String::new();
        let mut languages = Vec::new();
        let mut description = Vec::new();
        let mut build_epoch = 0u64;

        let mut cur = body;
        for _ in 0..count {
            let (key, next) = cur.decode()?;
            let key = expect_string(key, "metadata key")?;
            let (val, next) = next.decode()?;
            cur = next;

            match key {
                "binary_format_major_version" => {
                    binary_format_major_version = Some(expect_uint(val, "binary_format_major_version")?)
                }
                "binary_format_minor_version" => {
                    binary_format_minor_version = expect_uint(val, "binary_format_minor_version")? as u16
                }
                "ip_version" => ip_version = Some(expect_uint(val, "ip_version")?),
                "record_size" => record_size = Some(expect_uint(val, "record_size")?),
                "node_count" => node_count = Some(expect_uint(val, "node_count")? as u32),
                "database_type" => database_type = expect_string(val, "database_type")?.to_owned(),
                "languages" => languages = decode_string_array(val)?,
                "description" => description = decode_description_map(val)?,
                "build_epoch" => build_epoch = expect_uint(val, "build_epoch")?,
                _ => {}
            }
        }

        let binary_format_major_version = binary_format_major_version
            .ok_or_else(|| MmdbError::InvalidMetadata("missing binary_format_major_version".into()))?
            as u16;
        if binary_format_major_version != 2 {
            tracing::warn!(
                binary_format_major_version,
                "rejecting database with unsupported major version"
            );
            return Err(MmdbError::InvalidMetadata(format!(
                "unsupported binary_format_major_version {binary_format_major_version}, expected 2"
            )));
        }

        let ip_version = ip_version.ok_or_else(|| MmdbError::InvalidMetadata("missing ip_version".into()))? as u16;
        if ip_version != 4 && ip_version != 6 {
            tracing::warn!(ip_version, "rejecting database with invalid ip_version");
            return Err(MmdbError::InvalidMetadata(format!(
                "invalid ip_version {ip_version}, expected 4 or 6"
            )));
        }

        let record_size = record_size.ok_or_else(|| MmdbError::InvalidMetadata("missing record_size".into()))? as u16;
        if record_size != 24 && record_size != 28 && record_size != 32 {
            tracing::warn!(record_size, "rejecting database with invalid record_size");
            return Err(MmdbError::InvalidMetadata(format!(
                "invalid record_size {record_size}, expected 24, 28 or 32"
            )));
        }

        let node_count = node_count.ok_or_else(|| MmdbError::InvalidMetadata("missing node_count".into()))?;

        let tree_size_bytes = (node_count as usize)
            .checked_mul(record_size as usize * 2 / 8)
            .ok_or_else(|| MmdbError::InvalidMetadata("tree size overflow".into()))?;
        let data_section_start = tree_size_bytes
            .checked_add(16)
            .ok_or_else(|| MmdbError::InvalidMetadata("data section offset overflow".into()))?;

        if data_section_start > marker_pos {
            return Err(MmdbError::InvalidMetadata(format!(
                "derived data section start {data_section_start} extends past the metadata marker at {marker_pos}"
            )));
        }

        tracing::debug!(
            database_type = database_type.as_str(),
            ip_version,
            record_size,
            node_count,
            "parsed mmdb metadata"
        );

        Ok(Metadata {
            binary_format_major_version,
            binary_format_minor_version,
            ip_version,
            record_size,
            node_count,
            database_type,
            languages,
            description,
            build_epoch,
            tree_size_bytes,
            data_section_start,
        })
    }
}

fn expect_string<'d>(value: DecodedValue<'d>, what: &str) -> Result<&'d str> {
    match value {
        DecodedValue::Utf8String(s) => Ok(s),
        other => Err(MmdbError::InvalidMetadata(format!(
            "expected {what} to be a string, got {}",
            other.type_name()
        ))),
    }
}

fn expect_uint(value: DecodedValue<'_>, what: &str) -> Result<u64> {
    match value {
        DecodedValue::Uint16(v) => Ok(v as u64),
        DecodedValue::Uint32(v) => Ok(v as u64),
        DecodedValue::Uint64(v) => Ok(v),
        DecodedValue::Uint128 { hi, lo } if hi == 0 => Ok(lo),
        other => Err(MmdbError::InvalidMetadata(format!(
            "expected {what} to be an unsigned integer, got {}",
            other.type_name()
        ))),
    }
}

fn decode_string_array(value: DecodedValue<'_>) -> Result<Vec<String>> {
    let DecodedValue::Array { count, body } = value else {
        return Err(MmdbError::InvalidMetadata("expected an array".into()));
    };
    let mut out = Vec::with_capacity(count);
    let mut cur = body;
    for _ in 0..count {
        let (v, next) = cur.decode()?;
        out.push(expect_string(v, "array element")?.to_owned());
        cur = next;
    }
    Ok(out)
}

fn decode_description_map(value: DecodedValue<'_>) -> Result<Vec<(String, String)>> {
    let DecodedValue::Map { count, body } = value else {
        return Err(MmdbError::InvalidMetadata("expected description to be a map".into()));
    };
    let mut out = Vec::with_capacity(count);
    let mut cur = body;
    for _ in 0..count {
        let (key, next) = cur.decode()?;
        let key = expect_string(key, "description key")?.to_owned();
        let (val, next) = next.decode()?;
        cur = next;
        out.push((key, expect_string(val, "description value")?.to_owned()));
    }
    Ok(out)
}

/// Scan backward for the last occurrence of the marker, per spec §4.2:
/// "the marker may appear incidentally elsewhere; the last occurrence in
/// the file is authoritative."
fn find_marker(image: &[u8]) -> Result<usize> {
    if image.len() < MARKER.len() {
        return Err(MmdbError::InvalidMetadata("image too small to contain a marker".into()));
    }
    let window_start = image.len().saturating_sub(MAX_SCAN_WINDOW);
    let haystack = &image[window_start..];

    let mut found = None;
    let mut i = 0;
    while i + MARKER.len() <= haystack.len() {
        if &haystack[i..i + MARKER.len()] == MARKER {
            found = Some(window_start + i);
        }
        i += 1;
    }
    found.ok_or_else(|| MmdbError::InvalidMetadata("metadata marker not found".into()))
}
