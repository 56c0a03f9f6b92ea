//! Value decoder: decodes one self-describing value at a cursor.
//!
//! Mirrors the control-byte layout of the MaxMindDB data-section format.
//! Every read is bounds-checked against the backing image the way
//! `StringTableV2::from_bytes` checks `end > self.data.len()` before
//! slicing — a malformed database must produce an error, never a panic.
//!
//! ## Control byte
//!
//! ```text
//! bit:    7 6 5 4 3 2 1 0
//!         [ type  ][ size ]
//! ```
//!
//! `type` (top 3 bits) is 1-7 directly, or 0 to mean "read one more byte
//! and add 7" (an extended type, 8-15). `size` (bottom 5 bits) is a
//! length field for most types; for pointers it splits into a 2-bit size
//! selector and the top 3 bits of the pointer value.

use crate::error::{MmdbError, Result};

/// Type codes as they appear on the wire (after extended-type resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Pointer,
    Utf8String,
    Double,
    Bytes,
    Uint16,
    Uint32,
    Map,
    Int32,
    Uint64,
    Uint128,
    Array,
    Boolean,
    Float,
}

impl ValueType {
    fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            1 => ValueType::Pointer,
            2 => ValueType::Utf8String,
            3 => ValueType::Double,
            4 => ValueType::Bytes,
            5 => ValueType::Uint16,
            6 => ValueType::Uint32,
            7 => ValueType::Map,
            8 => ValueType::Int32,
            9 => ValueType::Uint64,
            10 => ValueType::Uint128,
            11 => ValueType::Array,
            14 => ValueType::Boolean,
            15 => ValueType::Float,
            other => {
                return Err(MmdbError::invalid_data(
                    0,
                    format!("unknown or reserved type tag {other}"),
                ))
            }
        })
    }
}

/// A decoded value, borrowing string/byte payloads from the database image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedValue<'d> {
    /// A pointer's resolved target: an offset into the data section.
    Pointer(usize),
    Utf8String(&'d str),
    Double(f64),
    Bytes(&'d [u8]),
    Uint16(u16),
    Uint32(u32),
    /// Map with `count` key/value pairs; `body` addresses the first key.
    Map { count: usize, body: Cursor<'d> },
    Int32(i32),
    Uint64(u64),
    /// 128-bit unsigned integer as two halves (`hi` most significant).
    Uint128 { hi: u64, lo: u64 },
    /// Array with `count` elements; `body` addresses the first element.
    Array { count: usize, body: Cursor<'d> },
    Boolean(bool),
    Float(f32),
}

impl<'d> DecodedValue<'d> {
    pub fn type_name(&self) -> &'static str {
        match self {
            DecodedValue::Pointer(_) => "pointer",
            DecodedValue::Utf8String(_) => "utf8_string",
            DecodedValue::Double(_) => "double",
            DecodedValue::Bytes(_) => "bytes",
            DecodedValue::Uint16(_) => "uint16",
            DecodedValue::Uint32(_) => "uint32",
            DecodedValue::Map { .. } => "map",
            DecodedValue::Int32(_) => "int32",
            DecodedValue::Uint64(_) => "uint64",
            DecodedValue::Uint128 { .. } => "uint128",
            DecodedValue::Array { .. } => "array",
            DecodedValue::Boolean(_) => "boolean",
            DecodedValue::Float(_) => "float",
        }
    }
}

/// A `(database image, data-section base, absolute offset)` triple.
///
/// Cheap to copy, never owns the image. `base` is the byte offset in
/// `data` that offset-0 of "the data section" refers to — normally
/// `data_section_start`, but the metadata parser reuses the same decoder
/// with `base` set to the start of the metadata block, exactly as spec
/// §4.2 calls for ("the metadata block itself serving as the data
/// section").
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'d> {
    data: &'d [u8],
    base: usize,
    offset: usize,
}

impl<'d> Cursor<'d> {
    /// Construct a cursor at a data-section-relative offset.
    pub fn at(data: &'d [u8], base: usize, rel_offset: usize) -> Self {
        Cursor {
            data,
            base,
            offset: base + rel_offset,
        }
    }

    /// Data-section-relative offset this cursor currently addresses.
    pub fn rel_offset(&self) -> usize {
        self.offset - self.base
    }

    fn check(&self, start: usize, len: usize) -> Result<()> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| MmdbError::invalid_data(start, "length overflow"))?;
        if end > self.data.len() {
            return Err(MmdbError::invalid_data(
                start,
                format!("need {len} bytes but image is only {} bytes", self.data.len()),
            ));
        }
        Ok(())
    }

    fn byte(&self, at: usize) -> Result<u8> {
        self.check(at, 1)?;
        Ok(self.data[at])
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'d [u8]> {
        self.check(start, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Decode the value at this cursor.
    ///
    /// Returns the decoded value and a cursor advanced past its control
    /// bytes and payload. For containers the returned cursor addresses
    /// the value itself (callers decode children starting from
    /// `DecodedValue::Map::body` / `Array::body`, not from this return).
    pub fn decode(&self) -> Result<(DecodedValue<'d>, Cursor<'d>)> {
        let control = self.byte(self.offset)?;
        let top3 = control >> 5;
        let low5 = control & 0x1F;

        let (type_code, header_len): (u8, usize) = if top3 == 0 {
            let ext = self.byte(self.offset + 1)?;
            (7u8.checked_add(ext).ok_or_else(|| {
                MmdbError::invalid_data(self.offset, "extended type byte overflow")
            })?, 2)
        } else {
            (top3, 1)
        };

        if type_code == 1 {
            return self.decode_pointer(low5, header_len);
        }

        let vtype = ValueType::from_code(type_code)
            .map_err(|_| MmdbError::invalid_data(self.offset, format!("unknown type tag {type_code}")))?;

        let (length, length_bytes) = self.decode_length(low5, self.offset + header_len)?;
        let payload_start = self.offset + header_len + length_bytes;

        match vtype {
            ValueType::Map => {
                let body = Cursor {
                    data: self.data,
                    base: self.base,
                    offset: payload_start,
                };
                Ok((
                    DecodedValue::Map { count: length, body },
                    self.advance_to(payload_start),
                ))
            }
            ValueType::Array => {
                let body = Cursor {
                    data: self.data,
                    base: self.base,
                    offset: payload_start,
                };
                Ok((
                    DecodedValue::Array { count: length, body },
                    self.advance_to(payload_start),
                ))
            }
            ValueType::Boolean => Ok((
                DecodedValue::Boolean(length != 0),
                self.advance_to(payload_start),
            )),
            ValueType::Utf8String => {
                let bytes = self.slice(payload_start, length)?;
                let s = std::str::from_utf8(bytes).map_err(|e| {
                    MmdbError::invalid_data(payload_start, format!("invalid UTF-8: {e}"))
                })?;
                Ok((
                    DecodedValue::Utf8String(s),
                    self.advance_to(payload_start + length),
                ))
            }
            ValueType::Bytes => {
                let bytes = self.slice(payload_start, length)?;
                Ok((
                    DecodedValue::Bytes(bytes),
                    self.advance_to(payload_start + length),
                ))
            }
            ValueType::Double => {
                if length != 8 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("double value must be 8 bytes, got {length}"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = f64::from_be_bytes(bytes.try_into().unwrap());
                Ok((DecodedValue::Double(v), self.advance_to(payload_start + length)))
            }
            ValueType::Float => {
                if length != 4 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("float value must be 4 bytes, got {length}"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = f32::from_be_bytes(bytes.try_into().unwrap());
                Ok((DecodedValue::Float(v), self.advance_to(payload_start + length)))
            }
            ValueType::Uint16 => {
                if length > 2 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("uint16 payload too long: {length} bytes"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = read_uint_be(bytes) as u16;
                Ok((DecodedValue::Uint16(v), self.advance_to(payload_start + length)))
            }
            ValueType::Uint32 => {
                if length > 4 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("uint32 payload too long: {length} bytes"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = read_uint_be(bytes) as u32;
                Ok((DecodedValue::Uint32(v), self.advance_to(payload_start + length)))
            }
            ValueType::Int32 => {
                if length > 4 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("int32 payload too long: {length} bytes"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = read_uint_be(bytes) as u32 as i32;
                Ok((DecodedValue::Int32(v), self.advance_to(payload_start + length)))
            }
            ValueType::Uint64 => {
                if length > 8 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("uint64 payload too long: {length} bytes"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = read_uint_be(bytes) as u64;
                Ok((DecodedValue::Uint64(v), self.advance_to(payload_start + length)))
            }
            ValueType::Uint128 => {
                if length > 16 {
                    return Err(MmdbError::invalid_data(
                        payload_start,
                        format!("uint128 payload too long: {length} bytes"),
                    ));
                }
                let bytes = self.slice(payload_start, length)?;
                let v = read_uint_be(bytes);
                let hi = (v >> 64) as u64;
                let lo = v as u64;
                Ok((DecodedValue::Uint128 { hi, lo }, self.advance_to(payload_start + length)))
            }
            ValueType::Pointer => unreachable!("handled above"),
        }
    }

    fn advance_to(&self, offset: usize) -> Cursor<'d> {
        Cursor {
            data: self.data,
            base: self.base,
            offset,
        }
    }

    /// Non-pointer length field: 0-28 direct, 29/30/31 extend with 1/2/3
    /// more bytes added to a type-dependent bias (spec §3.1).
    fn decode_length(&self, low5: u8, pos: usize) -> Result<(usize, usize)> {
        match low5 {
            0..=28 => Ok((low5 as usize, 0)),
            29 => {
                let b = self.byte(pos)?;
                Ok((29 + b as usize, 1))
            }
            30 => {
                let bytes = self.slice(pos, 2)?;
                let extra = u16::from_be_bytes(bytes.try_into().unwrap()) as usize;
                Ok((285 + extra, 2))
            }
            31 => {
                let bytes = self.slice(pos, 3)?;
                let extra = read_uint_be(bytes) as usize;
                Ok((65821 + extra, 3))
            }
            _ => unreachable!("low5 is a 5-bit field"),
        }
    }

    /// Decode a pointer control byte: 2-bit size selector + 3-bit high
    /// bits of the target, then 1-4 payload bytes, per spec §3.1.
    fn decode_pointer(&self, low5: u8, header_len: usize) -> Result<(DecodedValue<'d>, Cursor<'d>)> {
        let size_sel = (low5 >> 3) & 0x3;
        let high3 = (low5 & 0x7) as u32;
        let payload_start = self.offset + header_len;

        let (target, consumed): (u32, usize) = match size_sel {
            0 => {
                let b = self.byte(payload_start)? as u32;
                ((high3 << 8) | b, 1)
            }
            1 => {
                let bytes = self.slice(payload_start, 2)?;
                let v = u16::from_be_bytes(bytes.try_into().unwrap()) as u32;
                ((high3 << 16) | v, 2)
            }
            2 => {
                let bytes = self.slice(payload_start, 3)?;
                let v = read_uint_be(bytes) as u32;
                ((high3 << 24) | v, 3)
            }
            3 => {
                let bytes = self.slice(payload_start, 4)?;
                (u32::from_be_bytes(bytes.try_into().unwrap()), 4)
            }
            _ => unreachable!("2-bit field"),
        };

        let bias: u32 = match size_sel {
            0 => 0,
            1 => 2048,
            2 => 526_336,
            3 => 0,
            _ => unreachable!(),
        };

        let data_offset = (target + bias) as usize;
        Ok((
            DecodedValue::Pointer(data_offset),
            self.advance_to(payload_start + consumed),
        ))
    }

    /// Decode at this cursor; if the result is a pointer, dereference it
    /// exactly once and decode the target instead. A pointer whose
    /// target is itself a pointer is an error (spec §3.1/§9: pointers
    /// never form chains the decoder follows).
    ///
    /// The returned cursor always addresses the byte position past
    /// *this* field's own encoding (the pointer's bytes, not the
    /// target's) — callers walking a map or array sequentially resume
    /// from there, the same way they would for any other field.
    pub fn decode_follow(&self) -> Result<(DecodedValue<'d>, Cursor<'d>)> {
        let (value, own_next) = self.decode()?;
        match value {
            DecodedValue::Pointer(target) => {
                let target_cursor = Cursor {
                    data: self.data,
                    base: self.base,
                    offset: self.base + target,
                };
                let (inner, _) = target_cursor.decode()?;
                if matches!(inner, DecodedValue::Pointer(_)) {
                    return Err(MmdbError::invalid_data(
                        target_cursor.offset,
                        "pointer target is itself a pointer",
                    ));
                }
                Ok((inner, own_next))
            }
            other => Ok((other, own_next)),
        }
    }

    /// A lazy depth-first sequence of every value reachable from this
    /// cursor — the container itself, then each of its children in turn,
    /// descending into nested maps/arrays as they're reached. Pointers
    /// are followed transparently at each step, the same as [`decode`]
    /// and [`decode_follow`].
    ///
    /// [`decode`]: Cursor::decode
    /// [`decode_follow`]: Cursor::decode_follow
    pub fn iterate(&self) -> ValueIter<'d> {
        ValueIter {
            stack: vec![(*self, 0)],
        }
    }
}

/// Lazy iterator over a value tree, yielding `(depth, value)` pairs in
/// depth-first order. Depth 0 is the cursor `iterate()` was called on.
///
/// Unlike [`walk_all`](crate::mmdb::walker::walk_all), this yields
/// containers themselves (not just their scalar leaves) and performs no
/// cycle detection — callers that need a cycle-safe full-record
/// materialization should use the walker instead.
pub struct ValueIter<'d> {
    stack: Vec<(Cursor<'d>, usize)>,
}

impl<'d> Iterator for ValueIter<'d> {
    type Item = Result<(usize, DecodedValue<'d>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (cursor, depth) = self.stack.pop()?;
        match cursor.decode_follow() {
            Ok((value, _next)) => {
                match &value {
                    DecodedValue::Map { count, body } => {
                        if let Err(e) = self.push_map_children(*count, *body, depth + 1) {
                            return Some(Err(e));
                        }
                    }
                    DecodedValue::Array { count, body } => {
                        if let Err(e) = self.push_array_children(*count, *body, depth + 1) {
                            return Some(Err(e));
                        }
                    }
                    _ => {}
                }
                Some(Ok((depth, value)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'d> ValueIter<'d> {
    fn push_map_children(&mut self, count: usize, body: Cursor<'d>, depth: usize) -> Result<()> {
        let mut cur = body;
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            let (_, after_key) = cur.decode_follow()?;
            let (_, after_val) = after_key.decode_follow()?;
            children.push((after_key, depth));
            cur = after_val;
        }
        self.stack.extend(children.into_iter().rev());
        Ok(())
    }

    fn push_array_children(&mut self, count: usize, body: Cursor<'d>, depth: usize) -> Result<()> {
        let mut cur = body;
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            let (_, after) = cur.decode_follow()?;
            children.push((cur, depth));
            cur = after;
        }
        self.stack.extend(children.into_iter().rev());
        Ok(())
    }
}

/// Fold up to 16 big-endian bytes into a u128 (used for all fixed-width
/// integer types, whose encoded length may be shorter than the native
/// width when leading zero bytes were dropped by the writer).
fn read_uint_be(bytes: &[u8]) -> u128 {
    let mut v: u128 = 0;
    for &b in bytes {
        v = (v << 8) | b as u128;
    }
    v
}
