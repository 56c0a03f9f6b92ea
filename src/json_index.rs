//! Core B: single-pass JSON structural indexer.
//!
//! A direct descendant of `js0n` — one pass over the input bytes, one
//! byte of look-behind state, no recursion and no intermediate tree.
//! Where the original dispatches through per-state jump tables built
//! from GNU range initializers, this walks the same state graph with
//! `match` over byte ranges; the states and their transitions are
//! otherwise unchanged.
//!
//! Only the *immediate children* of a top-level object or array are
//! indexed — exactly as in the original, the push/capture macros are
//! gated on `depth == 1`. A document that is a bare top-level scalar
//! (no enclosing `{}` or `[]`) never reaches depth 1 and yields no
//! tokens; that is the documented behavior, not a bug.

use crate::error::JsonIndexError;

/// One indexed span: a key, a bare value, a quoted string's content, or
/// an entire nested object/array treated opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the span's first byte.
    pub start: usize,
    /// Span length in bytes.
    pub len: usize,
}

impl Token {
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start..self.start + self.len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Struct,
    Bare,
    Str,
    Esc,
    Utf8Continue(u8),
}

/// Status of a fixed-capacity scan via [`json_index_into`], mirroring the
/// original `js0n`'s overloaded `int` return (`0` / `depth` /
/// `cur-js+1`) as a tagged enum instead of a magic-number code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The document was fully balanced; `token_count` spans were written.
    Ok { token_count: usize },
    /// The scan ended (ran out of input, or out of output capacity)
    /// while still this many levels of `{}`/`[]` deep.
    Truncated { remaining_depth: u32 },
    /// The byte at this offset cannot appear in the current state.
    Invalid { offset: usize },
}

/// Index the immediate children of a top-level JSON object or array,
/// allocating its own output vector.
///
/// Returns `Ok(tokens)` on a fully balanced document. Returns
/// `Err(Truncated(depth))` if the scan ran out of input while still
/// `depth` levels of `{}`/`[]` deep. Returns `Err(InvalidByte(offset))`
/// at the first byte that cannot appear in the current state.
pub fn index_json(input: &[u8]) -> Result<Vec<(u32, u32)>, JsonIndexError> {
    let tokens = scan(input, usize::MAX)?;
    Ok(tokens.into_iter().map(|t| (t.start as u32, t.len as u32)).collect())
}

/// Index into a fixed-capacity caller-supplied buffer, the literal
/// shape of the original `js0n(js, len, out, olen)` signature: `out` is
/// a flat array of alternating `(offset, length)` values, and the scan
/// halts as soon as `out` is full regardless of how much input remains.
pub fn json_index_into(input: &[u8], out: &mut [u32]) -> IndexStatus {
    let max_tokens = out.len() / 2;
    match scan(input, max_tokens) {
        Ok(tokens) => {
            for (i, token) in tokens.iter().enumerate() {
                out[i * 2] = token.start as u32;
                out[i * 2 + 1] = token.len as u32;
            }
            IndexStatus::Ok {
                token_count: tokens.len(),
            }
        }
        Err(JsonIndexError::Truncated(depth)) => IndexStatus::Truncated { remaining_depth: depth },
        Err(JsonIndexError::InvalidByte(offset)) => IndexStatus::Invalid { offset },
    }
}

/// Scanning stops as soon as `max_tokens` spans have been recorded, the
/// same way the original caller-supplied output buffer bounds the scan
/// — once full, the pass halts regardless of how much input remains.
fn scan(input: &[u8], max_tokens: usize) -> Result<Vec<Token>, JsonIndexError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth: i64 = 0;
    let mut open_start: Option<usize> = None;
    let mut state = State::Struct;

    let mut i = 0usize;
    while i < input.len() && tokens.len() < max_tokens {
        let b = input[i];
        let mut advance = true;

        match state {
            State::Struct => match b {
                b'\t' | b' ' | b'\r' | b'\n' | b':' | b',' => {}
                b'"' => {
                    push(&mut open_start, depth, i + 1);
                    state = State::Str;
                }
                b'[' | b'{' => {
                    push(&mut open_start, depth, i);
                    depth += 1;
                }
                b']' | b'}' => {
                    if depth == 0 {
                        return Err(JsonIndexError::InvalidByte(i));
                    }
                    depth -= 1;
                    cap_inclusive(&mut tokens, &mut open_start, depth, i);
                }
                b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                    push(&mut open_start, depth, i);
                    state = State::Bare;
                }
                _ => return Err(JsonIndexError::InvalidByte(i)),
            },
            State::Bare => match b {
                b'\t' | b' ' | b'\r' | b'\n' | b',' | b']' | b'}' => {
                    cap_exclusive(&mut tokens, &mut open_start, depth, i);
                    state = State::Struct;
                    advance = false;
                }
                32..=126 => {}
                _ => return Err(JsonIndexError::InvalidByte(i)),
            },
            State::Str => match b {
                b'\\' => state = State::Esc,
                b'"' => {
                    cap_exclusive(&mut tokens, &mut open_start, depth, i);
                    state = State::Struct;
                }
                32..=127 => {}
                0xC0..=0xDF => state = State::Utf8Continue(1),
                0xE0..=0xEF => state = State::Utf8Continue(2),
                0xF0..=0xF7 => state = State::Utf8Continue(3),
                _ => return Err(JsonIndexError::InvalidByte(i)),
            },
            State::Esc => match b {
                b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' | b'u' => state = State::Str,
                _ => return Err(JsonIndexError::InvalidByte(i)),
            },
            State::Utf8Continue(remain) => match b {
                0x80..=0xBF => {
                    if remain == 1 {
                        state = State::Str;
                    } else {
                        state = State::Utf8Continue(remain - 1);
                    }
                }
                _ => return Err(JsonIndexError::InvalidByte(i)),
            },
        }

        if advance {
            i += 1;
        }
    }

    if depth != 0 || open_start.is_some() {
        return Err(JsonIndexError::Truncated(depth.unsigned_abs() as u32));
    }

    Ok(tokens)
}

/// PUSH: record the start of a depth-1 span, reserving its slot.
fn push(open_start: &mut Option<usize>, depth: i64, start: usize) {
    if depth == 1 {
        *open_start = Some(start);
    }
}

/// CAP for spans whose closing byte is itself part of the span (object
/// and array spans, which include the closing bracket).
fn cap_inclusive(tokens: &mut Vec<Token>, open_start: &mut Option<usize>, depth: i64, close_at: usize) {
    if depth == 1 {
        if let Some(start) = open_start.take() {
            tokens.push(Token {
                start,
                len: close_at - start + 1,
            });
        }
    }
}

/// CAP for spans whose closing byte is excluded (quoted strings end
/// before the closing quote; bare tokens end before the delimiter).
fn cap_exclusive(tokens: &mut Vec<Token>, open_start: &mut Option<usize>, depth: i64, close_at: usize) {
    if depth == 1 {
        if let Some(start) = open_start.take() {
            tokens.push(Token {
                start,
                len: close_at - start,
            });
        }
    }
}
