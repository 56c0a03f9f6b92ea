//! Synthetic `.mmdb` image builder, for tests and benchmarks only.
//!
//! No real GeoIP-format fixtures exist in this environment, so tests
//! exercise the reader against hand-built databases assembled here
//! instead. This mirrors the value encodings the decoder consumes
//! (spec §3.1) without depending on any external database writer —
//! deliberately separate from the library crate, which has no
//! construction or mutation surface by design.

use std::net::IpAddr;
use std::str::FromStr;

const MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// A value to place in the data section, built up with the helpers
/// below (`str_val`, `uint32_val`, `map_val`, ...).
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Uint32(u32),
    Bool(bool),
    Map(Vec<(String, Value)>),
    Array(Vec<Value>),
}

pub fn str_val(s: &str) -> Value {
    Value::Str(s.to_string())
}

pub fn uint32_val(v: u32) -> Value {
    Value::Uint32(v)
}

pub fn bool_val(v: bool) -> Value {
    Value::Bool(v)
}

pub fn map_val(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

pub fn array_val(items: Vec<Value>) -> Value {
    Value::Array(items)
}

fn encode_length(type_top3: u8, length: usize, out: &mut Vec<u8>) {
    if length <= 28 {
        out.push((type_top3 << 5) | length as u8);
    } else if length <= 285 {
        out.push((type_top3 << 5) | 29);
        out.push((length - 29) as u8);
    } else {
        out.push((type_top3 << 5) | 30);
        out.extend_from_slice(&((length - 285) as u16).to_be_bytes());
    }
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Str(s) => {
            encode_length(2, s.len(), out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Uint32(v) => {
            let bytes = v.to_be_bytes();
            let mut skip = 0;
            while skip < 3 && bytes[skip] == 0 {
                skip += 1;
            }
            encode_length(6, bytes.len() - skip, out);
            out.extend_from_slice(&bytes[skip..]);
        }
        Value::Bool(v) => {
            // boolean: extended type 14 = 7 + 7, value lives in the length field
            out.push(if *v { 1 } else { 0 });
            out.push(7);
        }
        Value::Map(pairs) => {
            encode_length(7, pairs.len(), out);
            for (k, v) in pairs {
                encode_value(&Value::Str(k.clone()), out);
                encode_value(v, out);
            }
        }
        Value::Array(items) => {
            // array is extended type 11 = 7 + 4: top3=0, ext byte=4, length in low5 of control byte
            let control_byte_pos = out.len();
            out.push(0); // placeholder, patched below
            out.push(4);
            encode_array_length(items.len(), control_byte_pos, out);
            for item in items {
                encode_value(item, out);
            }
        }
    }
}

fn encode_array_length(length: usize, control_byte_pos: usize, out: &mut Vec<u8>) {
    assert!(length <= 28, "synthetic builder only supports small arrays");
    out[control_byte_pos] = length as u8;
}

#[derive(Debug, Clone)]
enum Link {
    Empty,
    Child(u32),
    Leaf(usize),
}

struct Node {
    left: Link,
    right: Link,
}

/// Builds a synthetic MaxMindDB-format image one network at a time.
pub struct DatabaseBuilder {
    nodes: Vec<Node>,
    data: Vec<u8>,
    ip_version: u16,
    record_size: u16,
    database_type: String,
}

impl DatabaseBuilder {
    pub fn new(ip_version: u16) -> Self {
        DatabaseBuilder {
            nodes: vec![Node {
                left: Link::Empty,
                right: Link::Empty,
            }],
            data: Vec::new(),
            ip_version,
            record_size: 24,
            database_type: "test-db".to_string(),
        }
    }

    pub fn with_record_size(mut self, record_size: u16) -> Self {
        self.record_size = record_size;
        self
    }

    /// Insert a value at `network` (CIDR text, e.g. "1.2.3.0/24" or
    /// "2001:db8::/32"). Matches [`crate::mmdb::address::canonicalize`]:
    /// an IPv4 network walks the low 32 bits starting at bit 31 in an
    /// IPv4-only (`ip_version == 4`) builder, but is zero-padded into the
    /// low 32 bits of the full 128-bit space and walked from bit 127 —
    /// the reserved `::/96` prefix included — in an IPv6-mode builder,
    /// exactly like a native IPv6 network.
    pub fn insert(&mut self, network: &str, value: Value) -> &mut Self {
        let (addr_text, cidr_prefix_len) = network.split_once('/').expect("network must be CIDR");
        let cidr_prefix_len: u32 = cidr_prefix_len.parse().expect("prefix length must be numeric");
        let addr = IpAddr::from_str(addr_text).expect("invalid address");

        let (bits, start_bit, prefix_len): (u128, u32, u32) = match addr {
            IpAddr::V4(v4) if self.ip_version == 6 => {
                (u32::from(v4) as u128, 127, 96 + cidr_prefix_len)
            }
            IpAddr::V4(v4) => (u32::from(v4) as u128, 31, cidr_prefix_len),
            IpAddr::V6(v6) => (u128::from(v6), 127, cidr_prefix_len),
        };

        let offset = self.data.len();
        encode_value(&value, &mut self.data);

        let mut node_idx = 0u32;
        for step in 0..prefix_len {
            let bit_index = start_bit - step;
            let bit = (bits >> bit_index) & 1;
            let is_last = step + 1 == prefix_len;

            if is_last {
                self.set_child(node_idx, bit, Link::Leaf(offset));
            } else {
                node_idx = self.descend_or_create(node_idx, bit);
            }
        }
        self
    }

    fn set_child(&mut self, node_idx: u32, bit: u128, link: Link) {
        let node = &mut self.nodes[node_idx as usize];
        if bit == 1 {
            node.right = link;
        } else {
            node.left = link;
        }
    }

    fn descend_or_create(&mut self, node_idx: u32, bit: u128) -> u32 {
        let current = if bit == 1 {
            self.nodes[node_idx as usize].right.clone()
        } else {
            self.nodes[node_idx as usize].left.clone()
        };
        match current {
            Link::Child(idx) => idx,
            Link::Empty => {
                let new_idx = self.nodes.len() as u32;
                self.nodes.push(Node {
                    left: Link::Empty,
                    right: Link::Empty,
                });
                self.set_child(node_idx, bit, Link::Child(new_idx));
                new_idx
            }
            // Splitting an existing leaf: both children of the new node
            // inherit the old (broader) value, so addresses that don't
            // follow the more specific insert still resolve to it.
            Link::Leaf(offset) => {
                let new_idx = self.nodes.len() as u32;
                self.nodes.push(Node {
                    left: Link::Leaf(offset),
                    right: Link::Leaf(offset),
                });
                self.set_child(node_idx, bit, Link::Child(new_idx));
                new_idx
            }
        }
    }

    /// Serialize the tree, data section and metadata block into a
    /// complete database image.
    pub fn build(&self) -> Vec<u8> {
        let node_count = self.nodes.len() as u32;
        let mut tree = Vec::with_capacity(self.nodes.len() * (self.record_size as usize * 2 / 8));

        for node in &self.nodes {
            let left = self.resolve(&node.left, node_count);
            let right = self.resolve(&node.right, node_count);
            self.write_node(left, right, &mut tree);
        }

        let mut image = tree;
        image.extend_from_slice(&[0u8; 16]);
        image.extend_from_slice(&self.data);
        image.extend_from_slice(MARKER);

        let metadata = self.encode_metadata(node_count);
        image.extend_from_slice(&metadata);
        image
    }

    fn resolve(&self, link: &Link, node_count: u32) -> u32 {
        match link {
            Link::Empty => node_count,
            Link::Child(idx) => *idx,
            Link::Leaf(offset) => node_count + 16 + *offset as u32,
        }
    }

    fn write_node(&self, left: u32, right: u32, out: &mut Vec<u8>) {
        match self.record_size {
            24 => {
                out.extend_from_slice(&left.to_be_bytes()[1..]);
                out.extend_from_slice(&right.to_be_bytes()[1..]);
            }
            28 => {
                out.extend_from_slice(&left.to_be_bytes()[1..]);
                let middle = (((left >> 20) & 0xF0) as u8) | (((right >> 24) & 0x0F) as u8);
                out.push(middle);
                out.extend_from_slice(&right.to_be_bytes()[1..]);
            }
            32 => {
                out.extend_from_slice(&left.to_be_bytes());
                out.extend_from_slice(&right.to_be_bytes());
            }
            other => panic!("unsupported record_size {other}"),
        }
    }

    fn encode_metadata(&self, node_count: u32) -> Vec<u8> {
        let fields = vec![
            ("binary_format_major_version".to_string(), Value::Uint32(2)),
            ("binary_format_minor_version".to_string(), Value::Uint32(0)),
            ("ip_version".to_string(), Value::Uint32(self.ip_version as u32)),
            ("record_size".to_string(), Value::Uint32(self.record_size as u32)),
            ("node_count".to_string(), Value::Uint32(node_count)),
            ("database_type".to_string(), Value::Str(self.database_type.clone())),
            ("languages".to_string(), Value::Array(vec![Value::Str("en".to_string())])),
            ("build_epoch".to_string(), Value::Uint32(1_700_000_000)),
        ];
        let mut out = Vec::new();
        encode_value(&Value::Map(fields), &mut out);
        out
    }
}
