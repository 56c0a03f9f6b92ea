//! Address canonicalization: text or `IpAddr` to the 128-bit form the
//! tree walker consumes, plus the bit-range to walk for the database's
//! `ip_version` (spec §4.5/§4.6 and the v4-in-v6 zero-padding rule).

use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{MmdbError, Result};

/// A canonicalized address plus the bit range a tree walk should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalAddress {
    /// Always the full 128-bit form; IPv4 addresses are zero-padded into
    /// the low 32 bits.
    pub bits: u128,
    /// Index (from 0, MSB) of the first bit the tree walk consumes.
    pub start_bit: u32,
    /// Number of bits to walk.
    pub bit_count: u32,
}

/// Parse a textual IP address and resolve it against a database's
/// `ip_version`, per spec §4.5.
///
/// An IPv6 database accepts both IPv4 and IPv6 text: IPv4 is zero-prefixed
/// into the low 32 bits of the 128-bit address space (spec §6, "v4
/// addresses are zero-prefixed to 128 bits with the v4 bytes in the low
/// 32") and the walk covers the full 128 bits from bit 127, exactly like
/// a native IPv6 address — the reserved `::/96` prefix is walked like any
/// other tree path. Only an IPv4-only database (`ip_version == 4`) gets
/// the 32-step shortcut starting at bit 31. An IPv4-only database rejects
/// IPv6 text.
pub fn canonicalize(text: &str, ip_version: u16) -> Result<CanonicalAddress> {
    let addr = IpAddr::from_str(text)
        .map_err(|e| MmdbError::InvalidLookupPath(format!("'{text}' is not a valid IP address: {e}")))?;

    match (addr, ip_version) {
        (IpAddr::V4(v4), 4) => Ok(CanonicalAddress {
            bits: u32::from(v4) as u128,
            start_bit: 31,
            bit_count: 32,
        }),
        (IpAddr::V4(v4), 6) => Ok(CanonicalAddress {
            bits: u32::from(v4) as u128,
            start_bit: 127,
            bit_count: 128,
        }),
        (IpAddr::V4(_), other) => Err(MmdbError::InvalidMetadata(format!(
            "unsupported ip_version {other}"
        ))),
        (IpAddr::V6(v6), 6) => Ok(CanonicalAddress {
            bits: u128::from(v6),
            start_bit: 127,
            bit_count: 128,
        }),
        (IpAddr::V6(_), 4) => Err(MmdbError::Ipv6InIpv4Database),
        (IpAddr::V6(_), other) => Err(MmdbError::InvalidMetadata(format!(
            "unsupported ip_version {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_v4_in_v6_database() {
        let addr = canonicalize("1.2.3.4", 6).unwrap();
        assert_eq!(addr.bits, u32::from_be_bytes([1, 2, 3, 4]) as u128);
        assert_eq!(addr.start_bit, 127);
        assert_eq!(addr.bit_count, 128);
    }

    #[test]
    fn test_canonicalize_v4_in_v4_database() {
        let addr = canonicalize("10.0.0.1", 4).unwrap();
        assert_eq!(addr.bit_count, 32);
    }

    #[test]
    fn test_canonicalize_v6_in_v6_database() {
        let addr = canonicalize("::1", 6).unwrap();
        assert_eq!(addr.bits, 1u128);
        assert_eq!(addr.start_bit, 127);
        assert_eq!(addr.bit_count, 128);
    }

    #[test]
    fn test_canonicalize_v6_in_v4_database_errors() {
        let err = canonicalize("::1", 4).unwrap_err();
        assert!(matches!(err, MmdbError::Ipv6InIpv4Database));
    }

    #[test]
    fn test_canonicalize_invalid_text() {
        let err = canonicalize("not-an-ip", 6).unwrap_err();
        assert!(matches!(err, MmdbError::InvalidLookupPath(_)));
    }
}
