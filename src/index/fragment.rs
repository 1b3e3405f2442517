//! Fragment Types
//!
//! Compact, copyable records describing one top-level unit (or one slice of
//! an oversized unit) as a byte range of the original file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Flags for Fragment
pub mod fragment_flags {
    /// Slice of a unit that was split because it exceeded the size threshold,
    /// other than the first slice
    pub const CONTINUATION: u8 = 0x01;
}

/// Sentinel parent for units that hang directly off the document root
pub const NO_PARENT: u32 = u32::MAX;

/// Index entry for one unit
///
/// Size: 40 bytes. Millions of these are expected for 100GB+ inputs, so names
/// are interned (`tag_id`) rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    /// Dense position in the index (also the unit id)
    pub index: u32,
    /// Byte offset of the first byte (the `<`)
    pub start: u64,
    /// Byte offset one past the last byte
    pub end: u64,
    /// 1-based line of `start`
    pub start_line: u32,
    /// 1-based line of the last byte
    pub end_line: u32,
    /// Parent fragment index (NO_PARENT for root children)
    pub parent: u32,
    /// Interned element name
    pub tag_id: u32,
    /// Depth in document tree (1 = child of the root element)
    pub depth: u16,
    /// Flags (see fragment_flags)
    pub flags: u8,
}

impl Fragment {
    /// Byte length of the fragment
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Check if this slice continues a unit started by an earlier fragment
    #[inline]
    pub const fn is_continuation(&self) -> bool {
        self.flags & fragment_flags::CONTINUATION != 0
    }

    /// Check if `offset` falls inside `[start, end)`
    #[inline]
    pub const fn contains_offset(&self, offset: u64) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check if `[start, end)` lies entirely inside this fragment
    #[inline]
    pub const fn covers(&self, start: u64, end: u64) -> bool {
        self.start <= start && end <= self.end
    }

    #[inline]
    pub const fn id(&self) -> UnitId {
        UnitId(self.index)
    }
}

/// Validation state that may be attached to a fragment after indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum FragmentStatus {
    #[default]
    Unknown = 0,
    Valid = 1,
    Invalid = 2,
    Malformed = 3,
}

impl FragmentStatus {
    #[inline]
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => FragmentStatus::Valid,
            2 => FragmentStatus::Invalid,
            3 => FragmentStatus::Malformed,
            _ => FragmentStatus::Unknown,
        }
    }
}

/// Stable unit identifier, rendered as `frag_<index>`
///
/// Only meaningful for the index build that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl UnitId {
    const PREFIX: &'static str = "frag_";

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for UnitId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(Self::PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .map(UnitId)
            .ok_or_else(|| format!("not a unit id: {s:?}"))
    }
}

impl Serialize for UnitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UnitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(start: u64, end: u64, flags: u8) -> Fragment {
        Fragment {
            index: 0,
            start,
            end,
            start_line: 1,
            end_line: 1,
            parent: NO_PARENT,
            tag_id: 1,
            depth: 1,
            flags,
        }
    }

    #[test]
    fn test_fragment_size() {
        let size = std::mem::size_of::<Fragment>();
        assert!(size <= 40, "Fragment too large: {} bytes", size);
    }

    #[test]
    fn test_contains_offset_half_open() {
        let frag = fragment(10, 20, 0);
        assert!(frag.contains_offset(10));
        assert!(frag.contains_offset(19));
        assert!(!frag.contains_offset(20));
        assert_eq!(frag.len(), 10);
    }

    #[test]
    fn test_continuation_flag() {
        assert!(!fragment(0, 1, 0).is_continuation());
        assert!(fragment(0, 1, fragment_flags::CONTINUATION).is_continuation());
    }

    #[test]
    fn test_unit_id_round_trip() {
        let id: UnitId = "frag_42".parse().unwrap();
        assert_eq!(id, UnitId(42));
        assert_eq!(id.to_string(), "frag_42");
        assert!("frag_x".parse::<UnitId>().is_err());
        assert!("42".parse::<UnitId>().is_err());
    }

    #[test]
    fn test_status_from_raw() {
        assert_eq!(FragmentStatus::from_u8(3), FragmentStatus::Malformed);
        assert_eq!(FragmentStatus::from_u8(200), FragmentStatus::Unknown);
    }
}
