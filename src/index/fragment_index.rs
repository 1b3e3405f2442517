//! Fragment Index - Main index structure
//!
//! Ordered list of top-level units as byte ranges of the original file, plus
//! the name pool. Fragments are appended by the indexer in document order, so
//! the list is sorted by `start` and non-overlapping by construction; lookups
//! by offset or line are binary searches.
//!
//! Memory: 40 bytes per fragment + 1 status byte + distinct names.

use std::sync::atomic::{AtomicU8, Ordering};

use super::fragment::{Fragment, FragmentStatus, UnitId, NO_PARENT};
use super::strings::StringPool;

/// Index of the top-level units of one document
#[derive(Debug, Default)]
pub struct FragmentIndex {
    /// Fragments in document order (index = unit id)
    fragments: Vec<Fragment>,
    /// Validation status per fragment, settable through a shared reference
    statuses: Vec<AtomicU8>,
    /// Unit names
    strings: StringPool,
}

impl FragmentIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            fragments: Vec::with_capacity(1024),
            statuses: Vec::with_capacity(1024),
            strings: StringPool::new(),
        }
    }

    /// Append a fragment. Must be called in document order.
    pub(crate) fn push(
        &mut self,
        name: &[u8],
        start: u64,
        end: u64,
        lines: (u32, u32),
        depth: u16,
        flags: u8,
    ) -> u32 {
        debug_assert!(start <= end);
        debug_assert!(self.fragments.last().map_or(true, |last| last.end <= start));

        let tag_id = self.strings.intern(name);
        let index = self.fragments.len() as u32;
        self.fragments.push(Fragment {
            index,
            start,
            end,
            start_line: lines.0,
            end_line: lines.1,
            parent: NO_PARENT,
            tag_id,
            depth,
            flags,
        });
        self.statuses.push(AtomicU8::new(FragmentStatus::Unknown as u8));
        index
    }

    /// Release over-allocated capacity after a build
    pub(crate) fn shrink_to_fit(&mut self) {
        self.fragments.shrink_to_fit();
        self.statuses.shrink_to_fit();
    }

    /// Number of fragments
    #[inline]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// All fragments in document order
    #[inline]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Iterate over fragments
    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.fragments.iter()
    }

    /// Get a fragment by dense index
    #[inline]
    pub fn fragment(&self, index: u32) -> Option<&Fragment> {
        self.fragments.get(index as usize)
    }

    /// Get a fragment by unit id
    #[inline]
    pub fn get(&self, id: UnitId) -> Option<&Fragment> {
        self.fragment(id.index())
    }

    /// Get a fragment by its textual id (`frag_<n>`)
    pub fn fragment_by_id(&self, id: &str) -> Option<&Fragment> {
        self.get(id.parse().ok()?)
    }

    /// Find the fragment containing a byte offset - O(log n)
    pub fn fragment_at_offset(&self, offset: u64) -> Option<&Fragment> {
        let idx = self.fragments.partition_point(|f| f.end <= offset);
        self.fragments
            .get(idx)
            .filter(|f| f.contains_offset(offset))
    }

    /// Find the first fragment whose line span contains `line` - O(log n)
    pub fn fragment_at_line(&self, line: u32) -> Option<&Fragment> {
        let idx = self.fragments.partition_point(|f| f.end_line < line);
        self.fragments
            .get(idx)
            .filter(|f| f.start_line <= line && line <= f.end_line)
    }

    /// Fragments intersecting `[start, end)`
    pub fn fragments_in_range(&self, start: u64, end: u64) -> &[Fragment] {
        let lo = self.fragments.partition_point(|f| f.end <= start);
        let hi = self.fragments.partition_point(|f| f.start < end);
        &self.fragments[lo..hi.max(lo)]
    }

    /// First slice of the unit a (possibly continuation) fragment belongs to
    pub fn head_of(&self, index: u32) -> Option<&Fragment> {
        let mut idx = index as usize;
        while self.fragments.get(idx)?.is_continuation() && idx > 0 {
            idx -= 1;
        }
        self.fragments.get(idx)
    }

    /// Name of a fragment's element
    pub fn name_of(&self, fragment: &Fragment) -> Option<&str> {
        self.strings.get_str(fragment.tag_id)
    }

    /// The name pool
    #[inline]
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Current validation status of a fragment
    pub fn status(&self, id: UnitId) -> FragmentStatus {
        self.statuses
            .get(id.index() as usize)
            .map(|s| FragmentStatus::from_u8(s.load(Ordering::Relaxed)))
            .unwrap_or_default()
    }

    /// Set the validation status of a fragment; returns false for unknown ids
    pub fn set_status(&self, id: UnitId, status: FragmentStatus) -> bool {
        match self.statuses.get(id.index() as usize) {
            Some(slot) => {
                slot.store(status as u8, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Total bytes covered by fragments
    pub fn covered_bytes(&self) -> u64 {
        self.fragments.iter().map(Fragment::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::fragment::fragment_flags::CONTINUATION;

    fn sample() -> FragmentIndex {
        let mut index = FragmentIndex::new();
        index.push(b"item", 6, 20, (1, 1), 1, 0);
        index.push(b"item", 20, 40, (2, 4), 1, 0);
        index.push(b"note", 45, 60, (5, 5), 1, 0);
        index.push(b"note", 60, 70, (5, 6), 1, CONTINUATION);
        index
    }

    #[test]
    fn test_fragment_at_offset() {
        let index = sample();
        assert_eq!(index.fragment_at_offset(6).unwrap().index, 0);
        assert_eq!(index.fragment_at_offset(19).unwrap().index, 0);
        assert_eq!(index.fragment_at_offset(20).unwrap().index, 1);
        assert!(index.fragment_at_offset(42).is_none());
        assert!(index.fragment_at_offset(0).is_none());
        assert!(index.fragment_at_offset(70).is_none());
    }

    #[test]
    fn test_fragment_at_line() {
        let index = sample();
        assert_eq!(index.fragment_at_line(3).unwrap().index, 1);
        assert_eq!(index.fragment_at_line(5).unwrap().index, 2);
        assert_eq!(index.fragment_at_line(6).unwrap().index, 3);
        assert!(index.fragment_at_line(9).is_none());
    }

    #[test]
    fn test_names_are_interned() {
        let index = sample();
        assert_eq!(index.fragment(0).unwrap().tag_id, index.fragment(1).unwrap().tag_id);
        assert_eq!(index.name_of(index.fragment(2).unwrap()), Some("note"));
        assert_eq!(index.strings().len(), 3);
    }

    #[test]
    fn test_fragment_by_id() {
        let index = sample();
        assert_eq!(index.fragment_by_id("frag_2").unwrap().start, 45);
        assert!(index.fragment_by_id("frag_9").is_none());
        assert!(index.fragment_by_id("bogus").is_none());
    }

    #[test]
    fn test_fragments_in_range() {
        let index = sample();
        let hits: Vec<u32> = index.fragments_in_range(15, 46).iter().map(|f| f.index).collect();
        assert_eq!(hits, vec![0, 1, 2]);
        assert!(index.fragments_in_range(41, 44).is_empty());
    }

    #[test]
    fn test_head_of_continuation() {
        let index = sample();
        assert_eq!(index.head_of(3).unwrap().index, 2);
        assert_eq!(index.head_of(1).unwrap().index, 1);
    }

    #[test]
    fn test_status_through_shared_ref() {
        let index = sample();
        assert_eq!(index.status(UnitId(1)), FragmentStatus::Unknown);
        assert!(index.set_status(UnitId(1), FragmentStatus::Malformed));
        assert_eq!(index.status(UnitId(1)), FragmentStatus::Malformed);
        assert!(!index.set_status(UnitId(99), FragmentStatus::Valid));
    }
}
