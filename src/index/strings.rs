//! String Interning Pool
//!
//! Deduplicates unit names across millions of fragments. A 100GB document
//! typically has a handful of distinct top-level names, so fragments carry a
//! `u32` id and the bytes live here once.
//!
//! Memory layout:
//! - `entries`: (offset, len) into `data` for each interned string ID
//! - `data`: one contiguous buffer holding every distinct name
//! - `hash_index`: hash -> list of IDs (handles rare collisions)
//!
//! The pool only grows; ids stay valid for the lifetime of the index.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// String interning pool
#[derive(Debug)]
pub struct StringPool {
    /// (offset in data, length) for each string ID
    entries: Vec<(u32, u32)>,
    /// Buffer holding the name bytes
    data: Vec<u8>,
    /// Hash of string content -> list of IDs with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        let mut pool = StringPool {
            entries: Vec::with_capacity(64),
            data: Vec::with_capacity(1024),
            hash_index: HashMap::new(),
        };
        // Entry 0 is reserved for "no name"
        pool.entries.push((0, 0));
        pool
    }

    /// Compute hash of byte slice
    #[inline]
    fn compute_hash(s: &[u8]) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a name, returning its id. The empty name is always id 0.
    pub fn intern(&mut self, s: &[u8]) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);

        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == Some(s) {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s);

        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);

        id
    }

    /// Look up an already interned name without inserting it
    pub fn lookup(&self, s: &[u8]) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.hash_index
            .get(&Self::compute_hash(s))?
            .iter()
            .copied()
            .find(|&id| self.get(id) == Some(s))
    }

    /// Get the bytes of a string ID
    pub fn get(&self, id: u32) -> Option<&[u8]> {
        let &(offset, len) = self.entries.get(id as usize)?;
        let start = offset as usize;
        self.data.get(start..start + len as usize)
    }

    /// Get a string ID as UTF-8
    pub fn get_str(&self, id: u32) -> Option<&str> {
        self.get(id).and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Number of entries, reserved entry included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1 // Entry 0 is reserved
    }

    /// Total bytes of name storage
    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}
