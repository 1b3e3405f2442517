//! Patches
//!
//! A patch is an explicit edit on the *original* file's coordinates: replace
//! `[start, end)` with `text`. Inserts are empty ranges, deletes have empty
//! text. A patch set is applied in order of `(start, end)`, which puts an
//! insert ahead of a replace starting at the same offset.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::UnitId;

/// What a patch does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchKind {
    Insert,
    Replace,
    Delete,
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchKind::Insert => "INSERT",
            PatchKind::Replace => "REPLACE",
            PatchKind::Delete => "DELETE",
        })
    }
}

/// One edit on the original file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Patch {
    start: u64,
    end: u64,
    text: String,
    kind: PatchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<UnitId>,
}

impl Patch {
    /// Create a patch, rejecting `start > end`.
    pub fn new(
        start: u64,
        end: u64,
        text: impl Into<String>,
        kind: PatchKind,
        owner: Option<UnitId>,
    ) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            text: text.into(),
            kind,
            owner,
        })
    }

    /// Replace `[start, end)` with `text`
    pub fn replace(start: u64, end: u64, text: impl Into<String>) -> Result<Self> {
        Self::new(start, end, text, PatchKind::Replace, None)
    }

    /// Insert `text` before the byte at `at`
    pub fn insert(at: u64, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
            kind: PatchKind::Insert,
            owner: None,
        }
    }

    /// Remove `[start, end)`
    pub fn delete(start: u64, end: u64) -> Result<Self> {
        Self::new(start, end, String::new(), PatchKind::Delete, None)
    }

    /// Attach the unit this edit was made in
    #[must_use]
    pub fn with_owner(mut self, owner: UnitId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn kind(&self) -> PatchKind {
        self.kind
    }

    #[inline]
    pub fn owner(&self) -> Option<UnitId> {
        self.owner
    }

    /// Bytes of the original removed by this patch
    #[inline]
    pub fn removed_len(&self) -> u64 {
        self.end - self.start
    }

    /// Change in document length caused by this patch
    #[inline]
    pub fn delta(&self) -> i64 {
        self.text.len() as i64 - self.removed_len() as i64
    }

    /// Whether the two original ranges intersect. An insert overlaps only a
    /// range that strictly contains its offset; touching ends do not count.
    #[inline]
    pub fn overlaps(&self, other: &Patch) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Order in which patches are applied
    #[inline]
    pub(crate) fn sort_key(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    /// Same edit moved by `-base`, for applying a unit's patches to the
    /// unit's own bytes
    pub(crate) fn rebased(&self, base: u64) -> Option<Patch> {
        Some(Patch {
            start: self.start.checked_sub(base)?,
            end: self.end.checked_sub(base)?,
            text: self.text.clone(),
            kind: self.kind,
            owner: self.owner,
        })
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 20;
        let mut preview: String = self.text.chars().take(PREVIEW).collect();
        if preview.len() < self.text.len() {
            preview.push_str("...");
        }
        write!(f, "{} [{}, {}) {:?}", self.kind, self.start, self.end, preview)?;
        if let Some(owner) = self.owner {
            write!(f, " in {owner}")?;
        }
        Ok(())
    }
}

/// Check that `patches` can be applied in one forward pass over a document
/// of `len` bytes: sorted, non-overlapping, inside the document.
pub fn validate_patch_set(patches: &[Patch], len: u64) -> Result<()> {
    let mut prev: Option<&Patch> = None;
    for patch in patches {
        if patch.end > len {
            return Err(Error::InvalidPatchSet(format!(
                "patch [{}, {}) extends past the end of the document ({len} bytes)",
                patch.start, patch.end
            )));
        }
        if let Some(prev) = prev {
            if patch.sort_key() < prev.sort_key() {
                return Err(Error::InvalidPatchSet(format!(
                    "patches not sorted: [{}, {}) after [{}, {})",
                    patch.start, patch.end, prev.start, prev.end
                )));
            }
            if prev.end > patch.start {
                return Err(Error::InvalidPatchSet(format!(
                    "patches overlap: [{}, {}) and [{}, {})",
                    prev.start, prev.end, patch.start, patch.end
                )));
            }
        }
        prev = Some(patch);
    }
    Ok(())
}

/// Apply a patch set to an in-memory buffer by splicing. Only meant for
/// small inputs (a single unit, tests).
pub fn splice(original: &[u8], patches: &[Patch]) -> Result<Vec<u8>> {
    validate_patch_set(patches, original.len() as u64)?;
    let extra: i64 = patches.iter().map(Patch::delta).sum();
    let mut out = Vec::with_capacity((original.len() as i64 + extra).max(0) as usize);
    let mut pos = 0usize;
    for patch in patches {
        out.extend_from_slice(&original[pos..patch.start as usize]);
        out.extend_from_slice(patch.text.as_bytes());
        pos = patch.end as usize;
    }
    out.extend_from_slice(&original[pos..]);
    Ok(out)
}
