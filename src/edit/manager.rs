//! Patch manager
//!
//! Holds the session's edit intent: a `(start, end)`-sorted, non-overlapping
//! patch set with a per-unit index.
//!
//! Conflicts resolve as "new patch wins": adding a patch removes every
//! existing patch whose range intersects it. The removed patches are handed
//! back to the caller and logged, never dropped silently.
//!
//! Writers serialize on a mutex; readers take an immutable snapshot that is
//! swapped in only after a mutation is complete.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::journal::PatchJournal;
use super::patch::Patch;
use crate::error::Result;
use crate::index::UnitId;

#[derive(Debug, Default)]
struct PatchSet {
    sorted: Vec<Patch>,
    by_unit: HashMap<UnitId, Vec<Patch>>,
}

impl PatchSet {
    fn conflicts(&self, patch: &Patch) -> Vec<usize> {
        // Anything intersecting `patch` starts before its end
        let upper = self.sorted.partition_point(|p| p.start() < patch.end());
        (0..upper)
            .filter(|&i| self.sorted[i].overlaps(patch))
            .collect()
    }

    /// Insert with conflict resolution, returning what was superseded
    fn add(&mut self, patch: Patch) -> Vec<Patch> {
        let conflicts = self.conflicts(&patch);
        let mut superseded = Vec::with_capacity(conflicts.len());
        for &i in conflicts.iter().rev() {
            let old = self.sorted.remove(i);
            if let Some(owner) = old.owner() {
                if let Some(list) = self.by_unit.get_mut(&owner) {
                    if let Some(pos) = list.iter().position(|p| p == &old) {
                        list.remove(pos);
                    }
                    if list.is_empty() {
                        self.by_unit.remove(&owner);
                    }
                }
            }
            superseded.push(old);
        }
        superseded.reverse();

        let key = patch.sort_key();
        let at = self.sorted.partition_point(|p| p.sort_key() <= key);
        if let Some(owner) = patch.owner() {
            let list = self.by_unit.entry(owner).or_default();
            let pos = list.partition_point(|p| p.sort_key() <= key);
            list.insert(pos, patch.clone());
        }
        self.sorted.insert(at, patch);
        superseded
    }
}

/// Conflict-resolving, journaled patch store
#[derive(Debug)]
pub struct PatchManager {
    state: Mutex<PatchSet>,
    snapshot: ArcSwap<Vec<Patch>>,
    journal: Option<PatchJournal>,
}

impl PatchManager {
    /// In-memory manager without a journal
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PatchSet::default()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
            journal: None,
        }
    }

    /// Manager backed by `journal`, replaying whatever it already holds.
    ///
    /// Entries are replayed through the same conflict resolution as live
    /// edits, so the result equals the set the previous session ended with.
    /// Entries reaching past `document_len` (the file changed since they
    /// were recorded) are dropped with a warning and the journal is
    /// rewritten without them.
    pub fn open(journal: PatchJournal, document_len: u64) -> Result<Self> {
        let entries = journal.load()?;
        let recorded = entries.len();
        let (kept, stale): (Vec<Patch>, Vec<Patch>) =
            entries.into_iter().partition(|p| p.end() <= document_len);

        if !stale.is_empty() {
            for patch in &stale {
                tracing::warn!(
                    journal = %journal.path().display(),
                    %patch,
                    document_len,
                    "dropping journal entry past the end of the document"
                );
            }
            if let Err(error) = journal.rewrite(&kept) {
                tracing::warn!(journal = %journal.path().display(), %error, "journal rewrite failed");
            }
        }

        let mut set = PatchSet::default();
        let replayed = kept.len();
        for patch in kept {
            set.add(patch);
        }
        tracing::debug!(
            journal = %journal.path().display(),
            recorded,
            replayed,
            live = set.sorted.len(),
            "patch journal replayed"
        );

        Ok(Self {
            snapshot: ArcSwap::from_pointee(set.sorted.clone()),
            state: Mutex::new(set),
            journal: Some(journal),
        })
    }

    /// Add a patch. Existing patches that intersect it are removed and
    /// returned.
    ///
    /// The journal is written before the in-memory set changes, so a failed
    /// write leaves the manager untouched.
    pub fn add_patch(&self, patch: Patch) -> Result<Vec<Patch>> {
        let mut state = self.state.lock();
        if let Some(journal) = &self.journal {
            journal.append(&patch)?;
        }

        let superseded = state.add(patch);
        for old in &superseded {
            tracing::warn!(patch = %old, "patch superseded by an overlapping edit");
        }
        self.snapshot.store(Arc::new(state.sorted.clone()));
        Ok(superseded)
    }

    /// Immutable snapshot of every patch in application order
    pub fn all_sorted(&self) -> Arc<Vec<Patch>> {
        self.snapshot.load_full()
    }

    /// Patches made in one unit, in application order
    pub fn for_unit(&self, unit: UnitId) -> Vec<Patch> {
        self.state
            .lock()
            .by_unit
            .get(&unit)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every patch and remove the journal.
    ///
    /// The in-memory set is emptied even when removing the journal fails;
    /// that error is still returned.
    pub fn clear_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.sorted.clear();
        state.by_unit.clear();
        self.snapshot.store(Arc::new(Vec::new()));
        match &self.journal {
            Some(journal) => journal.clear(),
            None => Ok(()),
        }
    }

    pub fn journal(&self) -> Option<&PatchJournal> {
        self.journal.as_ref()
    }
}

impl Default for PatchManager {
    fn default() -> Self {
        Self::new()
    }
}
