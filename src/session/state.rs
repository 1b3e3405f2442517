//! Editing session
//!
//! Explicit context for one open document: the original file, its patch set
//! (with journal), the piece table derived from it and the published index.
//! Every operation of the editing client goes through a `Session`; there is no
//! global state.
//!
//! Readers never lock: the index and the piece table are published through
//! `ArcSwap`, so a reader sees either the previous or the complete new state.
//! Edits, saves and rebuilds are serialized by one mutex.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::cache::UnitCache;
use super::saver::{same_file, save_stream, SaveReport};
use super::scheduler::ValidationScheduler;
use super::validate::{link_errors, run_validator, SchemaValidator, ValidationReport};
use crate::config::Config;
use crate::core::checker;
use crate::diagnostics::{ErrorRecord, UnitLink};
use crate::document::{Original, PatchedReader, VirtualDocument};
use crate::edit::{Patch, PatchJournal, PatchManager, PieceTable};
use crate::error::{Error, Result};
use crate::index::{Fragment, FragmentIndex, FragmentStatus, IndexReport, StructuralIndexer, UnitId};

/// One open document and its pending edits
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    config: Config,
    indexer: StructuralIndexer,
    patches: PatchManager,
    table: ArcSwap<PieceTable>,
    index: ArcSwap<FragmentIndex>,
    index_errors: ArcSwap<Vec<ErrorRecord>>,
    cache: UnitCache,
    edit_lock: Mutex<()>,
}

impl Session {
    /// Open `path`: replay its journal (if enabled) and index the original.
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let original = Original::open(&path)?;
        let patches = if config.journal {
            PatchManager::open(PatchJournal::for_file(&path, &config.journal_dir_name), original.len())?
        } else {
            PatchManager::new()
        };
        let table = PieceTable::from_patches(original.clone(), &patches.all_sorted())?;

        let session = Self {
            indexer: StructuralIndexer::new(&config),
            cache: UnitCache::new(config.unit_cache_capacity),
            path,
            config,
            patches,
            table: ArcSwap::from_pointee(table),
            index: ArcSwap::from_pointee(FragmentIndex::new()),
            index_errors: ArcSwap::from_pointee(Vec::new()),
            edit_lock: Mutex::new(()),
        };
        session.build_index(&original)?;
        Ok(session)
    }

    /// Index `original` and publish the result
    fn build_index(&self, original: &Original) -> Result<Arc<FragmentIndex>> {
        let report = self.indexer.index(original.reader()?);
        tracing::debug!(
            path = %self.path.display(),
            units = report.index.len(),
            errors = report.errors.len(),
            bytes = report.bytes_scanned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            completed = report.completed,
            "index built"
        );

        let mut errors = report.errors;
        link_errors(&mut errors, &report.index);
        let index = Arc::new(report.index);
        self.index.store(Arc::clone(&index));
        self.index_errors.store(Arc::new(errors));
        self.cache.clear();
        Ok(index)
    }

    fn rebuild_table(&self, original: Original) -> Result<()> {
        let table = PieceTable::from_patches(original, &self.patches.all_sorted())?;
        self.table.store(Arc::new(table));
        self.cache.clear();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current index of the original file
    pub fn index(&self) -> Arc<FragmentIndex> {
        self.index.load_full()
    }

    /// Diagnostics from the last index build, linked to their units
    pub fn index_errors(&self) -> Arc<Vec<ErrorRecord>> {
        self.index_errors.load_full()
    }

    /// Look up a unit of the current index
    pub fn unit(&self, id: UnitId) -> Result<Fragment> {
        self.index
            .load()
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownUnit(id.to_string()))
    }

    /// Text of a unit with the patches that fall inside it applied.
    ///
    /// Only the unit's own bytes are read from the original.
    pub fn unit_text(&self, id: UnitId) -> Result<Arc<str>> {
        if let Some(text) = self.cache.get(id) {
            return Ok(text);
        }

        let fragment = self.unit(id)?;
        let snapshot = self.patches.all_sorted();
        let bytes = self.table.load().original().read_range(fragment.start, fragment.end)?;
        let local: Vec<Patch> = snapshot
            .iter()
            .filter(|p| fragment.covers(p.start(), p.end()))
            .filter_map(|p| p.rebased(fragment.start))
            .collect();

        let mut reader = PatchedReader::new(Cursor::new(bytes), fragment.len(), Arc::new(local))?;
        let mut out = Vec::with_capacity(reader.len() as usize);
        reader.read_to_end(&mut out)?;
        let text: Arc<str> = String::from_utf8_lossy(&out).into();

        // Skip caching if an edit landed while reading
        if Arc::ptr_eq(&snapshot, &self.patches.all_sorted()) {
            self.cache.put(id, Arc::clone(&text));
        }
        Ok(text)
    }

    /// Replace a whole unit with `text`. Returns the patches it superseded.
    pub fn update_unit(&self, id: UnitId, text: impl Into<String>) -> Result<Vec<Patch>> {
        let fragment = self.unit(id)?;
        let patch = Patch::replace(fragment.start, fragment.end, text)?.with_owner(id);
        self.add_patch(patch)
    }

    /// Record an edit on original coordinates. Returns the patches it
    /// superseded.
    pub fn add_patch(&self, patch: Patch) -> Result<Vec<Patch>> {
        let _guard = self.edit_lock.lock();
        let original = self.table.load().original().clone();
        if patch.end() > original.len() {
            return Err(Error::OutOfBounds {
                offset: patch.end(),
                len: original.len(),
            });
        }

        let superseded = self.patches.add_patch(patch)?;
        self.rebuild_table(original)?;
        Ok(superseded)
    }

    /// Snapshot of the pending patches, sorted
    pub fn patches(&self) -> Arc<Vec<Patch>> {
        self.patches.all_sorted()
    }

    pub fn patch_manager(&self) -> &PatchManager {
        &self.patches
    }

    /// Current edit state
    pub fn piece_table(&self) -> Arc<PieceTable> {
        self.table.load_full()
    }

    /// Stream of the document with every pending edit applied
    pub fn virtual_document(&self) -> VirtualDocument {
        VirtualDocument::from_table(self.piece_table())
    }

    /// Whether edits are pending
    pub fn has_unsaved(&self) -> bool {
        !self.patches.is_empty()
    }

    /// Rebuild the index of the original file
    pub fn reindex(&self) -> Result<Arc<FragmentIndex>> {
        let _guard = self.edit_lock.lock();
        let original = self.table.load().original().clone();
        self.build_index(&original)
    }

    /// Index the edited document. The result is not published: unit ids and
    /// patches keep referring to the original.
    pub fn index_virtual(&self) -> IndexReport {
        self.indexer.index(self.virtual_document())
    }

    /// Run `validator` over the edited document.
    ///
    /// Without pending edits the diagnostics are linked to units of the
    /// current index and those units are marked invalid. With edits, line
    /// numbers refer to the edited document and are left unlinked.
    pub fn validate(&self, validator: &dyn SchemaValidator) -> Result<ValidationReport> {
        let edited = self.has_unsaved();
        let mut doc = self.virtual_document();
        let size = doc.len();
        let mut report = run_validator(validator, &mut doc, size, self.config.max_errors)?;

        if !edited {
            let index = self.index();
            link_errors(&mut report.errors, &index);
            for record in report.errors.iter().filter(|e| !e.is_warning()) {
                if let Some(link) = record.unit {
                    index.set_status(link.unit, FragmentStatus::Invalid);
                }
            }
        }
        tracing::debug!(path = %self.path.display(), summary = %report.summary(), "validated");
        Ok(report)
    }

    /// Queue a validation of this session on `scheduler`, keyed by path.
    ///
    /// A burst of calls runs one pass after the debounce delay; `done`
    /// receives its result on a pool thread. Returns true if a queued pass
    /// was replaced.
    pub fn schedule_validation<F>(
        self: &Arc<Self>,
        scheduler: &ValidationScheduler,
        validator: Arc<dyn SchemaValidator>,
        done: F,
    ) -> bool
    where
        F: FnOnce(Result<ValidationReport>) + Send + 'static,
    {
        let session = Arc::clone(self);
        let key = self.path.to_string_lossy().into_owned();
        scheduler.schedule(key, move || done(session.validate(validator.as_ref())))
    }

    /// Write the edited document to `target` (the original when `None`).
    ///
    /// Saving over the original clears the patches and journal and rebuilds
    /// the index. Saving elsewhere leaves the session unchanged. Once the
    /// file is replaced the session always moves to it; a journal that
    /// cannot be removed is reported afterwards.
    pub fn save(&self, target: Option<&Path>) -> Result<SaveReport> {
        let _guard = self.edit_lock.lock();
        let target = target.unwrap_or(self.path.as_path());
        let report = save_stream(
            VirtualDocument::from_table(self.table.load_full()),
            target,
            self.config.read_window(),
        )?;

        if same_file(target, &self.path) {
            let original = Original::open(&self.path)?;
            self.table.store(Arc::new(PieceTable::new(original.clone())));
            let cleared = self.patches.clear_all();
            self.build_index(&original)?;
            if let Err(error) = cleared {
                tracing::warn!(path = %self.path.display(), %error, "saved, but the journal was not removed");
                return Err(error);
            }
        }
        Ok(report)
    }

    /// Drop every pending edit and the journal
    pub fn discard_edits(&self) -> Result<()> {
        let _guard = self.edit_lock.lock();
        self.patches.clear_all()?;
        let original = self.table.load().original().clone();
        self.rebuild_table(original)
    }

    /// Quick syntax check of a unit's current text. Marks the unit valid or
    /// malformed and returns the findings in document lines.
    pub fn check_unit(&self, id: UnitId) -> Result<Vec<ErrorRecord>> {
        let fragment = self.unit(id)?;
        let text = self.unit_text(id)?;
        let link = UnitLink {
            unit: id,
            start_line: fragment.start_line,
            end_line: fragment.end_line,
        };
        let records: Vec<ErrorRecord> = checker::check(text.as_bytes())
            .iter()
            .map(|finding| {
                let mut record = finding.to_record(fragment.start_line);
                record.unit = Some(link);
                record
            })
            .collect();

        let status = if records.is_empty() {
            FragmentStatus::Valid
        } else {
            FragmentStatus::Malformed
        };
        self.index.load().set_status(id, status);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::WellFormedness;
    use pretty_assertions::assert_eq;

    fn open(dir: &Path, text: &str) -> Session {
        let path = dir.join("doc.xml");
        std::fs::write(&path, text).unwrap();
        Session::open(&path, Config::default()).unwrap()
    }

    #[test]
    fn test_open_indexes_units() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><a>1</a><b/></root>");
        let index = session.index();
        assert_eq!(index.len(), 2);
        assert_eq!(index.name_of(&session.unit(UnitId(1)).unwrap()), Some("b"));
        assert!(matches!(session.unit(UnitId(9)), Err(Error::UnknownUnit(_))));
        assert!(!session.has_unsaved());
    }

    #[test]
    fn test_update_unit_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><item>Original</item><item>2</item></root>");
        assert_eq!(&*session.unit_text(UnitId(0)).unwrap(), "<item>Original</item>");

        session.update_unit(UnitId(0), "<item>Patched</item>").unwrap();
        assert_eq!(&*session.unit_text(UnitId(0)).unwrap(), "<item>Patched</item>");
        assert_eq!(&*session.unit_text(UnitId(1)).unwrap(), "<item>2</item>");

        let mut out = String::new();
        session.virtual_document().read_to_string(&mut out).unwrap();
        assert_eq!(out, "<root><item>Patched</item><item>2</item></root>");
    }

    #[test]
    fn test_patch_inside_unit_is_rebased() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><item>Original</item></root>");
        session.unit_text(UnitId(0)).unwrap();
        session.add_patch(Patch::replace(12, 20, "Patched").unwrap()).unwrap();
        assert_eq!(&*session.unit_text(UnitId(0)).unwrap(), "<item>Patched</item>");
    }

    #[test]
    fn test_patch_past_end_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root/>");
        assert!(matches!(
            session.add_patch(Patch::insert(8, "x")),
            Err(Error::OutOfBounds { offset: 8, len: 7 })
        ));
        assert!(!session.has_unsaved());
    }

    #[test]
    fn test_validate_links_and_marks_units() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root>\n<a>\n</b>\n</a>\n<c/>\n</root>\n");
        let report = session.validate(&WellFormedness::new(session.config())).unwrap();
        assert!(!report.success);
        let linked = report.errors.iter().find(|e| e.unit.is_some()).unwrap();
        assert_eq!(linked.unit.unwrap().unit, UnitId(0));
        assert_eq!(session.index().status(UnitId(0)), FragmentStatus::Invalid);
    }

    #[test]
    fn test_scheduled_validation_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(open(dir.path(), "<root><a/></root>"));
        let scheduler = ValidationScheduler::new(std::time::Duration::from_millis(20));
        let validator: Arc<dyn SchemaValidator> = Arc::new(WellFormedness::new(session.config()));
        let (tx, rx) = std::sync::mpsc::channel();

        for _ in 0..3 {
            let tx = tx.clone();
            session.schedule_validation(&scheduler, Arc::clone(&validator), move |result| {
                let _ = tx.send(result.map(|r| r.success));
            });
        }
        drop(tx);

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Ok(true)));
    }

    #[test]
    fn test_check_unit_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root>\n<a>ok</a>\n<b>ok</b>\n</root>");
        assert!(session.check_unit(UnitId(0)).unwrap().is_empty());
        assert_eq!(session.index().status(UnitId(0)), FragmentStatus::Valid);

        session.update_unit(UnitId(1), "<b><c></b>").unwrap();
        let findings = session.check_unit(UnitId(1)).unwrap();
        assert!(!findings.is_empty());
        assert!(findings.iter().all(|f| f.line == 3 && f.unit.is_some()));
        assert_eq!(session.index().status(UnitId(1)), FragmentStatus::Malformed);
    }

    #[test]
    fn test_save_in_place_clears_edits() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><item>Original</item></root>");
        session.add_patch(Patch::replace(12, 20, "Patched").unwrap()).unwrap();
        let journal = session.patch_manager().journal().unwrap().path().to_path_buf();
        assert!(journal.exists());

        let report = session.save(None).unwrap();
        assert_eq!(report.bytes_written, 33);
        assert_eq!(std::fs::read_to_string(session.path()).unwrap(), "<root><item>Patched</item></root>");
        assert!(!session.has_unsaved());
        assert!(!journal.exists());
        assert_eq!(session.unit(UnitId(0)).unwrap().end, 26);
    }

    #[test]
    fn test_save_in_place_moves_on_when_journal_is_stuck() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><item>Original</item></root>");
        session.add_patch(Patch::replace(12, 20, "Patched").unwrap()).unwrap();
        let journal = session.patch_manager().journal().unwrap().path().to_path_buf();
        std::fs::remove_file(&journal).unwrap();
        std::fs::create_dir(&journal).unwrap();

        assert!(session.save(None).is_err());
        assert_eq!(std::fs::read_to_string(session.path()).unwrap(), "<root><item>Patched</item></root>");
        assert!(session.patches().is_empty());
        assert!(!session.has_unsaved());
        assert_eq!(&*session.unit_text(UnitId(0)).unwrap(), "<item>Patched</item>");
        assert_eq!(session.unit(UnitId(0)).unwrap().end, 26);
    }

    #[test]
    fn test_save_as_keeps_edits() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><a/></root>");
        session.add_patch(Patch::insert(10, "<b/>")).unwrap();
        let copy = dir.path().join("copy.xml");
        session.save(Some(&copy)).unwrap();

        assert_eq!(std::fs::read_to_string(&copy).unwrap(), "<root><a/><b/></root>");
        assert_eq!(std::fs::read_to_string(session.path()).unwrap(), "<root><a/></root>");
        assert!(session.has_unsaved());
    }

    #[test]
    fn test_journal_survives_reopen_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        std::fs::write(&path, "<root><a>1</a></root>").unwrap();
        {
            let session = Session::open(&path, Config::default()).unwrap();
            session.update_unit(UnitId(0), "<a>2</a>").unwrap();
        }

        let session = Session::open(&path, Config::default()).unwrap();
        assert_eq!(&*session.unit_text(UnitId(0)).unwrap(), "<a>2</a>");
        session.discard_edits().unwrap();
        assert_eq!(&*session.unit_text(UnitId(0)).unwrap(), "<a>1</a>");
        assert!(Session::open(&path, Config::default()).unwrap().patches().is_empty());
    }

    #[test]
    fn test_index_virtual_sees_edits() {
        let dir = tempfile::tempdir().unwrap();
        let session = open(dir.path(), "<root><a/></root>");
        session.add_patch(Patch::insert(10, "<b/><c/>")).unwrap();
        assert_eq!(session.index_virtual().index.len(), 3);
        assert_eq!(session.index().len(), 1);
        assert_eq!(session.reindex().unwrap().len(), 1);
    }
}
