//! xmledit - Virtual editing of very large XML files
//!
//! Layers:
//! - index: single-pass structural indexer and the fragment index it builds
//! - edit: patches, patch manager with journal, piece table
//! - document: streaming reconstruction of the edited document
//! - diagnostics: bounded, deduplicating error collection
//! - session: the editing context tying the layers together
//!
//! Nothing here loads a whole document: indexing, validation and saving all
//! stream through a bounded read window.
//!
//! ```no_run
//! use xmledit::{Config, Patch, Session, UnitId};
//!
//! # fn main() -> xmledit::Result<()> {
//! let session = Session::open("big.xml", Config::default())?;
//! println!("{} units", session.index().len());
//! session.update_unit(UnitId(0), "<item>Patched</item>")?;
//! session.add_patch(Patch::insert(0, "<!-- edited -->\n"))?;
//! session.save(None)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod document;
pub mod edit;
pub mod error;
pub mod index;
pub mod memory;
pub mod session;

pub use config::Config;
pub use diagnostics::{ErrorCollector, ErrorKind, ErrorRecord, Severity, UnitLink};
pub use document::{Original, VirtualDocument};
pub use edit::{Patch, PatchJournal, PatchKind, PatchManager, PieceTable};
pub use error::{Error, Result};
pub use index::{Fragment, FragmentIndex, FragmentStatus, IndexReport, StructuralIndexer, UnitId};
pub use session::{
    SaveReport, SchemaValidator, Session, ValidationReport, ValidationScheduler, WellFormedness,
};
