//! Fragment Index Module
//!
//! Addressable map of a document's top-level units, built in one streaming
//! pass and holding only byte offsets into the original file:
//!
//! - **Offsets only**: a unit is `[start, end)` plus its line span; content
//!   is re-read from the file on demand.
//! - **Interned names**: unit names live once in a string pool.
//! - **Bounded units**: a unit larger than the slice threshold is split into
//!   contiguous slices, so no single unit has to be loaded whole.
//!
//! ## Architecture
//!
//! ```text
//! Read ──> TagScanner ──ScanEvent──> FragmentBuilder ──> FragmentIndex
//!                                                        ├── fragments: Vec<Fragment>  # 40 bytes each
//!                                                        ├── statuses: Vec<AtomicU8>
//!                                                        └── strings: StringPool
//! ```

pub(crate) mod builder;
pub mod events;
pub mod fragment;
pub mod fragment_index;
pub mod indexer;
pub mod strings;

pub use events::ScanEvent;
pub use fragment::{fragment_flags, Fragment, FragmentStatus, UnitId, NO_PARENT};
pub use fragment_index::FragmentIndex;
pub use indexer::{IndexReport, StructuralIndexer};
pub use strings::StringPool;
