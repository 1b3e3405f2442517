//! Edit model
//!
//! - [`Patch`] / [`PatchManager`]: edit intent on original coordinates,
//!   conflict-resolved and journaled
//! - [`PieceTable`]: the read-side edit state derived from the patch set

pub mod journal;
pub mod manager;
pub mod patch;
pub mod piece_table;

pub use journal::PatchJournal;
pub use manager::PatchManager;
pub use patch::{splice, validate_patch_set, Patch, PatchKind};
pub use piece_table::{Piece, PieceTable, Source};
