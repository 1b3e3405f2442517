//! Document access
//!
//! The immutable original and the streaming readers that reconstruct the
//! edited document from it.

pub mod original;
pub mod patched;
pub mod pieces;
pub mod stream;

pub use original::{Original, OriginalReader};
pub use patched::PatchedReader;
pub use pieces::PieceReader;
pub use stream::VirtualDocument;
