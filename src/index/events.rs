//! Scan Events
//!
//! What the streaming tag scanner reports to the fragment builder. Events are
//! unit-level: nested elements never surface here, only the boundaries of the
//! root's children and the diagnostics found along the way.

use crate::diagnostics::ErrorRecord;

/// Event produced while scanning a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent<'a> {
    /// A unit (or a continuation slice of one) begins at `start`.
    StartUnit {
        name: &'a [u8],
        start: u64,
        line: u32,
        /// Set on every slice of an oversized unit after the first
        continuation: bool,
    },
    /// The current slice ends at `end` (exclusive). Followed by a
    /// continuation `StartUnit` when the unit was split.
    EndUnit { end: u64, line: u32 },
    /// A self-closing unit.
    EmptyUnit {
        name: &'a [u8],
        start: u64,
        end: u64,
        line: u32,
        end_line: u32,
    },
    /// A diagnostic found during the scan.
    ParseError(ErrorRecord),
}
