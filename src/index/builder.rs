//! Index Builder
//!
//! Builds a FragmentIndex from scan events. Every event goes through one
//! dispatch function; the builder only tracks the slice that is currently
//! open, so its memory is the index itself plus one unit name.

use super::events::ScanEvent;
use super::fragment::{fragment_flags, FragmentStatus};
use super::fragment_index::FragmentIndex;
use crate::diagnostics::{ErrorCollector, ErrorRecord, Severity};

/// Slice of a unit that has started but not ended yet
#[derive(Debug)]
struct OpenSlice {
    name: Vec<u8>,
    start: u64,
    line: u32,
    continuation: bool,
}

/// Builder state for constructing a FragmentIndex
pub(crate) struct FragmentBuilder {
    /// The index being built
    index: FragmentIndex,
    /// Diagnostics reported during the scan
    collector: ErrorCollector,
    /// Slice currently open, if any
    open: Option<OpenSlice>,
}

impl FragmentBuilder {
    pub(crate) fn new(max_errors: usize) -> Self {
        Self {
            index: FragmentIndex::new(),
            collector: ErrorCollector::with_limit(max_errors),
            open: None,
        }
    }

    /// Apply one scan event
    pub(crate) fn dispatch(&mut self, event: ScanEvent<'_>) {
        match event {
            ScanEvent::StartUnit {
                name,
                start,
                line,
                continuation,
            } => {
                // The scanner always ends a slice before opening the next one
                debug_assert!(self.open.is_none());
                self.open = Some(OpenSlice {
                    name: name.to_vec(),
                    start,
                    line,
                    continuation,
                });
            }
            ScanEvent::EndUnit { end, line } => {
                if let Some(slice) = self.open.take() {
                    // A slice closed exactly at a split point carries no bytes
                    if end > slice.start {
                        let flags = if slice.continuation {
                            fragment_flags::CONTINUATION
                        } else {
                            0
                        };
                        self.index
                            .push(&slice.name, slice.start, end, (slice.line, line), 1, flags);
                    }
                }
            }
            ScanEvent::EmptyUnit {
                name,
                start,
                end,
                line,
                end_line,
            } => {
                self.index.push(name, start, end, (line, end_line), 1, 0);
            }
            ScanEvent::ParseError(record) => {
                self.collector.add_record(record);
            }
        }
    }

    /// Finish building: mark units that carry errors and return the parts
    pub(crate) fn finish(mut self) -> (FragmentIndex, Vec<ErrorRecord>, bool) {
        self.index.shrink_to_fit();

        let errors = self.collector.take();
        for error in errors.iter().filter(|e| e.severity == Severity::Error) {
            if let Some(fragment) = self.index.fragment_at_line(error.line) {
                self.index.set_status(fragment.id(), FragmentStatus::Malformed);
            }
        }

        (self.index, errors, self.collector.is_limit_reached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::index::UnitId;

    #[test]
    fn test_slices_and_empty_units() {
        let mut builder = FragmentBuilder::new(10);
        builder.dispatch(ScanEvent::StartUnit {
            name: b"item",
            start: 6,
            line: 1,
            continuation: false,
        });
        builder.dispatch(ScanEvent::EndUnit { end: 16, line: 1 });
        builder.dispatch(ScanEvent::StartUnit {
            name: b"item",
            start: 16,
            line: 1,
            continuation: true,
        });
        builder.dispatch(ScanEvent::EndUnit { end: 20, line: 2 });
        builder.dispatch(ScanEvent::EmptyUnit {
            name: b"gap",
            start: 21,
            end: 27,
            line: 2,
            end_line: 2,
        });

        let (index, errors, _) = builder.finish();
        assert!(errors.is_empty());
        assert_eq!(index.len(), 3);
        assert!(!index.fragment(0).unwrap().is_continuation());
        assert!(index.fragment(1).unwrap().is_continuation());
        assert_eq!(index.name_of(index.fragment(2).unwrap()), Some("gap"));
    }

    #[test]
    fn test_zero_length_slice_skipped() {
        let mut builder = FragmentBuilder::new(10);
        builder.dispatch(ScanEvent::StartUnit {
            name: b"a",
            start: 10,
            line: 1,
            continuation: true,
        });
        builder.dispatch(ScanEvent::EndUnit { end: 10, line: 1 });
        let (index, _, _) = builder.finish();
        assert!(index.is_empty());
    }

    #[test]
    fn test_errors_mark_units_malformed() {
        let mut builder = FragmentBuilder::new(10);
        builder.dispatch(ScanEvent::StartUnit {
            name: b"a",
            start: 0,
            line: 2,
            continuation: false,
        });
        builder.dispatch(ScanEvent::ParseError(ErrorRecord::new("bad", 3, ErrorKind::Syntax)));
        builder.dispatch(ScanEvent::EndUnit { end: 40, line: 4 });
        let (index, errors, limit) = builder.finish();
        assert_eq!(errors.len(), 1);
        assert!(!limit);
        assert_eq!(index.status(UnitId(0)), FragmentStatus::Malformed);
    }
}
