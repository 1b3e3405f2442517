//! Error Collector
//!
//! Bounded, deduplicating sink for diagnostics. Some malformed inputs produce
//! one error per byte; the cap keeps a single pass from exhausting memory.
//!
//! - Records are deduplicated on `(line, message)`.
//! - Once `max_errors` records are stored, one `LIMIT_REACHED` sentinel is
//!   appended and every later record is dropped, except for a single
//!   `FATAL_PARSE` record: the reason a pass aborted is always reported.

use std::collections::HashSet;

use parking_lot::Mutex;

use super::record::{ErrorKind, ErrorRecord};
use crate::config::DEFAULT_MAX_ERRORS;

#[derive(Debug, Default)]
struct Inner {
    errors: Vec<ErrorRecord>,
    signatures: HashSet<(u32, String)>,
    limit_reached: bool,
    /// A fatal record was admitted past the cap
    fatal_past_limit: bool,
}

/// Thread-safe bounded diagnostic collector.
#[derive(Debug)]
pub struct ErrorCollector {
    inner: Mutex<Inner>,
    max_errors: usize,
}

impl ErrorCollector {
    /// Collector with the default cap (1000).
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_ERRORS)
    }

    /// Collector with an explicit cap.
    pub fn with_limit(max_errors: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_errors,
        }
    }

    /// Add a diagnostic at column 1.
    pub fn add(&self, message: impl Into<String>, line: u32, kind: ErrorKind) {
        self.add_record(ErrorRecord::new(message, line, kind));
    }

    /// Add a fully built diagnostic.
    ///
    /// Returns `true` if the record was stored.
    pub fn add_record(&self, record: ErrorRecord) -> bool {
        let mut inner = self.inner.lock();

        if inner.errors.len() >= self.max_errors {
            if !inner.limit_reached {
                inner.limit_reached = true;
                let sentinel = ErrorRecord::new(
                    format!(
                        "Error limit reached ({} errors). Additional errors are not reported.",
                        self.max_errors
                    ),
                    record.line,
                    ErrorKind::LimitReached,
                );
                inner.errors.push(sentinel);
                tracing::debug!(max = self.max_errors, "error collector limit reached");
            }
            if record.kind == ErrorKind::FatalParse && !inner.fatal_past_limit {
                inner.fatal_past_limit = true;
                inner.errors.push(record);
                return true;
            }
            return false;
        }

        let signature = (record.line, record.message.clone());
        if !inner.signatures.insert(signature) {
            return false;
        }
        inner.errors.push(record);
        true
    }

    /// Snapshot of the collected records, in insertion order.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.inner.lock().errors.clone()
    }

    /// Take the collected records, leaving the collector empty (the limit
    /// flag is kept).
    pub fn take(&self) -> Vec<ErrorRecord> {
        let mut inner = self.inner.lock();
        inner.signatures.clear();
        std::mem::take(&mut inner.errors)
    }

    /// Number of stored records, sentinel included.
    pub fn len(&self) -> usize {
        self.inner.lock().errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the cap was hit during collection.
    pub fn is_limit_reached(&self) -> bool {
        self.inner.lock().limit_reached
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    /// Drop everything and reset the limit flag.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.errors.clear();
        inner.signatures.clear();
        inner.limit_reached = false;
        inner.fatal_past_limit = false;
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplication() {
        let collector = ErrorCollector::new();
        for _ in 0..100 {
            collector.add("Unexpected '<'", 12, ErrorKind::Syntax);
        }
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_same_message_other_line_kept() {
        let collector = ErrorCollector::new();
        collector.add("Unexpected '<'", 1, ErrorKind::Syntax);
        collector.add("Unexpected '<'", 2, ErrorKind::Syntax);
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_limit_with_sentinel() {
        let max = 100;
        let collector = ErrorCollector::with_limit(max);
        for i in 0..(max + 50) {
            collector.add(format!("error {i}"), i as u32, ErrorKind::Structure);
        }
        let errors = collector.errors();
        assert_eq!(errors.len(), max + 1);
        assert!(collector.is_limit_reached());
        assert_eq!(errors.last().unwrap().kind, ErrorKind::LimitReached);
        assert_eq!(
            errors.iter().filter(|e| e.kind == ErrorKind::LimitReached).count(),
            1
        );
    }

    #[test]
    fn test_fatal_admitted_once_past_limit() {
        let collector = ErrorCollector::with_limit(2);
        for i in 0..4u32 {
            collector.add(format!("orphan {i}"), i + 1, ErrorKind::Structure);
        }
        assert!(collector.add_record(ErrorRecord::new("read failed", 9, ErrorKind::FatalParse)));
        assert!(!collector.add_record(ErrorRecord::new("read failed again", 9, ErrorKind::FatalParse)));

        let kinds: Vec<ErrorKind> = collector.errors().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::Structure,
                ErrorKind::Structure,
                ErrorKind::LimitReached,
                ErrorKind::FatalParse
            ]
        );
    }

    #[test]
    fn test_default_limit() {
        assert_eq!(ErrorCollector::new().max_errors(), 1000);
    }

    #[test]
    fn test_clear_resets_limit() {
        let collector = ErrorCollector::with_limit(1);
        collector.add("a", 1, ErrorKind::Syntax);
        collector.add("b", 2, ErrorKind::Syntax);
        assert!(collector.is_limit_reached());

        collector.clear();
        assert!(collector.is_empty());
        assert!(!collector.is_limit_reached());
    }

    #[test]
    fn test_concurrent_adds_stay_bounded() {
        let collector = ErrorCollector::with_limit(50);
        std::thread::scope(|scope| {
            for t in 0..4u32 {
                let collector = &collector;
                scope.spawn(move || {
                    for i in 0..100u32 {
                        collector.add(format!("t{t} e{i}"), i, ErrorKind::Syntax);
                    }
                });
            }
        });
        assert_eq!(collector.len(), 51);
    }
}
