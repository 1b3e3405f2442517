//! Streaming Structural Indexer
//!
//! Single pass over any `Read`, in bounded windows, producing the fragment
//! index of the root's children. Memory is one read window, the open-element
//! stack and the index itself, so documents far larger than RAM can be
//! indexed.
//!
//! The scanner is a byte-level state machine:
//!
//! ```text
//! Content ──'<'──> TagStart ──name──> TagName ──ws──> WaitGt <──> Quote{Single,Double}
//!                     │ '/'  (closing)    │ '>' ─────────┴──> Content
//!                     │ '?' ──> Pi ──'?>'──> Content
//!                     └ '!' ──> MarkupStart ──'-'──> Comment ──'-->'──> Content
//!                                           ├──'['──> CData ──']]>'──> Content
//!                                           └──────> Decl ──'>'──> Content
//! ```
//!
//! Recovery: a `<` inside an unterminated tag ends that tag (SYNTAX record)
//! and scanning restarts on the new bracket. Closing tags are matched against
//! the open-element stack by nearest name; tags skipped over are reported as
//! unclosed. A read failure moves the scanner to `Fatal`, which is terminal.

use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use super::builder::FragmentBuilder;
use super::events::ScanEvent;
use super::fragment_index::FragmentIndex;
use crate::config::Config;
use crate::core::encoding::encoding_warning;
use crate::core::scanner::Scanner;
use crate::diagnostics::{ErrorKind, ErrorRecord};
use crate::error::{Error, Result};

/// Tag names longer than this are truncated in diagnostics and the pool
const MAX_NAME_LEN: usize = 1024;

/// Bytes inspected for a BOM or XML declaration
const HEAD_LEN: usize = 256;

/// Outcome of one indexing pass
#[derive(Debug)]
pub struct IndexReport {
    /// Units found before the pass ended
    pub index: FragmentIndex,
    /// Diagnostics, capped and deduplicated
    pub errors: Vec<ErrorRecord>,
    /// Whether the diagnostic cap was hit
    pub limit_reached: bool,
    /// Bytes consumed from the input
    pub bytes_scanned: u64,
    pub elapsed: Duration,
    /// False when the pass was aborted by a read failure
    pub completed: bool,
}

impl IndexReport {
    /// Number of error-severity diagnostics, the truncation sentinel excluded
    pub fn error_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| !e.is_warning() && e.kind != ErrorKind::LimitReached)
            .count()
    }
}

/// Builds fragment indexes from byte streams
#[derive(Debug, Clone)]
pub struct StructuralIndexer {
    max_fragment_size: u64,
    read_buffer_size: usize,
    max_errors: usize,
}

impl StructuralIndexer {
    pub fn new(config: &Config) -> Self {
        Self {
            max_fragment_size: config.max_fragment_size.max(1),
            read_buffer_size: config.read_window(),
            max_errors: config.max_errors,
        }
    }

    /// Override the slice threshold
    #[must_use]
    pub fn with_max_fragment_size(mut self, max_fragment_size: u64) -> Self {
        self.max_fragment_size = max_fragment_size.max(1);
        self
    }

    /// Index a file on disk.
    ///
    /// Failing to open the file is an `Err`; failures after that end the pass
    /// with a FATAL_PARSE record and a partial index.
    pub fn index_path(&self, path: &Path) -> Result<IndexReport> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        tracing::debug!(path = %path.display(), "indexing");
        Ok(self.index(file))
    }

    /// Index any byte stream
    pub fn index<R: Read>(&self, mut reader: R) -> IndexReport {
        let started = Instant::now();
        let mut scanner = TagScanner::new(self.max_fragment_size);
        let mut builder = FragmentBuilder::new(self.max_errors);
        let mut sink = |event: ScanEvent<'_>| builder.dispatch(event);

        let mut buf = vec![0u8; self.read_buffer_size];
        let mut head: Vec<u8> = Vec::with_capacity(HEAD_LEN);
        let mut head_checked = false;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => {
                    scanner.fail(&e, &mut sink);
                    break;
                }
            };

            if !head_checked {
                let take = (HEAD_LEN - head.len()).min(n);
                head.extend_from_slice(&buf[..take]);
                if head.len() >= HEAD_LEN {
                    check_encoding(&head, &mut sink);
                    head_checked = true;
                }
            }

            scanner.feed(&buf[..n], &mut sink);
        }

        if !head_checked {
            check_encoding(&head, &mut sink);
        }
        let completed = scanner.finish(&mut sink);
        let bytes_scanned = scanner.offset;

        let (index, errors, limit_reached) = builder.finish();
        let elapsed = started.elapsed();
        tracing::debug!(
            units = index.len(),
            errors = errors.len(),
            bytes = bytes_scanned,
            ?elapsed,
            completed,
            "index built"
        );

        IndexReport {
            index,
            errors,
            limit_reached,
            bytes_scanned,
            elapsed,
            completed,
        }
    }
}

fn check_encoding<F: FnMut(ScanEvent<'_>)>(head: &[u8], sink: &mut F) {
    if let Some(message) = encoding_warning(head) {
        sink(ScanEvent::ParseError(ErrorRecord::new(message, 1, ErrorKind::Warning)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Content,
    /// After '<'
    TagStart,
    /// Inside the element name
    TagName,
    /// Inside the tag, waiting for '>'
    WaitGt,
    QuoteSingle,
    QuoteDouble,
    /// After '<!'
    MarkupStart,
    Comment,
    CData,
    /// `<!DOCTYPE ...>` and friends
    Decl,
    /// `<? ... ?>`
    Pi,
    /// The input could not be read; nothing more is scanned
    Fatal,
}

/// Element on the open stack
#[derive(Debug)]
struct OpenTag {
    name: Vec<u8>,
    line: u32,
    column: u32,
}

/// Byte-level tag scanner
///
/// Depth 0 is outside the root, depth 1 is inside the root: an element
/// opened at depth 1 starts a unit.
struct TagScanner {
    state: State,
    max_fragment_size: u64,

    /// Absolute offset of the next byte
    offset: u64,
    /// Line and column of the next byte
    line: u32,
    column: u32,
    /// Line of the last consumed byte
    last_line: u32,

    // Tag being scanned
    tag_start: u64,
    tag_line: u32,
    tag_column: u32,
    tag_name: Vec<u8>,
    closing: bool,
    self_closing: bool,

    /// Consecutive '-' (comments) or ']' (CDATA) seen
    run: u8,
    /// '[' nesting inside a declaration
    decl_depth: u32,
    /// Previous byte was '?' inside a PI
    pi_question: bool,

    /// Open elements, root first
    open: Vec<OpenTag>,
    /// Start of the current unit slice, when a unit is open
    slice_start: Option<u64>,
}

impl TagScanner {
    fn new(max_fragment_size: u64) -> Self {
        Self {
            state: State::Content,
            max_fragment_size,
            offset: 0,
            line: 1,
            column: 1,
            last_line: 1,
            tag_start: 0,
            tag_line: 1,
            tag_column: 1,
            tag_name: Vec::with_capacity(64),
            closing: false,
            self_closing: false,
            run: 0,
            decl_depth: 0,
            pi_question: false,
            open: Vec::with_capacity(32),
            slice_start: None,
        }
    }

    /// Scan one read window
    fn feed<F: FnMut(ScanEvent<'_>)>(&mut self, chunk: &[u8], sink: &mut F) {
        if self.state == State::Fatal {
            return;
        }
        let mut scanner = Scanner::new(chunk);

        while !scanner.is_eof() {
            if self.state == State::Content {
                let run = scanner.skip_text(self.split_budget());
                if run.len > 0 {
                    self.offset += run.len as u64;
                    if run.newlines > 0 {
                        self.line += run.newlines;
                        self.column = run.tail as u32 + 1;
                    } else {
                        self.column += run.len as u32;
                    }
                    self.last_line = if run.ends_with_newline() {
                        self.line - 1
                    } else {
                        self.line
                    };
                    self.check_split(sink);
                    continue;
                }
            }

            match scanner.next_byte() {
                Some(b) => self.step(b, sink),
                None => break,
            }
        }
    }

    /// Bytes that may be consumed before the open slice must be split
    #[inline]
    fn split_budget(&self) -> usize {
        match self.slice_start {
            Some(start) => {
                let used = self.offset - start;
                usize::try_from(self.max_fragment_size.saturating_sub(used))
                    .unwrap_or(usize::MAX)
                    .max(1)
            }
            None => usize::MAX,
        }
    }

    /// Consume one byte
    fn step<F: FnMut(ScanEvent<'_>)>(&mut self, b: u8, sink: &mut F) {
        let at = self.offset;

        match self.state {
            State::Content => {
                if b == b'<' {
                    self.begin_tag(at);
                }
            }
            State::TagStart => match b {
                b'/' => {
                    self.closing = true;
                    self.state = State::TagName;
                }
                b'?' => {
                    self.pi_question = false;
                    self.state = State::Pi;
                }
                b'!' => self.state = State::MarkupStart,
                b'<' => {
                    self.syntax_error("Stray '<' in content", sink);
                    self.begin_tag(at);
                }
                b' ' | b'\t' | b'\n' | b'\r' | b'>' => {
                    self.syntax_error("Invalid character after '<'", sink);
                    self.state = State::Content;
                }
                _ => {
                    self.push_name_byte(b);
                    self.state = State::TagName;
                }
            },
            State::TagName => match b {
                b'>' => self.finish_tag(at + 1, sink),
                b'<' => self.recover(at, sink),
                b'/' => {
                    self.self_closing = true;
                    self.state = State::WaitGt;
                }
                b' ' | b'\t' | b'\n' | b'\r' => self.state = State::WaitGt,
                _ => self.push_name_byte(b),
            },
            State::WaitGt => match b {
                b'>' => self.finish_tag(at + 1, sink),
                b'<' => self.recover(at, sink),
                b'"' => {
                    self.self_closing = false;
                    self.state = State::QuoteDouble;
                }
                b'\'' => {
                    self.self_closing = false;
                    self.state = State::QuoteSingle;
                }
                b'/' => self.self_closing = true,
                b' ' | b'\t' | b'\n' | b'\r' => {}
                _ => self.self_closing = false,
            },
            State::QuoteDouble => match b {
                b'"' => self.state = State::WaitGt,
                b'<' => self.recover(at, sink),
                _ => {}
            },
            State::QuoteSingle => match b {
                b'\'' => self.state = State::WaitGt,
                b'<' => self.recover(at, sink),
                _ => {}
            },
            State::MarkupStart => match b {
                b'-' => {
                    self.run = 0;
                    self.state = State::Comment;
                }
                b'[' => {
                    self.run = 0;
                    self.state = State::CData;
                }
                b'>' => self.state = State::Content,
                _ => {
                    self.decl_depth = 0;
                    self.state = State::Decl;
                }
            },
            State::Comment => match b {
                b'-' => self.run = self.run.saturating_add(1),
                b'>' if self.run >= 2 => self.state = State::Content,
                _ => self.run = 0,
            },
            State::CData => match b {
                b']' => self.run = self.run.saturating_add(1),
                b'>' if self.run >= 2 => self.state = State::Content,
                _ => self.run = 0,
            },
            State::Decl => match b {
                b'[' => self.decl_depth += 1,
                b']' => self.decl_depth = self.decl_depth.saturating_sub(1),
                b'>' if self.decl_depth == 0 => self.state = State::Content,
                _ => {}
            },
            State::Pi => match b {
                b'>' if self.pi_question => self.state = State::Content,
                _ => self.pi_question = b == b'?',
            },
            State::Fatal => return,
        }

        // A recovery restarts on this same '<', which is then the new tag's
        // first byte; either way the byte is consumed here.
        self.offset += 1;
        self.last_line = self.line;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.check_split(sink);
    }

    /// Emit slice boundaries until the open slice is below the threshold
    fn check_split<F: FnMut(ScanEvent<'_>)>(&mut self, sink: &mut F) {
        while let Some(start) = self.slice_start {
            if self.offset - start < self.max_fragment_size {
                break;
            }
            let end = start + self.max_fragment_size;
            let Some(unit) = self.open.get(1) else {
                self.slice_start = None;
                break;
            };
            sink(ScanEvent::EndUnit {
                end,
                line: self.last_line,
            });
            sink(ScanEvent::StartUnit {
                name: &unit.name,
                start: end,
                line: self.line,
                continuation: true,
            });
            self.slice_start = Some(end);
        }
    }

    #[inline]
    fn begin_tag(&mut self, at: u64) {
        self.state = State::TagStart;
        self.tag_start = at;
        self.tag_line = self.line;
        self.tag_column = self.column;
        self.tag_name.clear();
        self.closing = false;
        self.self_closing = false;
    }

    #[inline]
    fn push_name_byte(&mut self, b: u8) {
        if self.tag_name.len() < MAX_NAME_LEN {
            self.tag_name.push(b);
        }
    }

    /// A '<' arrived before the current tag's '>': close the malformed tag
    /// where the new one starts, then restart on the new bracket.
    fn recover<F: FnMut(ScanEvent<'_>)>(&mut self, at: u64, sink: &mut F) {
        let message = format!(
            "Malformed tag <{}{}>: missing '>' before next '<'",
            if self.closing { "/" } else { "" },
            String::from_utf8_lossy(&self.tag_name)
        );
        self.syntax_error(message, sink);
        self.finish_tag(at, sink);
        self.begin_tag(at);
    }

    fn syntax_error<F: FnMut(ScanEvent<'_>)>(&self, message: impl Into<String>, sink: &mut F) {
        sink(ScanEvent::ParseError(
            ErrorRecord::new(message, self.tag_line, ErrorKind::Syntax).at_column(self.tag_column),
        ));
    }

    /// A complete tag ends at `end` (exclusive)
    fn finish_tag<F: FnMut(ScanEvent<'_>)>(&mut self, end: u64, sink: &mut F) {
        self.state = State::Content;

        if self.tag_name.is_empty() {
            self.syntax_error("Empty tag name", sink);
            return;
        }

        if self.closing {
            self.close_tag(end, sink);
        } else if self.self_closing {
            if self.open.len() == 1 {
                sink(ScanEvent::EmptyUnit {
                    name: &self.tag_name,
                    start: self.tag_start,
                    end,
                    line: self.tag_line,
                    end_line: self.line,
                });
            }
        } else {
            if self.open.len() == 1 {
                sink(ScanEvent::StartUnit {
                    name: &self.tag_name,
                    start: self.tag_start,
                    line: self.tag_line,
                    continuation: false,
                });
                self.slice_start = Some(self.tag_start);
            }
            self.open.push(OpenTag {
                name: self.tag_name.clone(),
                line: self.tag_line,
                column: self.tag_column,
            });
        }
    }

    /// Match a closing tag against the open stack (nearest name wins)
    fn close_tag<F: FnMut(ScanEvent<'_>)>(&mut self, end: u64, sink: &mut F) {
        let Some(pos) = self.open.iter().rposition(|t| t.name == self.tag_name) else {
            sink(ScanEvent::ParseError(
                ErrorRecord::new(
                    format!(
                        "Closing tag </{}> has no matching opening tag",
                        String::from_utf8_lossy(&self.tag_name)
                    ),
                    self.tag_line,
                    ErrorKind::Structure,
                )
                .at_column(self.tag_column),
            ));
            return;
        };

        if pos + 1 < self.open.len() {
            if let Some(top) = self.open.last() {
                sink(ScanEvent::ParseError(
                    ErrorRecord::new(
                        format!(
                            "Mismatched closing tag </{}>: expected </{}>",
                            String::from_utf8_lossy(&self.tag_name),
                            String::from_utf8_lossy(&top.name)
                        ),
                        self.tag_line,
                        ErrorKind::Structure,
                    )
                    .at_column(self.tag_column),
                ));
            }
            for skipped in self.open[pos + 1..].iter().rev() {
                sink(ScanEvent::ParseError(unclosed(skipped)));
            }
        }

        let unit_open = self.open.len() >= 2;
        self.open.truncate(pos);

        if unit_open && self.open.len() <= 1 && self.slice_start.is_some() {
            // The unit element closes here, or was closed implicitly by an
            // ancestor's end tag which then does not belong to it.
            let (end, line) = if pos == 1 {
                (end, self.line)
            } else {
                (self.tag_start, self.tag_line)
            };
            sink(ScanEvent::EndUnit { end, line });
            self.slice_start = None;
        }
    }

    /// A read failed: report once and stop
    fn fail<F: FnMut(ScanEvent<'_>)>(&mut self, error: &std::io::Error, sink: &mut F) {
        tracing::warn!(offset = self.offset, %error, "read failed, index is partial");
        sink(ScanEvent::ParseError(ErrorRecord::new(
            format!("Read failed at byte {}: {}", self.offset, error),
            self.line,
            ErrorKind::FatalParse,
        )));
        self.state = State::Fatal;
    }

    /// End of input. Returns false if the pass was aborted.
    fn finish<F: FnMut(ScanEvent<'_>)>(&mut self, sink: &mut F) -> bool {
        let message = match self.state {
            State::Fatal => return false,
            State::Content => None,
            State::TagStart | State::TagName | State::WaitGt => {
                Some("Unterminated tag at end of input")
            }
            State::QuoteSingle | State::QuoteDouble => {
                Some("Unterminated attribute value at end of input")
            }
            State::MarkupStart | State::Decl => Some("Unterminated declaration at end of input"),
            State::Comment => Some("Unterminated comment at end of input"),
            State::CData => Some("Unterminated CDATA section at end of input"),
            State::Pi => Some("Unterminated processing instruction at end of input"),
        };
        if let Some(message) = message {
            self.syntax_error(message, sink);
        }

        // An unterminated unit keeps its bytes addressable
        if self.slice_start.take().is_some() {
            sink(ScanEvent::EndUnit {
                end: self.offset,
                line: self.last_line,
            });
        }

        for tag in self.open.drain(..).rev() {
            sink(ScanEvent::ParseError(unclosed(&tag)));
        }
        self.state = State::Content;
        true
    }
}

fn unclosed(tag: &OpenTag) -> ErrorRecord {
    ErrorRecord::new(
        format!(
            "Unclosed tag <{}> opened at line {}",
            String::from_utf8_lossy(&tag.name),
            tag.line
        ),
        tag.line,
        ErrorKind::Structure,
    )
    .at_column(tag.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FragmentStatus;

    fn index_bytes(input: &[u8]) -> IndexReport {
        StructuralIndexer::new(&Config::default()).index(input)
    }

    fn unit_texts<'a>(input: &'a [u8], report: &IndexReport) -> Vec<&'a [u8]> {
        report
            .index
            .iter()
            .map(|f| &input[f.start as usize..f.end as usize])
            .collect()
    }

    #[test]
    fn test_simple_units() {
        let input = b"<?xml version=\"1.0\"?>\n<root>\n  <a x=\"1\">t</a>\n  <b/>\n  <c>\n  </c>\n</root>\n";
        let report = index_bytes(input);
        assert!(report.completed);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(
            unit_texts(input, &report),
            vec![&b"<a x=\"1\">t</a>"[..], b"<b/>", b"<c>\n  </c>"]
        );
        let c = report.index.fragment(2).unwrap();
        assert_eq!((c.start_line, c.end_line), (5, 6));
        assert_eq!(report.index.name_of(c), Some("c"));
        assert_eq!(report.bytes_scanned, input.len() as u64);
    }

    #[test]
    fn test_nested_elements_stay_in_unit() {
        let input = b"<root><item><x><y/></x></item><item/></root>";
        let report = index_bytes(input);
        assert_eq!(
            unit_texts(input, &report),
            vec![&b"<item><x><y/></x></item>"[..], b"<item/>"]
        );
    }

    #[test]
    fn test_markup_is_opaque() {
        let input = b"<root><!-- <fake> --><a><![CDATA[ </a> ]]></a><!DOCTYPE x [<!ENTITY e \"v\">]><?pi <b> ?></root>";
        let report = index_bytes(input);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(unit_texts(input, &report), vec![&b"<a><![CDATA[ </a> ]]></a>"[..]]);
    }

    #[test]
    fn test_gt_inside_attribute() {
        let input = b"<root><a href=\"x>y\" t='>'>z</a></root>";
        let report = index_bytes(input);
        assert_eq!(unit_texts(input, &report), vec![&b"<a href=\"x>y\" t='>'>z</a>"[..]]);
    }

    #[test]
    fn test_malformed_tag_recovery() {
        let input = b"<root><a attr=\"1\"<b>text</b></a></root>";
        let report = index_bytes(input);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Syntax);
        assert_eq!(unit_texts(input, &report), vec![&b"<a attr=\"1\"<b>text</b></a>"[..]]);
        assert_eq!(report.index.status(report.index.fragment(0).unwrap().id()), FragmentStatus::Malformed);
    }

    #[test]
    fn test_mismatch_nearest_match() {
        let input = b"<root>\n<child>\n</root>";
        let report = index_bytes(input);
        let messages: Vec<&str> = report.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Mismatched closing tag </root>: expected </child>",
                "Unclosed tag <child> opened at line 2",
            ]
        );
        assert_eq!(report.errors[0].line, 3);
        assert_eq!(report.errors[1].line, 2);
        // The unit ends where the root's end tag starts
        assert_eq!(unit_texts(input, &report), vec![&b"<child>\n"[..]]);
    }

    #[test]
    fn test_orphan_close() {
        let report = index_bytes(b"<root><a></b></a></root>");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("no matching opening tag"));
        assert_eq!(report.index.len(), 1);
    }

    #[test]
    fn test_unclosed_at_eof_keeps_unit() {
        let input = b"<root><a><b>";
        let report = index_bytes(input);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors.iter().all(|e| e.kind == ErrorKind::Structure));
        assert_eq!(unit_texts(input, &report), vec![&b"<a><b>"[..]]);
    }

    #[test]
    fn test_unterminated_comment() {
        let report = index_bytes(b"<root><!-- never ends");
        assert!(report.errors.iter().any(|e| e.message.contains("Unterminated comment")));
    }

    #[test]
    fn test_split_oversized_unit() {
        let mut input = b"<root><big>".to_vec();
        input.extend(std::iter::repeat(b'x').take(250));
        input.extend_from_slice(b"</big><small/></root>");

        let report = StructuralIndexer::new(&Config::default())
            .with_max_fragment_size(100)
            .index(&input[..]);
        let fragments = report.index.fragments();
        assert_eq!(fragments.len(), 4);
        assert!(fragments.iter().all(|f| f.len() <= 100));
        assert!(!fragments[0].is_continuation());
        assert!(fragments[1].is_continuation());
        assert!(fragments[2].is_continuation());
        assert!(!fragments[3].is_continuation());
        // Slices are contiguous and cover the unit exactly
        assert_eq!(fragments[0].start, 6);
        assert_eq!(fragments[0].end, fragments[1].start);
        assert_eq!(fragments[1].end, fragments[2].start);
        assert_eq!(&input[fragments[2].end as usize - 6..fragments[2].end as usize], b"</big>");
        assert_eq!(report.index.head_of(2).unwrap().index, 0);
    }

    #[test]
    fn test_small_read_windows_match_large() {
        let input = b"<root>\n<a>1</a>\n<b k='v'>2</b>\n<c/>\n</root>\n";
        let whole = index_bytes(input);
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = self.0.len().min(buf.len()).min(3);
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }
        let trickled = index_bytes_from(Trickle(input));
        assert_eq!(whole.index.fragments(), trickled.index.fragments());
    }

    #[test]
    fn test_read_failure_is_fatal() {
        struct Broken(usize);
        impl Read for Broken {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0 == 0 {
                    return Err(std::io::Error::other("disk gone"));
                }
                let part = b"<root><a/>";
                let n = part.len().min(buf.len());
                buf[..n].copy_from_slice(&part[..n]);
                self.0 -= 1;
                Ok(n)
            }
        }
        let report = index_bytes_from(Broken(1));
        assert!(!report.completed);
        assert_eq!(report.index.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::FatalParse);
    }

    fn index_bytes_from<R: Read>(reader: R) -> IndexReport {
        StructuralIndexer::new(&Config::default()).index(reader)
    }

    #[test]
    fn test_read_failure_reported_past_error_cap() {
        struct FailsAfter(Option<&'static [u8]>);
        impl Read for FailsAfter {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.0.take() {
                    Some(part) => {
                        buf[..part.len()].copy_from_slice(part);
                        Ok(part.len())
                    }
                    None => Err(std::io::Error::other("disk gone")),
                }
            }
        }
        let config = Config {
            max_errors: 2,
            ..Config::default()
        };
        let report = StructuralIndexer::new(&config).index(FailsAfter(Some(b"<root></a></b></c></d>")));
        assert!(!report.completed);
        assert!(report.limit_reached);
        let kinds: Vec<ErrorKind> = report.errors.iter().map(|e| e.kind).collect();
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
    fn test_encoding_warning() {
        let report = index_bytes(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><root/>");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].is_warning());
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_error_cap() {
        let mut input = b"<root>".to_vec();
        for i in 0..50 {
            input.extend_from_slice(format!("</x{i}>").as_bytes());
        }
        input.extend_from_slice(b"</root>");
        let config = Config {
            max_errors: 10,
            ..Config::default()
        };
        let report = StructuralIndexer::new(&config).index(&input[..]);
        assert!(report.limit_reached);
        assert_eq!(report.errors.len(), 11);
        assert_eq!(report.error_count(), 10);
    }
}
