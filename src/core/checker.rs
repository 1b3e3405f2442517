//! Quick syntax checker
//!
//! O(n) single pass over a small, freshly edited snippet (typically one unit):
//! bracket matching, comment and CDATA closure, tag name validity and
//! open/close matching. No tree is built and nothing is validated against a
//! schema; this is what runs on every keystroke-sized edit.
//!
//! On a mismatched closing tag the top of the open stack is popped, so
//! `<root><child></root>` reports the mismatch at `</root>` and then `<root>`
//! as unclosed.

use std::fmt;

use memchr::memchr_iter;

use super::scanner::{is_valid_name, Scanner};
use crate::diagnostics::{ErrorKind, ErrorRecord};

/// Category of a quick-check finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    UnclosedTag,
    MismatchedTag,
    UnclosedBracket,
    UnclosedComment,
    UnclosedCdata,
    InvalidTagName,
    UnexpectedCloseTag,
}

impl SyntaxErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            SyntaxErrorKind::UnclosedTag => "UNCLOSED_TAG",
            SyntaxErrorKind::MismatchedTag => "MISMATCHED_TAG",
            SyntaxErrorKind::UnclosedBracket => "UNCLOSED_BRACKET",
            SyntaxErrorKind::UnclosedComment => "UNCLOSED_COMMENT",
            SyntaxErrorKind::UnclosedCdata => "UNCLOSED_CDATA",
            SyntaxErrorKind::InvalidTagName => "INVALID_TAG_NAME",
            SyntaxErrorKind::UnexpectedCloseTag => "UNEXPECTED_CLOSE_TAG",
        }
    }

    /// Diagnostic kind used when the finding is reported to a client
    pub const fn error_kind(self) -> ErrorKind {
        match self {
            SyntaxErrorKind::UnclosedTag
            | SyntaxErrorKind::MismatchedTag
            | SyntaxErrorKind::UnexpectedCloseTag => ErrorKind::Structure,
            _ => ErrorKind::Syntax,
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One finding, positioned relative to the checked text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based line within the checked text
    pub line: u32,
    /// 1-based byte column
    pub column: u32,
    pub message: String,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    /// Convert to a diagnostic, shifting lines so that line 1 of the checked
    /// text lands on `first_line` of the document.
    pub fn to_record(&self, first_line: u32) -> ErrorRecord {
        ErrorRecord::new(
            self.message.clone(),
            first_line.saturating_add(self.line.saturating_sub(1)),
            self.kind.error_kind(),
        )
        .at_column(self.column)
    }
}

/// Line/column bookkeeping that only visits the bytes between tags once
struct Position<'a> {
    text: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Position<'a> {
    fn new(text: &'a [u8]) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    /// Move forward to `target`, returning its (line, column)
    fn at(&mut self, target: usize) -> (u32, u32) {
        if target > self.pos {
            for nl in memchr_iter(b'\n', &self.text[self.pos..target]) {
                self.line += 1;
                self.line_start = self.pos + nl + 1;
            }
            self.pos = target;
        }
        (self.line, (target - self.line_start) as u32 + 1)
    }
}

#[derive(Debug)]
struct OpenTag<'a> {
    name: &'a [u8],
    line: u32,
    column: u32,
}

/// Check a snippet and return every finding, in document order
pub fn check(text: &[u8]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();
    let mut stack: Vec<OpenTag<'_>> = Vec::new();
    let mut scanner = Scanner::new(text);
    let mut position = Position::new(text);

    while let Some(open) = scanner.find_byte(b'<') {
        let here = position.at(open);
        scanner.set_position(open);

        if scanner.peek_at(1).is_none() {
            push(&mut errors, here, SyntaxErrorKind::UnclosedBracket, "Unclosed bracket '<'".into());
            break;
        }

        if scanner.starts_with(b"<!--") {
            scanner.advance(4);
            match scanner.find_seq(b"-->") {
                Some(end) => scanner.set_position(end + 3),
                None => {
                    push(&mut errors, here, SyntaxErrorKind::UnclosedComment, "Unclosed comment".into());
                    break;
                }
            }
            continue;
        }

        if scanner.starts_with(b"<![CDATA[") {
            scanner.advance(9);
            match scanner.find_seq(b"]]>") {
                Some(end) => scanner.set_position(end + 3),
                None => {
                    push(&mut errors, here, SyntaxErrorKind::UnclosedCdata, "Unclosed CDATA section".into());
                    break;
                }
            }
            continue;
        }

        if matches!(scanner.peek_at(1), Some(b'?' | b'!')) {
            match scanner.find_byte(b'>') {
                Some(end) => scanner.set_position(end + 1),
                None => {
                    push(&mut errors, here, SyntaxErrorKind::UnclosedBracket, "Unclosed bracket '<'".into());
                    break;
                }
            }
            continue;
        }

        scanner.advance(1);
        let closing = scanner.peek() == Some(b'/');
        if closing {
            scanner.advance(1);
        }
        let name = scanner.read_raw_name();

        let Some(gt) = find_tag_end(&mut scanner) else {
            push(
                &mut errors,
                here,
                SyntaxErrorKind::UnclosedBracket,
                format!("Unclosed tag '<{}'", String::from_utf8_lossy(name)),
            );
            break;
        };
        let self_closing = gt > 0 && text[gt - 1] == b'/';
        scanner.set_position(gt + 1);

        if !is_valid_name(name) {
            push(
                &mut errors,
                here,
                SyntaxErrorKind::InvalidTagName,
                format!("Invalid tag name '{}'", String::from_utf8_lossy(name)),
            );
            continue;
        }

        if closing {
            match stack.last() {
                None => push(
                    &mut errors,
                    here,
                    SyntaxErrorKind::UnexpectedCloseTag,
                    format!("Unexpected closing tag '</{}>'", String::from_utf8_lossy(name)),
                ),
                Some(top) if top.name != name => {
                    push(
                        &mut errors,
                        here,
                        SyntaxErrorKind::MismatchedTag,
                        format!(
                            "Mismatched tag: expected '</{}>' but found '</{}>'",
                            String::from_utf8_lossy(top.name),
                            String::from_utf8_lossy(name)
                        ),
                    );
                    stack.pop();
                }
                Some(_) => {
                    stack.pop();
                }
            }
        } else if !self_closing {
            stack.push(OpenTag {
                name,
                line: here.0,
                column: here.1,
            });
        }
    }

    while let Some(tag) = stack.pop() {
        push(
            &mut errors,
            (tag.line, tag.column),
            SyntaxErrorKind::UnclosedTag,
            format!("Unclosed tag '<{}>'", String::from_utf8_lossy(tag.name)),
        );
    }

    // Unclosed tags are found last but belong where they were opened
    errors.sort_by_key(|e| (e.line, e.column));
    errors
}

fn push(errors: &mut Vec<SyntaxError>, (line, column): (u32, u32), kind: SyntaxErrorKind, message: String) {
    errors.push(SyntaxError {
        line,
        column,
        message,
        kind,
    });
}

/// Whether a snippet has no findings
pub fn is_well_formed(text: &[u8]) -> bool {
    check(text).is_empty()
}

/// Position of the '>' ending the current tag, skipping quoted values
fn find_tag_end(scanner: &mut Scanner<'_>) -> Option<usize> {
    loop {
        let pos = scanner.find_byte3(b'>', b'"', b'\'')?;
        scanner.set_position(pos);
        match scanner.next_byte()? {
            b'>' => return Some(pos),
            quote => {
                let close = scanner.find_byte(quote)?;
                scanner.set_position(close + 1);
            }
        }
    }
}
