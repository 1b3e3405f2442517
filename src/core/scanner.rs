//! SIMD-accelerated XML scanning using memchr
//!
//! Uses memchr crate for fast byte searching with SIMD acceleration:
//! - SSE2 (default x86_64)
//! - AVX2 (runtime detection)
//! - NEON (aarch64)
//!
//! The scanner is a cursor over one buffer. The indexer runs one per read
//! window; the quick checker runs one over a whole unit.

use memchr::{memchr, memchr3, memchr_iter, memmem, memrchr};

/// Result of skipping a run of character data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRun {
    /// Bytes skipped
    pub len: usize,
    /// Newlines inside the run
    pub newlines: u32,
    /// Bytes after the last newline (the whole run if there is none)
    pub tail: usize,
}

impl TextRun {
    /// Whether the last skipped byte was a newline
    #[inline]
    pub fn ends_with_newline(&self) -> bool {
        self.newlines > 0 && self.tail == 0
    }
}

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get remaining bytes
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Consume and return the current byte
    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip character data up to the next '<', consuming at most `limit` bytes.
    ///
    /// Newlines are counted so callers can keep line/column positions without
    /// visiting every byte.
    #[inline]
    pub fn skip_text(&mut self, limit: usize) -> TextRun {
        let rest = self.remaining();
        let window = &rest[..limit.min(rest.len())];
        let len = memchr(b'<', window).unwrap_or(window.len());
        let run = &window[..len];
        self.pos += len;

        let newlines = memchr_iter(b'\n', run).count() as u32;
        let tail = match memrchr(b'\n', run) {
            Some(i) => len - i - 1,
            None => len,
        };
        TextRun {
            len,
            newlines,
            tail,
        }
    }

    /// Find next occurrence of a specific byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining()).map(|i| self.pos + i)
    }

    /// Find next occurrence of any of three bytes
    #[inline]
    pub fn find_byte3(&self, b1: u8, b2: u8, b3: u8) -> Option<usize> {
        memchr3(b1, b2, b3, self.remaining()).map(|i| self.pos + i)
    }

    /// Find the next occurrence of a multi-byte terminator (`-->`, `]]>`)
    #[inline]
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Read raw tag-name bytes up to whitespace, '/', '>' or '<'
    pub fn read_raw_name(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_name_terminator(b) {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }
}

/// Check if byte is valid XML name start character
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
pub(crate) fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character
/// Allows ASCII alphanumeric, punctuation, and non-ASCII (UTF-8 Unicode)
#[inline]
pub(crate) fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

/// Bytes that end a tag name
#[inline]
pub(crate) fn is_name_terminator(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'/' | b'>' | b'<')
}

/// Whether a whole name is a valid XML name
pub(crate) fn is_valid_name(name: &[u8]) -> bool {
    match name.split_first() {
        Some((&first, rest)) => is_name_start_char(first) && rest.iter().all(|&b| is_name_char(b)),
        None => false,
    }
}
