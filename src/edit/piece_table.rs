//! Piece table
//!
//! The logical document is an ordered list of pieces, each a slice of either
//! the immutable original or the append-only add buffer. Edits only touch the
//! piece list, so their cost depends on the number of pieces, never on the
//! size of the file. Original bytes are fetched when a range is read.

use std::io::{Read, Seek, SeekFrom};

use super::patch::{validate_patch_set, Patch};
use crate::document::{Original, OriginalReader};
use crate::error::{Error, Result};

/// Buffer a piece points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Original,
    Append,
}

/// Slice of one of the two buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub source: Source,
    pub start: u64,
    pub len: u64,
}

impl Piece {
    #[inline]
    fn new(source: Source, start: u64, len: u64) -> Self {
        Self { source, start, len }
    }

    #[inline]
    fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Edit state of a session: original + add buffer + piece list
#[derive(Debug, Clone)]
pub struct PieceTable {
    original: Original,
    add: Vec<u8>,
    pieces: Vec<Piece>,
    len: u64,
}

impl PieceTable {
    pub fn new(original: Original) -> Self {
        let len = original.len();
        let pieces = if len > 0 {
            vec![Piece::new(Source::Original, 0, len)]
        } else {
            Vec::new()
        };
        Self {
            original,
            add: Vec::new(),
            pieces,
            len,
        }
    }

    /// Table equivalent to applying a sorted, non-overlapping patch set.
    ///
    /// Patches are applied back to front, so each one still sees the
    /// original coordinates it was written against.
    pub fn from_patches(original: Original, patches: &[Patch]) -> Result<Self> {
        validate_patch_set(patches, original.len())?;
        let mut table = Self::new(original);
        for patch in patches.iter().rev() {
            table.replace(patch.start(), patch.removed_len(), patch.text().as_bytes())?;
        }
        Ok(table)
    }

    /// Logical document length
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Bytes held in the add buffer
    #[inline]
    pub fn append_len(&self) -> usize {
        self.add.len()
    }

    #[inline]
    pub fn original(&self) -> &Original {
        &self.original
    }

    /// Slice of the add buffer referenced by an append piece
    #[inline]
    pub(crate) fn append_slice(&self, start: u64, len: u64) -> &[u8] {
        &self.add[start as usize..(start + len) as usize]
    }

    /// Piece containing `offset` and the offset inside it. At the end of the
    /// document this is `(pieces.len(), 0)`.
    fn locate(&self, offset: u64) -> (usize, u64) {
        self.locate_from(0, offset)
    }

    /// `locate`, scanning from piece `first`; `offset` is relative to that
    /// piece's start.
    fn locate_from(&self, first: usize, offset: u64) -> (usize, u64) {
        let mut pos = 0u64;
        for (i, piece) in self.pieces[first..].iter().enumerate() {
            if offset < pos + piece.len {
                return (first + i, offset - pos);
            }
            pos += piece.len;
        }
        (self.pieces.len(), 0)
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<u64> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(end),
            _ => Err(Error::OutOfBounds {
                offset: offset.saturating_add(len),
                len: self.len,
            }),
        }
    }

    /// Insert `text` before the byte at `offset`
    pub fn insert(&mut self, offset: u64, text: &[u8]) -> Result<()> {
        self.check_range(offset, 0)?;
        if text.is_empty() {
            return Ok(());
        }

        let add_start = self.add.len() as u64;
        self.add.extend_from_slice(text);
        let added = text.len() as u64;
        let (i, inner) = self.locate(offset);

        if inner == 0 {
            // Typing at the end of the previous insert extends that piece
            let extends = i > 0 && {
                let prev = &self.pieces[i - 1];
                prev.source == Source::Append && prev.end() == add_start
            };
            if extends {
                self.pieces[i - 1].len += added;
            } else {
                self.pieces.insert(i, Piece::new(Source::Append, add_start, added));
            }
        } else {
            let piece = self.pieces[i];
            let left = Piece::new(piece.source, piece.start, inner);
            let right = Piece::new(piece.source, piece.start + inner, piece.len - inner);
            self.pieces[i] = left;
            self.pieces
                .splice(i + 1..i + 1, [Piece::new(Source::Append, add_start, added), right]);
        }

        self.len += added;
        Ok(())
    }

    /// Remove `len` bytes starting at `offset`
    pub fn delete(&mut self, offset: u64, len: u64) -> Result<()> {
        let end = self.check_range(offset, len)?;
        if len == 0 {
            return Ok(());
        }

        let (first, head) = self.locate(offset);
        let (last, tail) = self.locate_from(first, head + len);
        debug_assert!(first < self.pieces.len());

        // Only pieces first..=last change: keep the head of the first and
        // the tail of the last, drop everything between.
        let mut edge = Vec::with_capacity(2);
        if head > 0 {
            let piece = self.pieces[first];
            edge.push(Piece::new(piece.source, piece.start, head));
        }
        let upto = if tail > 0 {
            let piece = self.pieces[last];
            edge.push(Piece::new(piece.source, piece.start + tail, piece.len - tail));
            last + 1
        } else {
            last
        };
        self.pieces.splice(first..upto, edge);

        debug_assert!(end <= self.len);
        self.len -= len;
        Ok(())
    }

    /// Replace `len` bytes at `offset` with `text`
    pub fn replace(&mut self, offset: u64, len: u64, text: &[u8]) -> Result<()> {
        self.check_range(offset, len)?;
        self.delete(offset, len)?;
        self.insert(offset, text)
    }

    /// Materialize `len` bytes starting at `offset`
    pub fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let end = self.check_range(offset, len)?;
        let mut out = Vec::with_capacity(len as usize);
        let mut handle: Option<OriginalReader> = None;

        let (first, mut inner) = self.locate(offset);
        let mut remaining = end - offset;
        for piece in &self.pieces[first..] {
            if remaining == 0 {
                break;
            }
            let take = (piece.len - inner).min(remaining);
            let from = piece.start + inner;
            match piece.source {
                Source::Append => out.extend_from_slice(self.append_slice(from, take)),
                Source::Original => {
                    let reader = match &mut handle {
                        Some(reader) => reader,
                        slot @ None => slot.insert(self.original.reader()?),
                    };
                    let at = out.len();
                    out.resize(at + take as usize, 0);
                    reader.seek(SeekFrom::Start(from))?;
                    reader.read_exact(&mut out[at..])?;
                }
            }
            remaining -= take;
            inner = 0;
        }
        Ok(out)
    }

    /// Whole logical document. Only sensible for small documents.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.read(0, self.len)
    }
}
