//! Virtual document
//!
//! One `Read` over the logically edited document, whichever edit
//! representation backs it. Validation, re-indexing and saving all consume
//! this type.

use std::io::{self, Read};
use std::sync::Arc;

use super::original::{Original, OriginalReader};
use super::patched::PatchedReader;
use super::pieces::PieceReader;
use crate::edit::{Patch, PieceTable};
use crate::error::Result;

#[derive(Debug)]
pub enum VirtualDocument {
    Patched(PatchedReader<OriginalReader>),
    Pieces(PieceReader),
}

impl VirtualDocument {
    /// Stream `original` with a sorted, non-overlapping patch set applied
    pub fn from_patches(original: &Original, patches: Arc<Vec<Patch>>) -> Result<Self> {
        let reader = PatchedReader::new(original.reader()?, original.len(), patches)?;
        Ok(VirtualDocument::Patched(reader))
    }

    /// Stream a piece table
    pub fn from_table(table: Arc<PieceTable>) -> Self {
        VirtualDocument::Pieces(PieceReader::new(table))
    }

    /// Logical length of the document
    pub fn len(&self) -> u64 {
        match self {
            VirtualDocument::Patched(reader) => reader.len(),
            VirtualDocument::Pieces(reader) => reader.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Read for VirtualDocument {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            VirtualDocument::Patched(reader) => reader.read(buf),
            VirtualDocument::Pieces(reader) => reader.read(buf),
        }
    }
}
