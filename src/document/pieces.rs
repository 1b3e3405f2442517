//! Piece reader
//!
//! Streams a [`PieceTable`] piece by piece. Append pieces are copied from the
//! add buffer; original pieces are read through one lazily opened handle that
//! is re-seeked at each piece boundary.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use super::original::OriginalReader;
use crate::edit::{PieceTable, Source};

#[derive(Debug)]
pub struct PieceReader {
    table: Arc<PieceTable>,
    piece: usize,
    offset: u64,
    handle: Option<OriginalReader>,
    need_seek: bool,
}

impl PieceReader {
    pub fn new(table: Arc<PieceTable>) -> Self {
        Self {
            table,
            piece: 0,
            offset: 0,
            handle: None,
            need_seek: true,
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Read for PieceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let Some(&piece) = self.table.pieces().get(self.piece) else {
                return Ok(0);
            };
            if self.offset == piece.len {
                self.piece += 1;
                self.offset = 0;
                self.need_seek = true;
                continue;
            }

            let want = buf.len().min((piece.len - self.offset) as usize);
            let from = piece.start + self.offset;
            let n = match piece.source {
                Source::Append => {
                    buf[..want].copy_from_slice(self.table.append_slice(from, want as u64));
                    want
                }
                Source::Original => {
                    let handle = match &mut self.handle {
                        Some(handle) => handle,
                        slot @ None => slot.insert(
                            self.table
                                .original()
                                .reader()
                                .map_err(|e| io::Error::other(e.to_string()))?,
                        ),
                    };
                    if self.need_seek {
                        handle.seek(SeekFrom::Start(from))?;
                        self.need_seek = false;
                    }
                    let n = handle.read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("original ended inside piece at byte {from}"),
                        ));
                    }
                    n
                }
            };
            self.offset += n as u64;
            return Ok(n);
        }
    }
}
