//! Patched reader
//!
//! Streams "original with patches applied" without building it. The reader
//! walks the original forward; when the physical position reaches the next
//! patch it serves that patch's text and then skips the replaced span.
//!
//! State is two offsets, the index of the next patch and a position inside the
//! active patch text. Nothing of the original is held beyond the caller's
//! buffer.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::edit::{validate_patch_set, Patch};
use crate::error::Result;

/// Forward-only reader over `inner` with `patches` applied
#[derive(Debug)]
pub struct PatchedReader<R: Read + Seek> {
    inner: R,
    original_len: u64,
    patches: Arc<Vec<Patch>>,
    /// Offset in the original
    physical: u64,
    /// Offset in the output
    logical: u64,
    next: usize,
    /// Patch being served and how much of its text went out already
    active: Option<(usize, usize)>,
    need_seek: bool,
    len: u64,
}

impl<R: Read + Seek> PatchedReader<R> {
    /// Wrap `inner`, an original of `original_len` bytes.
    ///
    /// Fails with `InvalidPatchSet` unless the patches are sorted,
    /// non-overlapping and inside the original.
    pub fn new(inner: R, original_len: u64, patches: Arc<Vec<Patch>>) -> Result<Self> {
        validate_patch_set(&patches, original_len)?;
        let delta: i64 = patches.iter().map(Patch::delta).sum();
        let len = (original_len as i64 + delta) as u64;
        Ok(Self {
            inner,
            original_len,
            patches,
            physical: 0,
            logical: 0,
            next: 0,
            active: None,
            need_seek: true,
            len,
        })
    }

    /// Length of the patched document
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes produced so far
    #[inline]
    pub fn position(&self) -> u64 {
        self.logical
    }

    /// Serve from the active patch, or retire it. `None` once the patch is
    /// exhausted.
    fn serve_patch(&mut self, index: usize, served: usize, buf: &mut [u8]) -> Option<usize> {
        let patch = &self.patches[index];
        let text = patch.text().as_bytes();
        if served < text.len() {
            let n = buf.len().min(text.len() - served);
            buf[..n].copy_from_slice(&text[served..served + n]);
            self.active = Some((index, served + n));
            return Some(n);
        }

        if patch.end() != self.physical {
            self.physical = patch.end();
            self.need_seek = true;
        }
        self.active = None;
        self.next = index + 1;
        None
    }
}

impl<R: Read + Seek> Read for PatchedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if let Some((index, served)) = self.active {
                if let Some(n) = self.serve_patch(index, served, buf) {
                    self.logical += n as u64;
                    return Ok(n);
                }
                continue;
            }

            let limit = match self.patches.get(self.next) {
                Some(patch) if patch.start() == self.physical => {
                    self.active = Some((self.next, 0));
                    continue;
                }
                Some(patch) => patch.start(),
                None => self.original_len,
            };
            if self.physical >= limit {
                return Ok(0);
            }

            if self.need_seek {
                self.inner.seek(SeekFrom::Start(self.physical))?;
                self.need_seek = false;
            }
            let want = buf.len().min((limit - self.physical) as usize);
            let n = self.inner.read(&mut buf[..want])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "original ended at byte {} of {}",
                        self.physical, self.original_len
                    ),
                ));
            }
            self.physical += n as u64;
            self.logical += n as u64;
            return Ok(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::splice;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn stream(original: &[u8], patches: Vec<Patch>) -> Vec<u8> {
        let mut reader =
            PatchedReader::new(Cursor::new(original.to_vec()), original.len() as u64, Arc::new(patches))
                .unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len() as u64, reader.len());
        out
    }

    #[test]
    fn test_no_patches() {
        assert_eq!(stream(b"<root/>", Vec::new()), b"<root/>");
        assert_eq!(stream(b"", Vec::new()), b"");
    }

    #[test]
    fn test_replace() {
        let out = stream(
            b"<root><item>Original</item></root>",
            vec![Patch::replace(12, 20, "Patched").unwrap()],
        );
        assert_eq!(out, b"<root><item>Patched</item></root>");
    }

    #[test]
    fn test_patches_at_both_ends() {
        let out = stream(
            b"<a/>",
            vec![
                Patch::insert(0, "<?xml version=\"1.0\"?>"),
                Patch::delete(0, 1).unwrap(),
                Patch::insert(4, "\n"),
            ],
        );
        assert_eq!(out, b"<?xml version=\"1.0\"?>a/>\n");
    }

    #[test]
    fn test_insert_before_replace_at_same_offset() {
        let patches = vec![Patch::insert(3, "[i]"), Patch::replace(3, 5, "[r]").unwrap()];
        let out = stream(b"0123456", patches.clone());
        assert_eq!(out, splice(b"0123456", &patches).unwrap());
        assert_eq!(out, b"012[i][r]56");
    }

    #[test]
    fn test_one_byte_reads() {
        let original = b"<r><a>1</a><b>2</b></r>";
        let patches = vec![
            Patch::replace(6, 7, "one").unwrap(),
            Patch::delete(11, 19).unwrap(),
        ];
        let mut reader =
            PatchedReader::new(Cursor::new(original.to_vec()), original.len() as u64, Arc::new(patches))
                .unwrap();
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while reader.read(&mut byte).unwrap() == 1 {
            out.push(byte[0]);
        }
        assert_eq!(out, b"<r><a>one</a></r>");
        assert_eq!(reader.position(), out.len() as u64);
    }

    #[test]
    fn test_invalid_patch_sets_rejected() {
        let original = Cursor::new(b"0123456789".to_vec());
        let overlapping = vec![
            Patch::replace(0, 5, "").unwrap(),
            Patch::replace(4, 6, "").unwrap(),
        ];
        assert!(PatchedReader::new(original.clone(), 10, Arc::new(overlapping)).is_err());
        assert!(PatchedReader::new(original, 10, Arc::new(vec![Patch::insert(11, "x")])).is_err());
    }

    #[test]
    fn test_truncated_original() {
        let mut reader = PatchedReader::new(Cursor::new(b"abc".to_vec()), 10, Arc::new(Vec::new())).unwrap();
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
