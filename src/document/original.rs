//! Original document bytes
//!
//! The file being edited is never modified outside an explicit save. Every
//! reader gets its own handle, so concurrent consumers never share a seek
//! position.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Immutable source of the unedited document
#[derive(Debug, Clone)]
pub enum Original {
    /// Bytes held in memory (tests, small snippets)
    Memory(Arc<[u8]>),
    /// A file on disk, with the length it had when opened
    File { path: PathBuf, len: u64 },
}

impl Original {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Original::Memory(Arc::from(bytes.into()))
    }

    /// Reference a file on disk
    pub fn open(path: &Path) -> Result<Self> {
        let len = std::fs::metadata(path).map_err(|e| Error::io(path, e))?.len();
        Ok(Original::File {
            path: path.to_path_buf(),
            len,
        })
    }

    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            Original::Memory(bytes) => bytes.len() as u64,
            Original::File { len, .. } => *len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Original::Memory(_) => None,
            Original::File { path, .. } => Some(path),
        }
    }

    /// Open a fresh reader positioned at offset 0
    pub fn reader(&self) -> Result<OriginalReader> {
        match self {
            Original::Memory(bytes) => Ok(OriginalReader::Memory(Cursor::new(bytes.clone()))),
            Original::File { path, .. } => File::open(path)
                .map(OriginalReader::File)
                .map_err(|e| Error::io(path, e)),
        }
    }

    /// Read `[start, end)` into a new buffer
    pub fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        if start > end || end > self.len() {
            return Err(Error::OutOfBounds {
                offset: end,
                len: self.len(),
            });
        }
        let mut buf = vec![0u8; (end - start) as usize];
        match self {
            Original::Memory(bytes) => buf.copy_from_slice(&bytes[start as usize..end as usize]),
            Original::File { path, .. } => {
                let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
                file.seek(SeekFrom::Start(start))
                    .and_then(|_| file.read_exact(&mut buf))
                    .map_err(|e| Error::io(path, e))?;
            }
        }
        Ok(buf)
    }
}

/// Independent read handle on an [`Original`]
#[derive(Debug)]
pub enum OriginalReader {
    Memory(Cursor<Arc<[u8]>>),
    File(File),
}

impl Read for OriginalReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OriginalReader::Memory(cursor) => cursor.read(buf),
            OriginalReader::File(file) => file.read(buf),
        }
    }
}

impl Seek for OriginalReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            OriginalReader::Memory(cursor) => cursor.seek(pos),
            OriginalReader::File(file) => file.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_range() {
        let original = Original::from_bytes(b"<root><a/></root>".to_vec());
        assert_eq!(original.len(), 17);
        assert_eq!(original.read_range(6, 10).unwrap(), b"<a/>");
        assert!(original.read_range(10, 18).is_err());
    }

    #[test]
    fn test_file_readers_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        std::fs::write(&path, b"0123456789").unwrap();

        let original = Original::open(&path).unwrap();
        let mut a = original.reader().unwrap();
        let mut b = original.reader().unwrap();
        a.seek(SeekFrom::Start(5)).unwrap();

        let mut buf = [0u8; 2];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"01");
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"56");
        assert_eq!(original.read_range(3, 6).unwrap(), b"345");
    }
}
