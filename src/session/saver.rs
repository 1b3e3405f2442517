//! File saver
//!
//! Copies a virtual document to disk through a temp file in the target's
//! directory, then renames it into place. The target is either replaced
//! completely or left untouched, which is what allows saving over the file
//! the document is being streamed from.

use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Outcome of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Stream `input` into `target`, replacing it atomically
pub fn save_stream<R: Read>(mut input: R, target: &Path, buffer_size: usize) -> Result<SaveReport> {
    let started = Instant::now();
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    let bytes_written = {
        let mut writer = BufWriter::with_capacity(buffer_size, temp.as_file());
        let written = io::copy(&mut input, &mut writer).map_err(|e| Error::io(temp.path(), e))?;
        writer.flush().map_err(|e| Error::io(temp.path(), e))?;
        written
    };
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;
    temp.persist(target).map_err(|e| Error::io(target, e.error))?;

    let report = SaveReport {
        path: target.to_path_buf(),
        bytes_written,
        elapsed: started.elapsed(),
    };
    tracing::debug!(
        path = %target.display(),
        bytes = report.bytes_written,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "document saved"
    );
    Ok(report)
}

/// Whether two paths name the same file. Falls back to comparing the paths
/// when either does not exist yet.
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Cursor;

    #[test]
    fn test_save_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.xml");
        let report = save_stream(Cursor::new(b"<root/>".to_vec()), &target, 4096).unwrap();
        assert_eq!(report.bytes_written, 7);
        assert_eq!(std::fs::read(&target).unwrap(), b"<root/>");
    }

    #[test]
    fn test_save_over_source_being_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        std::fs::write(&path, b"<root><item>Original</item></root>").unwrap();

        let source = File::open(&path).unwrap();
        save_stream(source, &path, 8).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"<root><item>Original</item></root>");
        assert!(same_file(&path, &dir.path().join(".").join("doc.xml")));
    }

    #[test]
    fn test_failed_stream_leaves_target() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("keep.xml");
        std::fs::write(&target, b"<keep/>").unwrap();
        assert!(save_stream(Broken, &target, 64).is_err());
        assert_eq!(std::fs::read(&target).unwrap(), b"<keep/>");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
