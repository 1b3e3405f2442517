//! Patch journal
//!
//! Append-only log next to the edited file, one JSON object per line:
//!
//! ```text
//! {"start":12,"end":20,"kind":"REPLACE","text":"Patched","owner":"frag_0"}
//! ```
//!
//! Replaying the lines in order through the patch manager rebuilds the patch
//! set of the previous session. Lines that do not parse are skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::patch::{Patch, PatchKind};
use crate::error::{Error, Result};
use crate::index::UnitId;

/// Journal line
#[derive(Debug, Serialize, Deserialize)]
struct Entry<'a> {
    start: u64,
    end: u64,
    kind: PatchKind,
    #[serde(borrow)]
    text: std::borrow::Cow<'a, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<UnitId>,
}

impl<'a> From<&'a Patch> for Entry<'a> {
    fn from(patch: &'a Patch) -> Self {
        Entry {
            start: patch.start(),
            end: patch.end(),
            kind: patch.kind(),
            text: patch.text().into(),
            owner: patch.owner(),
        }
    }
}

/// On-disk log of the patches applied to one file
#[derive(Debug, Clone)]
pub struct PatchJournal {
    path: PathBuf,
}

impl PatchJournal {
    /// Journal at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal for `file`, kept in `<file dir>/<dir_name>/<file name>.patches.log`
    pub fn for_file(file: &Path, dir_name: &str) -> Self {
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Self::new(dir.join(dir_name).join(format!("{name}.patches.log")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, patch: &Patch) -> Result<String> {
        let mut line = serde_json::to_string(&Entry::from(patch)).map_err(|e| Error::Journal {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        line.push('\n');
        Ok(line)
    }

    /// Append one patch
    pub fn append(&self, patch: &Patch) -> Result<()> {
        let line = self.encode(patch)?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(())
    }

    /// Read every well-formed entry, in order. A missing journal is empty.
    pub fn load(&self) -> Result<Vec<Patch>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let mut patches = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(patch) => patches.push(patch),
                Err(reason) => tracing::warn!(
                    path = %self.path.display(),
                    line = number + 1,
                    %reason,
                    "skipping corrupt journal entry"
                ),
            }
        }
        tracing::debug!(path = %self.path.display(), patches = patches.len(), "journal loaded");
        Ok(patches)
    }

    /// Replace the journal's contents with `patches`, atomically. An empty
    /// list removes the journal.
    pub fn rewrite(&self, patches: &[Patch]) -> Result<()> {
        if patches.is_empty() {
            return self.clear();
        }
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        for patch in patches {
            tmp.write_all(self.encode(patch)?.as_bytes())
                .map_err(|e| Error::io(tmp.path(), e))?;
        }
        tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| Error::io(&self.path, e.error))?;
        tracing::debug!(path = %self.path.display(), patches = patches.len(), "journal rewritten");
        Ok(())
    }

    /// Remove the journal
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

fn parse_line(line: &str) -> std::result::Result<Patch, String> {
    let entry: Entry<'_> = serde_json::from_str(line).map_err(|e| e.to_string())?;
    Patch::new(entry.start, entry.end, entry.text.into_owned(), entry.kind, entry.owner)
        .map_err(|e| e.to_string())
}
