//! Runtime configuration
//!
//! Every field has a default, so an empty TOML file (or no file at all) is a
//! valid configuration.
//!
//! ```toml
//! max_errors = 500
//! max_fragment_size = 1048576
//! debounce_ms = 150
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default cap on collected diagnostics per pass.
pub const DEFAULT_MAX_ERRORS: usize = 1000;

/// Default size at which an open unit is sliced into continuation fragments.
pub const DEFAULT_MAX_FRAGMENT_SIZE: u64 = 5 * 1024 * 1024;

/// Default read window for scanning and streaming.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Settings shared by a [`Session`](crate::Session) and its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum number of diagnostics kept per pass (plus one sentinel).
    pub max_errors: usize,
    /// Slice threshold for oversized units, in bytes.
    pub max_fragment_size: u64,
    /// Size of the read window used by the indexer and virtual streams.
    pub read_buffer_size: usize,
    /// Debounce delay for scheduled validation passes, in milliseconds.
    pub debounce_ms: u64,
    /// Number of unit contents kept in the LRU read cache.
    pub unit_cache_capacity: usize,
    /// Persist patches to an on-disk journal.
    pub journal: bool,
    /// Directory (next to the edited file) holding the journal.
    pub journal_dir_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            max_fragment_size: DEFAULT_MAX_FRAGMENT_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            debounce_ms: 300,
            unit_cache_capacity: 50,
            journal: true,
            journal_dir_name: ".xmledit".to_string(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read window clamped to something usable.
    #[inline]
    pub fn read_window(&self) -> usize {
        self.read_buffer_size.max(512)
    }
}
